//! # Strongly-typed event view.
//!
//! [`TypedEvent<T>`] is what [`Event::typed`](super::Event::typed) returns once the
//! opaque subject has been downcast to `T`. It is a read-only view: flags set on it
//! do not travel back to the emitter.

use std::fmt;
use std::sync::Arc;

use super::flag::Flag;

/// Event whose subject is known to be a `T`.
pub struct TypedEvent<T> {
    seq: u64,
    topic: String,
    flag: Flag,
    subject: Arc<T>,
}

impl<T> TypedEvent<T> {
    pub(crate) fn new(seq: u64, topic: String, flag: Flag, subject: Arc<T>) -> Self {
        Self {
            seq,
            topic,
            flag,
            subject,
        }
    }

    /// Sequence number of the originating event.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Topic the event was emitted to.
    #[inline]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Flags as they were when the event reached the listener.
    #[inline]
    pub fn flag(&self) -> Flag {
        self.flag
    }

    /// Typed subject.
    #[inline]
    pub fn subject(&self) -> &T {
        &self.subject
    }

    /// Shared handle to the typed subject.
    #[inline]
    pub fn subject_arc(&self) -> Arc<T> {
        Arc::clone(&self.subject)
    }
}

impl<T> Clone for TypedEvent<T> {
    fn clone(&self) -> Self {
        Self {
            seq: self.seq,
            topic: self.topic.clone(),
            flag: self.flag,
            subject: Arc::clone(&self.subject),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TypedEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedEvent")
            .field("seq", &self.seq)
            .field("topic", &self.topic)
            .field("flag", &self.flag)
            .field("subject", &self.subject)
            .finish()
    }
}
