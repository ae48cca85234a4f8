//! # Events passed through the emitter.
//!
//! An [`Event`] is a topic string, a [`Flag`] set that drives delivery, and an
//! opaque subject. The subject is shared (`Arc`) so cloning an event per listener
//! is cheap; the topic and flag are owned by each clone, which is what keeps
//! listener-scoped middleware from leaking into other listeners.
//!
//! ## Ordering
//! Each event created through a constructor gets a globally unique sequence
//! number (`seq`) that increases monotonically. Clones keep the sequence number of
//! their origin, so every listener sees the same `seq` for the same emit.
//!
//! ## Example
//! ```rust
//! use emitvisor::{Event, Flag};
//!
//! let ev = Event::new("orders.created", 42_u64).with_flag(Flag::SKIP);
//!
//! assert_eq!(ev.topic(), "orders.created");
//! assert!(ev.has_flag(Flag::SKIP));
//! assert_eq!(ev.subject_as::<u64>(), Some(&42));
//! assert_eq!(ev.subject_as::<String>(), None);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use super::flag::Flag;
use super::typed::TypedEvent;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque, shareable event payload.
pub type Subject = Arc<dyn Any + Send + Sync>;

/// Event delivered to listeners.
///
/// - `topic`: where the event is published (literal or glob pattern)
/// - `flag`: delivery behaviour, usually set by middleware
/// - `subject`: opaque payload; see [`Event::subject_as`] and [`Event::typed`]
#[derive(Clone)]
pub struct Event {
    seq: u64,
    topic: String,
    flag: Flag,
    subject: Subject,
}

impl Event {
    /// Creates an event carrying `subject` under `topic`, with no flags set.
    pub fn new<T>(topic: impl Into<String>, subject: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::from_subject(topic, Arc::new(subject))
    }

    /// Creates an event from an already shared subject.
    pub fn from_subject(topic: impl Into<String>, subject: Subject) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            topic: topic.into(),
            flag: Flag::empty(),
            subject,
        }
    }

    /// Creates an event with a unit `()` subject.
    pub fn empty(topic: impl Into<String>) -> Self {
        Self::new(topic, ())
    }

    /// Sequence number assigned at construction.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Topic this event was emitted to.
    #[inline]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Current flag set.
    #[inline]
    pub fn flag(&self) -> Flag {
        self.flag
    }

    /// Replaces the flag set.
    #[inline]
    pub fn set_flag(&mut self, flag: Flag) {
        self.flag = flag;
    }

    /// Adds `flag` to the current set.
    #[inline]
    pub fn insert_flag(&mut self, flag: Flag) {
        self.flag.insert(flag);
    }

    /// Returns true if every bit of `flag` is set.
    #[inline]
    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flag.contains(flag)
    }

    /// Adds `flag` and returns the event (builder style).
    #[inline]
    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flag.insert(flag);
        self
    }

    /// Shared payload handle.
    #[inline]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Borrows the subject as `T`, or `None` if it holds another type.
    #[inline]
    pub fn subject_as<T: Any>(&self) -> Option<&T> {
        (*self.subject).downcast_ref::<T>()
    }

    /// Returns a strongly-typed view of this event if the subject is a `T`.
    pub fn typed<T>(&self) -> Option<TypedEvent<T>>
    where
        T: Any + Send + Sync,
    {
        let subject = Arc::clone(&self.subject).downcast::<T>().ok()?;
        Some(TypedEvent::new(self.seq, self.topic.clone(), self.flag, subject))
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("seq", &self.seq)
            .field("topic", &self.topic)
            .field("flag", &self.flag)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_isolates_flags_but_shares_subject() {
        let original = Event::new("a", String::from("payload"));
        let mut copy = original.clone();
        copy.insert_flag(Flag::VOID);

        assert!(!original.has_flag(Flag::VOID));
        assert!(copy.has_flag(Flag::VOID));
        assert_eq!(copy.seq(), original.seq());
        assert!(Arc::ptr_eq(original.subject(), copy.subject()));
    }

    #[test]
    fn seq_increases() {
        let a = Event::empty("a");
        let b = Event::empty("b");
        assert!(b.seq() > a.seq());
    }

    #[test]
    fn typed_view_downcasts() {
        let ev = Event::new("t", 7_i32).with_flag(Flag::ONCE);
        let typed = ev.typed::<i32>().unwrap();
        assert_eq!(*typed.subject(), 7);
        assert_eq!(typed.topic(), "t");
        assert!(typed.flag().contains(Flag::ONCE));
        assert!(ev.typed::<u8>().is_none());
    }

    #[test]
    fn debug_hides_subject() {
        let ev = Event::new("secret", "payload");
        let out = format!("{ev:?}");
        assert!(out.contains("secret"));
        assert!(!out.contains("payload"));
    }
}
