//! # Listener capability.
//!
//! Provides [`Listener`], the extension point consumers implement to receive
//! events, and [`ListenerRef`], the shared handle the emitter stores and uses as
//! subscription identity.
//!
//! Each subscription of a listener gets:
//! - **Dedicated worker task** (runs independently of other listeners)
//! - **Bounded mailbox** (capacity from the emitter config at subscribe time)
//! - **Panic isolation** (a panicking `handle` is logged; the worker keeps draining)
//!
//! ## Architecture
//! ```text
//! Emitter::emit ──► [bounded mailbox] ──► worker task ──► listener.handle(&event)
//!                                                      └─► panic caught → warn! log
//! ```
//!
//! ## Identity
//! A [`ListenerRef`] receives a fresh [`ListenerId`] when it is created. Clones
//! share the id, so the same `ListenerRef` can be passed to `on`, `off` and
//! compared with the results of `listeners`. Wrapping one listener twice gives
//! two distinct identities.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use emitvisor::{Event, Listener, ListenerRef};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Listener for Audit {
//!     async fn handle(&self, event: &Event) {
//!         let _ = event.topic();
//!     }
//!
//!     fn name(&self) -> &str { "audit" }
//! }
//!
//! let audit = ListenerRef::new(Audit);
//! assert_eq!(audit.name(), "audit");
//! assert_eq!(audit.clone(), audit);
//! assert_ne!(ListenerRef::new(Audit), audit);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;

use crate::events::Event;

/// Global counter for listener identities.
static LISTENER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Receives events from the emitter, one at a time.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - The event is borrowed for the duration of the call; clone it to keep it.
/// - Slow handling only fills this listener's mailbox.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Handles a single event.
    ///
    /// Called from the subscription's worker task, never from the emitting
    /// context. Events are handled sequentially, in mailbox order.
    async fn handle(&self, event: &Event);

    /// Returns the listener name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose; override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Stable identity of a [`ListenerRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(LISTENER_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Shared listener handle with identity.
///
/// Equality and hashing use [`ListenerId`] only.
#[derive(Clone)]
pub struct ListenerRef {
    id: ListenerId,
    inner: Arc<dyn Listener>,
}

impl ListenerRef {
    /// Wraps a listener and allocates a new identity for it.
    pub fn new<L: Listener>(listener: L) -> Self {
        Self::from_arc(Arc::new(listener))
    }

    /// Wraps an already shared listener and allocates a new identity for it.
    pub fn from_arc(inner: Arc<dyn Listener>) -> Self {
        Self {
            id: ListenerId::next(),
            inner,
        }
    }

    /// Identity used as the registry key.
    #[inline]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Listener name (see [`Listener::name`]).
    #[inline]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Underlying listener.
    #[inline]
    pub fn listener(&self) -> &Arc<dyn Listener> {
        &self.inner
    }
}

impl PartialEq for ListenerRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ListenerRef {}

impl Hash for ListenerRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ListenerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRef")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}
