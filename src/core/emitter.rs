//! # Emitter: registration, wildcard resolution and fan-out.
//!
//! The [`Emitter`] owns a topic registry and a middleware registry. Every
//! `(topic, listener)` registration becomes a subscription with its own bounded
//! mailbox and worker; `emit` fans an event out to every subscription whose topic
//! matches and returns a [`Completion`].
//!
//! ## Architecture
//! ```text
//! on(topic, listener, mws) ──► Subscription::spawn ──► TopicRegistry[topic][id]
//!                                  (replaces + closes a same-identity entry)
//!
//! emit(event)
//!   │  for topic in TopicRegistry::matched(event.topic):
//!   │     apply MiddlewareRegistry::for_topic(topic) to the shared event
//!   │     for sub in TopicRegistry::snapshot(topic):
//!   │        clone → apply sub.middlewares → Dispatch::offer
//!   └─► Dispatch::finish() ──► Completion
//!
//! off(topic, listeners) ──► TopicRegistry::remove_* ──► Subscription::close
//! ```
//!
//! ## Rules
//! - **Bidirectional glob**: a query matches a registered key if either matches the
//!   other as a pattern; malformed patterns match nothing.
//! - **Silent**: no matching or delivery failure is returned to callers.
//! - **Call order**: delivery starts inside `emit`, so consecutive emits reach a
//!   listener in call order whether or not their completions are awaited.
//! - **Runtime**: `on`, `once` and `emit` spawn Tokio tasks and must run inside a runtime.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use emitvisor::{Emitter, Event, ListenerFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let emitter = Emitter::with_capacity(16);
//!     let seen = Arc::new(AtomicUsize::new(0));
//!
//!     let s = Arc::clone(&seen);
//!     let counter = ListenerFn::arc("counter", move |_event: Event| {
//!         let s = Arc::clone(&s);
//!         async move { s.fetch_add(1, Ordering::SeqCst); }
//!     });
//!
//!     emitter.on("orders.*", &counter, []);
//!     emitter.emit(Event::new("orders.created", 1_u64)).await;
//!     emitter.shutdown().await;
//!
//!     assert_eq!(seen.load(Ordering::SeqCst), 1);
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use tracing::debug;

use crate::config::{Config, clamp_capacity};
use crate::core::builder::EmitterBuilder;
use crate::core::dispatch::{Completion, Dispatch};
use crate::core::registry::{MiddlewareRegistry, TopicRegistry};
use crate::core::subscription::Subscription;
use crate::events::Event;
use crate::listeners::{ListenerId, ListenerRef};
use crate::middleware::{self, Middleware};

/// In-process publish/subscribe engine.
///
/// Cheap to clone; clones share registries and capacity.
#[derive(Clone)]
pub struct Emitter {
    inner: Arc<Inner>,
}

struct Inner {
    capacity: AtomicUsize,
    topics: Arc<TopicRegistry>,
    middlewares: MiddlewareRegistry,
}

impl Emitter {
    /// Creates an emitter from `cfg`.
    #[must_use]
    pub fn new(cfg: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: AtomicUsize::new(cfg.mailbox_capacity),
                topics: Arc::new(TopicRegistry::new()),
                middlewares: MiddlewareRegistry::new(),
            }),
        }
    }

    /// Creates an emitter whose subscriptions get mailboxes of `capacity` (min 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(Config::with_capacity(capacity))
    }

    /// Starts a builder (for registering pattern middlewares up front).
    #[must_use]
    pub fn builder(cfg: Config) -> EmitterBuilder {
        EmitterBuilder::new(cfg)
    }

    /// Configured mailbox capacity (before clamping).
    pub fn capacity(&self) -> usize {
        self.inner.capacity.load(AtomicOrdering::Relaxed)
    }

    /// Sets the mailbox capacity for subscriptions created from now on.
    pub fn set_capacity(&self, capacity: usize) {
        self.inner.capacity.store(capacity, AtomicOrdering::Relaxed);
    }

    /// Subscribes `listener` to `topic` (literal or pattern).
    ///
    /// `middlewares` run on this listener's private copy of each event. A previous
    /// subscription of the same listener identity on the same topic is replaced and
    /// closed.
    ///
    /// ### Panics
    /// Panics when called outside a Tokio runtime.
    pub fn on(
        &self,
        topic: impl Into<String>,
        listener: &ListenerRef,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) {
        let topic = topic.into();
        let sub = Subscription::spawn(
            topic.clone(),
            listener.clone(),
            middlewares.into_iter().collect(),
            clamp_capacity(self.capacity()),
        );

        if let Some(prev) = self.inner.topics.insert(sub) {
            prev.close();
            debug!(topic = %topic, listener = listener.name(), id = %listener.id(), "subscription replaced");
        } else {
            debug!(topic = %topic, listener = listener.name(), id = %listener.id(), "listener registered");
        }
    }

    /// Same as [`on`](Self::on) with [`middleware::once`] prepended.
    pub fn once(
        &self,
        topic: impl Into<String>,
        listener: &ListenerRef,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) {
        let chain = std::iter::once(middleware::once()).chain(middlewares);
        self.on(topic, listener, chain);
    }

    /// Unsubscribes from every registered topic matching `topic` (either direction).
    ///
    /// - `listeners` empty: removes all subscriptions of those topics.
    /// - otherwise: removes only the given identities.
    ///
    /// Removed subscriptions are closed. Removing a missing pairing is a no-op.
    pub fn off(&self, topic: &str, listeners: &[ListenerRef]) {
        let ids: Vec<ListenerId> = listeners.iter().map(ListenerRef::id).collect();

        for key in self.inner.topics.matched(topic) {
            let removed = if ids.is_empty() {
                self.inner.topics.remove_topic(&key)
            } else {
                self.inner.topics.remove_listeners(&key, &ids)
            };
            if !removed.is_empty() {
                debug!(topic = %key, count = removed.len(), "listeners unregistered");
            }
            for sub in removed {
                sub.close();
            }
        }
    }

    /// Shorthand for `off(topic, &[])`.
    pub fn off_all(&self, topic: &str) {
        self.off(topic, &[]);
    }

    /// Sets the pattern-scoped middleware chain for `pattern`.
    ///
    /// An empty chain deletes the entry.
    pub fn use_middleware(
        &self,
        pattern: impl Into<String>,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) {
        let pattern = pattern.into();
        let chain: Vec<Middleware> = middlewares.into_iter().collect();
        debug!(pattern = %pattern, len = chain.len(), "middleware chain set");
        self.inner.middlewares.set(pattern, chain);
    }

    /// Delivers `event` to every matching subscription.
    ///
    /// Returns immediately; the [`Completion`] fires after every delivery attempt
    /// launched by this call has finished (sent or dropped).
    ///
    /// ### Panics
    /// Panics when a delivery must wait for mailbox room outside a Tokio runtime.
    pub fn emit(&self, mut event: Event) -> Completion {
        let mut dispatch = Dispatch::new(Arc::clone(&self.inner.topics));

        for topic in self.inner.topics.matched(event.topic()) {
            middleware::apply(&mut event, &self.inner.middlewares.for_topic(&topic));

            for sub in self.inner.topics.snapshot(&topic) {
                let mut copy = event.clone();
                middleware::apply(&mut copy, sub.middlewares());
                dispatch.offer(sub, copy);
            }
        }

        dispatch.finish()
    }

    /// Listeners registered under every topic matching `topic` (either direction).
    pub fn listeners(&self, topic: &str) -> Vec<ListenerRef> {
        self.inner.topics.listeners(topic)
    }

    /// All registered topic keys, sorted.
    pub fn topics(&self) -> Vec<String> {
        self.inner.topics.topics()
    }

    /// All patterns with a middleware chain, sorted.
    pub fn middleware_patterns(&self) -> Vec<String> {
        self.inner.middlewares.patterns()
    }

    /// Closes every subscription and waits for their workers to drain.
    ///
    /// Events already queued are still handled. The emitter stays usable.
    pub async fn shutdown(&self) {
        let subs = self.inner.topics.drain();
        debug!(count = subs.len(), "emitter shutdown");

        for sub in &subs {
            sub.close();
        }
        for sub in subs {
            sub.join().await;
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("capacity", &self.capacity())
            .field("topics", &self.topics())
            .field("middleware_patterns", &self.middleware_patterns())
            .finish()
    }
}
