//! # Fan-out dispatch for one emit call.
//!
//! ```text
//! emit(event)
//!   ├─► matched topics (bidirectional glob)
//!   │     └─► pattern-scoped middlewares on the shared event
//!   │           └─► per subscription: clone → listener-scoped middlewares
//!   │                 ├─ VOID → skipped, no attempt
//!   │                 └─ Subscription::try_deliver (in emit order)
//!   │                      ├─ Settled ──────────────► settle
//!   │                      └─ Waiting ── spawn ─────► finish ──► settle
//!   │                                                  settle: Ok + ONCE → remove_exact + close
//!   │                                                          Err(..)   → logged, nothing else
//!   └─► joiner: wait for every spawned attempt ──► Completion fires
//! ```
//!
//! ## Rules
//! - Every attempt is started synchronously inside `emit`, so consecutive emits
//!   reach a subscription in call order even when nobody awaits them.
//! - [`Completion`] fires exactly once, after every attempt of its emit call has
//!   finished (sent or not). It is a join barrier, not a cancellation handle.
//! - Once-removal happens when the attempt settles, so it is visible before `Completion` fires.
//! - Nothing is reported to the caller.

use std::future::IntoFuture;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, trace};

use crate::core::registry::TopicRegistry;
use crate::core::subscription::{Delivery, Subscription};
use crate::error::DeliveryError;
use crate::events::{Event, Flag};

/// One-shot signal that an emit call finished all its delivery attempts.
///
/// Await it directly (`emitter.emit(ev).await`), or call [`Completion::wait`] to
/// keep the handle. Dropping it does not affect delivery.
#[derive(Clone, Debug)]
pub struct Completion {
    done: CancellationToken,
}

impl Completion {
    fn new(done: CancellationToken) -> Self {
        Self { done }
    }

    pub(crate) fn ready() -> Self {
        let done = CancellationToken::new();
        done.cancel();
        Self::new(done)
    }

    /// Returns true once every delivery attempt has finished.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Waits until every delivery attempt has finished.
    pub async fn wait(&self) {
        self.done.cancelled().await;
    }
}

impl IntoFuture for Completion {
    type Output = ();
    type IntoFuture = WaitForCancellationFutureOwned;

    fn into_future(self) -> Self::IntoFuture {
        self.done.cancelled_owned()
    }
}

/// Collects the attempts of one emit call.
pub(crate) struct Dispatch {
    registry: Arc<TopicRegistry>,
    done: CancellationToken,
    attempts: JoinSet<()>,
}

impl Dispatch {
    pub(crate) fn new(registry: Arc<TopicRegistry>) -> Self {
        Self {
            registry,
            done: CancellationToken::new(),
            attempts: JoinSet::new(),
        }
    }

    /// Offers a per-subscription copy of the event; `VOID` copies are skipped.
    ///
    /// Only an attempt that has to wait for mailbox room is spawned.
    pub(crate) fn offer(&mut self, sub: Arc<Subscription>, event: Event) {
        if event.has_flag(Flag::VOID) {
            trace!(
                topic = event.topic(),
                listener = sub.listener().name(),
                "void event, delivery skipped"
            );
            return;
        }

        let once = event.has_flag(Flag::ONCE);
        let seq = event.seq();

        match sub.try_deliver(event) {
            Delivery::Settled(res) => settle(&self.registry, &sub, once, seq, res),
            Delivery::Waiting(waiting) => {
                trace!(
                    topic = sub.topic(),
                    listener = sub.listener().name(),
                    seq,
                    "mailbox full, waiting for room"
                );
                let registry = Arc::clone(&self.registry);
                let done = self.done.clone();
                self.attempts.spawn(async move {
                    let res = waiting.finish(&done).await;
                    settle(&registry, &sub, once, seq, res);
                });
            }
        }
    }

    /// Spawns the joiner and returns the completion handle.
    pub(crate) fn finish(self) -> Completion {
        if self.attempts.is_empty() {
            return Completion::ready();
        }

        let Self { done, mut attempts, .. } = self;
        let signal = done.clone();
        tokio::spawn(async move {
            while attempts.join_next().await.is_some() {}
            signal.cancel();
        });
        Completion::new(done)
    }
}

fn settle(
    registry: &TopicRegistry,
    sub: &Arc<Subscription>,
    once: bool,
    seq: u64,
    res: Result<(), DeliveryError>,
) {
    match res {
        Ok(()) => {
            trace!(topic = sub.topic(), listener = sub.listener().name(), seq, "event queued");
            if once && registry.remove_exact(sub) {
                sub.close();
                debug!(
                    topic = sub.topic(),
                    listener = sub.listener().name(),
                    id = %sub.listener().id(),
                    "once subscription removed"
                );
            }
        }
        Err(err) => log_not_sent(sub, seq, err),
    }
}

fn log_not_sent(sub: &Subscription, seq: u64, err: DeliveryError) {
    match err {
        DeliveryError::Full => debug!(
            topic = sub.topic(),
            listener = sub.listener().name(),
            seq,
            reason = err.as_label(),
            "event dropped"
        ),
        _ => trace!(
            topic = sub.topic(),
            listener = sub.listener().name(),
            seq,
            reason = err.as_label(),
            "event not sent"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn empty_dispatch_is_ready() {
        let c = Dispatch::new(Arc::new(TopicRegistry::new())).finish();
        assert!(c.is_done());
        c.await;
    }

    #[tokio::test]
    async fn completion_clones_share_the_signal() {
        let done = CancellationToken::new();
        let a = Completion::new(done.clone());
        let b = a.clone();
        assert!(!b.is_done());

        done.cancel();
        tokio::time::timeout(Duration::from_secs(1), a)
            .await
            .unwrap();
        assert!(b.is_done());
    }
}
