//! # Subscription: one listener bound to one topic.
//!
//! A [`Subscription`] owns a bounded mailbox, the worker task draining it and the
//! listener-scoped middleware chain. It references (does not own) the listener.
//!
//! ## Architecture
//! ```text
//! try_deliver(event) ──► [mailbox] (bounded mpsc) ──► worker ──► listener.handle(&event)
//!                                                         └────► panic → warn!, next event
//! ```
//!
//! ## Lifecycle
//! ```text
//! Running ──close()──► Closed
//!   │                    ├─ mailbox closed: new and blocked senders get `Closed`
//!   │                    └─ worker drains what was already queued, then exits
//!   └─ worker started in `spawn` (no separate Created state is observable)
//! ```
//!
//! ## Rules
//! - **Per-subscription FIFO**: one worker, events handled strictly in mailbox order
//! - **No overtaking**: an event that must wait for room queues behind earlier
//!   waiting events; later offers never jump ahead of them
//! - **Panic isolation**: `catch_unwind` around every `handle`; the worker continues
//! - **Close is idempotent** and never faults an in-flight sender
//!
//! ## Delivery
//! ```text
//! try_deliver(event)            (synchronous, called from emit)
//!   ├─ closed                   → Settled(Err(Closed))
//!   ├─ waiting sends ahead      → SKIP: Settled(Err(Full))  else: Waiting (behind them)
//!   └─ try_send
//!        ├─ Ok                  → Settled(Ok)
//!        ├─ Full + SKIP         → Settled(Err(Full))
//!        └─ Full                → Waiting ──► finish(): wait for the one ahead, then send
//! ```
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a listener uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::error::DeliveryError;
use crate::events::{Event, Flag};
use crate::listeners::ListenerRef;
use crate::middleware::Middleware;

/// Registered (topic, listener) pair with its own mailbox and worker.
pub(crate) struct Subscription {
    topic: String,
    listener: ListenerRef,
    middlewares: Vec<Middleware>,
    sender: mpsc::Sender<Event>,
    closed: CancellationToken,
    /// Fires when the most recent waiting send is over (sent or not).
    backlog: Mutex<CancellationToken>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Result of offering an event without waiting.
pub(crate) enum Delivery {
    /// Queued, or definitively not sent.
    Settled(Result<(), DeliveryError>),
    /// Mailbox full and the event may wait; drive it with [`WaitingSend::finish`].
    Waiting(WaitingSend),
}

/// Event waiting for mailbox room, ordered behind earlier waiting events.
pub(crate) struct WaitingSend {
    sender: mpsc::Sender<Event>,
    closed: CancellationToken,
    event: Event,
    ahead: CancellationToken,
    _finished: DropGuard,
}

impl WaitingSend {
    /// Waits for the send ahead to finish, then for room, racing closure and `done`.
    pub(crate) async fn finish(self, done: &CancellationToken) -> Result<(), DeliveryError> {
        let Self {
            sender,
            closed,
            event,
            ahead,
            _finished,
        } = self;

        tokio::select! {
            biased;
            _ = closed.cancelled() => Err(DeliveryError::Closed),
            _ = done.cancelled() => Err(DeliveryError::Canceled),
            res = async {
                ahead.cancelled().await;
                sender.send(event).await
            } => res.map_err(|_| DeliveryError::Closed),
        }
    }
}

fn settled() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}

impl Subscription {
    /// Creates the mailbox and spawns the worker.
    ///
    /// `capacity` must already be clamped (see [`crate::config::Config`]).
    ///
    /// ### Panics
    /// Panics when called outside a Tokio runtime, or with a zero capacity.
    pub(crate) fn spawn(
        topic: String,
        listener: ListenerRef,
        middlewares: Vec<Middleware>,
        capacity: usize,
    ) -> Arc<Self> {
        let (sender, rx) = mpsc::channel::<Event>(capacity);
        let closed = CancellationToken::new();
        let worker = tokio::spawn(run_worker(listener.clone(), rx, closed.clone()));

        Arc::new(Self {
            topic,
            listener,
            middlewares,
            sender,
            closed,
            backlog: Mutex::new(settled()),
            worker: Mutex::new(Some(worker)),
        })
    }

    #[inline]
    pub(crate) fn topic(&self) -> &str {
        &self.topic
    }

    #[inline]
    pub(crate) fn listener(&self) -> &ListenerRef {
        &self.listener
    }

    #[inline]
    pub(crate) fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Closes the mailbox. Idempotent.
    pub(crate) fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!(
                topic = %self.topic,
                listener = self.listener.name(),
                id = %self.listener.id(),
                "subscription closed"
            );
        }
        self.closed.cancel();
    }

    /// One delivery attempt into the mailbox, without waiting.
    ///
    /// - `SKIP` set: a full mailbox (or events already waiting) yields [`DeliveryError::Full`].
    /// - otherwise: a full mailbox yields [`Delivery::Waiting`].
    pub(crate) fn try_deliver(&self, event: Event) -> Delivery {
        if self.is_closed() {
            return Delivery::Settled(Err(DeliveryError::Closed));
        }

        let skip = event.has_flag(Flag::SKIP);
        let mut tail = self.backlog.lock().unwrap_or_else(PoisonError::into_inner);

        if !tail.is_cancelled() {
            return if skip {
                Delivery::Settled(Err(DeliveryError::Full))
            } else {
                Delivery::Waiting(self.wait_behind(&mut tail, event))
            };
        }

        match self.sender.try_send(event) {
            Ok(()) => Delivery::Settled(Ok(())),
            Err(TrySendError::Closed(_)) => Delivery::Settled(Err(DeliveryError::Closed)),
            Err(TrySendError::Full(_)) if skip => Delivery::Settled(Err(DeliveryError::Full)),
            Err(TrySendError::Full(event)) => Delivery::Waiting(self.wait_behind(&mut tail, event)),
        }
    }

    fn wait_behind(&self, tail: &mut CancellationToken, event: Event) -> WaitingSend {
        let finished = CancellationToken::new();
        let ahead = std::mem::replace(tail, finished.clone());
        WaitingSend {
            sender: self.sender.clone(),
            closed: self.closed.clone(),
            event,
            ahead,
            _finished: finished.drop_guard(),
        }
    }

    /// Waits for the worker to exit. Call after [`close`](Self::close).
    pub(crate) async fn join(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(topic = %self.topic, listener = self.listener.name(), error = %err, "worker join failed");
            }
        }
    }
}

/// Drains the mailbox until the subscription is closed (or every sender is gone).
async fn run_worker(
    listener: ListenerRef,
    mut rx: mpsc::Receiver<Event>,
    closed: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(ev) => handle_one(&listener, ev).await,
                None => return,
            },
        }
    }

    // Reject new sends, then handle whatever was already queued.
    rx.close();
    while let Some(ev) = rx.recv().await {
        handle_one(&listener, ev).await;
    }
}

async fn handle_one(listener: &ListenerRef, ev: Event) {
    let fut = listener.listener().handle(&ev);
    if let Err(panic_err) = AssertUnwindSafe(fut).catch_unwind().await {
        warn!(
            listener = listener.name(),
            id = %listener.id(),
            topic = ev.topic(),
            info = %panic_message(panic_err.as_ref()),
            "listener panicked; worker continues"
        );
    }
}

fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::unbounded_channel;

    use super::*;
    use crate::listeners::ListenerFn;

    fn recorder() -> (ListenerRef, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = unbounded_channel();
        let l = ListenerFn::arc("rec", move |e: Event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(e);
            }
        });
        (l, rx)
    }

    /// Records, then blocks until `gate` gets a permit.
    fn gated() -> (
        ListenerRef,
        mpsc::UnboundedReceiver<Event>,
        Arc<tokio::sync::Semaphore>,
    ) {
        let (tx, rx) = unbounded_channel();
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let g = Arc::clone(&gate);
        let l = ListenerFn::arc("gated", move |e: Event| {
            let tx = tx.clone();
            let g = Arc::clone(&g);
            async move {
                let _ = tx.send(e);
                if let Ok(p) = g.acquire().await {
                    p.forget();
                }
            }
        });
        (l, rx, gate)
    }

    async fn send(
        sub: &Subscription,
        event: Event,
        done: &CancellationToken,
    ) -> Result<(), DeliveryError> {
        match sub.try_deliver(event) {
            Delivery::Settled(res) => res,
            Delivery::Waiting(waiting) => waiting.finish(done).await,
        }
    }

    #[tokio::test]
    async fn close_drains_queued_events_then_rejects() {
        let (l, mut rx) = recorder();
        let sub = Subscription::spawn("t".into(), l, Vec::new(), 4);
        let done = CancellationToken::new();

        send(&sub, Event::new("t", 1_u8), &done).await.unwrap();
        send(&sub, Event::new("t", 2_u8), &done).await.unwrap();
        sub.close();
        sub.close();

        assert_eq!(
            send(&sub, Event::new("t", 3_u8), &done).await,
            Err(DeliveryError::Closed)
        );
        sub.join().await;

        let got: Vec<u8> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| *e.subject_as::<u8>().unwrap())
            .collect();
        assert_eq!(got, vec![1, 2]);
    }

    #[tokio::test]
    async fn blocked_sender_unblocks_on_close() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let g = Arc::clone(&gate);
        let l = ListenerFn::arc("stuck", move |_e: Event| {
            let g = Arc::clone(&g);
            async move {
                if let Ok(p) = g.acquire().await {
                    p.forget();
                }
            }
        });
        let sub = Subscription::spawn("t".into(), l, Vec::new(), 1);
        let done = CancellationToken::new();

        // first is taken by the worker, second fills the mailbox
        send(&sub, Event::empty("t"), &done).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        send(&sub, Event::empty("t"), &done).await.unwrap();

        let blocked = {
            let sub = Arc::clone(&sub);
            let done = done.clone();
            tokio::spawn(async move { send(&sub, Event::empty("t"), &done).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        sub.close();
        let res = tokio::time::timeout(Duration::from_secs(1), blocked)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(res, Err(DeliveryError::Closed));

        gate.add_permits(8);
        sub.join().await;
    }

    #[tokio::test]
    async fn skip_on_full_mailbox_is_dropped() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let g = Arc::clone(&gate);
        let l = ListenerFn::arc("stuck", move |_e: Event| {
            let g = Arc::clone(&g);
            async move {
                if let Ok(p) = g.acquire().await {
                    p.forget();
                }
            }
        });
        let sub = Subscription::spawn("t".into(), l, Vec::new(), 1);
        let done = CancellationToken::new();

        send(&sub, Event::empty("t"), &done).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        send(&sub, Event::empty("t"), &done).await.unwrap();

        let res = send(&sub, Event::empty("t").with_flag(Flag::SKIP), &done).await;
        assert_eq!(res, Err(DeliveryError::Full));

        gate.add_permits(8);
        sub.close();
        sub.join().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waiting_events_keep_their_order() {
        let (l, mut rx, gate) = gated();
        let sub = Subscription::spawn("t".into(), l, Vec::new(), 1);
        let done = CancellationToken::new();

        send(&sub, Event::new("t", 1_u8), &done).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().subject_as::<u8>(), Some(&1));
        send(&sub, Event::new("t", 2_u8), &done).await.unwrap();

        let Delivery::Waiting(third) = sub.try_deliver(Event::new("t", 3_u8)) else {
            panic!("expected a waiting delivery");
        };
        let Delivery::Waiting(fourth) = sub.try_deliver(Event::new("t", 4_u8)) else {
            panic!("expected a waiting delivery");
        };
        // Nothing overtakes events already waiting, not even a non-blocking one.
        assert!(matches!(
            sub.try_deliver(Event::new("t", 5_u8).with_flag(Flag::SKIP)),
            Delivery::Settled(Err(DeliveryError::Full))
        ));

        // Drive them in reverse to make sure order does not depend on scheduling.
        let d = done.clone();
        let last = tokio::spawn(async move { fourth.finish(&d).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let d = done.clone();
        let first = tokio::spawn(async move { third.finish(&d).await });

        gate.add_permits(16);
        assert_eq!(first.await.unwrap(), Ok(()));
        assert_eq!(last.await.unwrap(), Ok(()));

        let got: Vec<u8> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(|e| *e.subject_as::<u8>().unwrap())
        .collect();
        assert_eq!(got, vec![2, 3, 4]);

        // Backlog cleared: the fast path is available again.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(
            sub.try_deliver(Event::new("t", 6_u8).with_flag(Flag::SKIP)),
            Delivery::Settled(Ok(()))
        ));
        sub.close();
        sub.join().await;
    }

    #[tokio::test]
    async fn completion_signal_cancels_blocked_send() {
        let l = ListenerFn::arc("idle", |_e: Event| async {
            std::future::pending::<()>().await;
        });
        let sub = Subscription::spawn("t".into(), l, Vec::new(), 1);
        let done = CancellationToken::new();

        send(&sub, Event::empty("t"), &done).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        send(&sub, Event::empty("t"), &done).await.unwrap();

        done.cancel();
        assert_eq!(
            send(&sub, Event::empty("t"), &done).await,
            Err(DeliveryError::Canceled)
        );
        sub.close();
    }

    #[tokio::test]
    async fn panicking_listener_keeps_worker_alive() {
        let (tx, mut rx) = unbounded_channel();
        let l = ListenerFn::arc("fragile", move |e: Event| {
            let tx = tx.clone();
            async move {
                if e.subject_as::<&str>() == Some(&"boom") {
                    panic!("boom");
                }
                let _ = tx.send(e);
            }
        });
        let sub = Subscription::spawn("t".into(), l, Vec::new(), 4);
        let done = CancellationToken::new();

        send(&sub, Event::new("t", "boom"), &done).await.unwrap();
        send(&sub, Event::new("t", "fine"), &done).await.unwrap();

        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ev.subject_as::<&str>(), Some(&"fine"));
        sub.close();
        sub.join().await;
    }

    #[test]
    fn panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u32), "unknown panic");
    }
}
