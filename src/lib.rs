//! # emitvisor
//!
//! **Emitvisor** is an in-process publish/subscribe engine for Tokio applications.
//!
//! Components of one process exchange [`Event`]s over string topics. There is no
//! broker, network or persistence: every subscription is a bounded mailbox drained
//! by its own worker task, and every emit fans out concurrently to the
//! subscriptions whose topic matches.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   on("orders.*", L1)      on("orders.created", L2)      use("debug.*", [void])
//!          │                          │                           │
//!          ▼                          ▼                           ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  Emitter                                                              │
//! │  - TopicRegistry      (topic → { listener id → Subscription })        │
//! │  - MiddlewareRegistry (pattern → [Middleware])                        │
//! └──────┬────────────────────────────────────────────────────────────────┘
//!        │ emit(Event { topic: "orders.created", flag, subject })
//!        ▼
//!  matched topics (bidirectional glob: "orders.*", "orders.created")
//!        │  pattern middlewares (shared event)
//!        │  per subscription: clone ─► listener middlewares ─► VOID? skip
//!        ▼
//!  try_send, in emit order             full + SKIP: drop
//!         │                  │          full: waiting task, queued behind
//!         │                  │                earlier waiting events
//!         ▼                  ▼
//!    [mailbox L1]       [mailbox L2]      (bounded, FIFO)
//!         ▼                  ▼
//!     worker L1          worker L2        (panic isolated)
//!         ▼                  ▼
//!    L1.handle()        L2.handle()
//!
//!  all attempts settled ──► Completion fires
//! ```
//!
//! ### Flags
//! | Flag   | Effect                                                      |
//! |--------|-------------------------------------------------------------|
//! | `ONCE` | remove the subscription after a successful delivery         |
//! | `VOID` | do not attempt delivery                                     |
//! | `SKIP` | deliver without waiting; drop if the mailbox is full        |
//!
//! ## Features
//! | Area             | Description                                                  | Key types / traits                         |
//! |------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Emitter**      | Register, resolve wildcards, fan out, tear down.             | [`Emitter`], [`Completion`]                |
//! | **Events**       | Topic + flags + opaque subject, typed view.                  | [`Event`], [`Flag`], [`TypedEvent`]        |
//! | **Listeners**    | Receive events one at a time on a dedicated worker.          | [`Listener`], [`ListenerRef`], [`ListenerFn`] |
//! | **Middleware**   | Mutate events before delivery (pattern or listener scoped).  | [`Middleware`], [`middleware`]             |
//! | **Configuration**| Mailbox capacity for new subscriptions.                      | [`Config`]                                 |
//! | **Errors**       | Internal "not sent" and pattern errors, used for logging.    | [`DeliveryError`], [`PatternError`]        |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] listener _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use emitvisor::{Emitter, Event, ListenerFn, ListenerRef, middleware};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let emitter = Emitter::with_capacity(16);
//!
//!     let printer: ListenerRef = ListenerFn::arc("printer", |event: Event| async move {
//!         println!("{} -> {:?}", event.topic(), event.subject_as::<&'static str>());
//!     });
//!
//!     // Receive every "user.*" event, but only the first one.
//!     emitter.once("user.*", &printer, []);
//!     // Never deliver anything under "debug.*".
//!     emitter.use_middleware("debug.*", [middleware::void()]);
//!
//!     emitter.emit(Event::new("user.login", "alice")).await;
//!     emitter.emit(Event::new("user.logout", "alice")).await; // not delivered
//!
//!     assert!(emitter.listeners("user.*").is_empty());
//!     emitter.shutdown().await;
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod core;
mod error;
mod events;
mod listeners;
pub mod middleware;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_MAILBOX_CAPACITY};
pub use core::{Completion, Emitter, EmitterBuilder};
pub use error::{DeliveryError, PatternError};
pub use events::{Event, Flag, Subject, TypedEvent};
pub use listeners::{Listener, ListenerFn, ListenerFnOf, ListenerId, ListenerRef};
pub use middleware::Middleware;

// Optional: expose a simple built-in logger listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogWriter;
