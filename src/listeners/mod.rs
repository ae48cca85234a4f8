//! # Listeners for the emitter.
//!
//! This module provides the [`Listener`] trait, the [`ListenerRef`] identity handle
//! and closure adapters.
//!
//! ## Architecture
//! ```text
//! Emitter::on(topic, &ListenerRef, middlewares)
//!     └──► Subscription { mailbox, worker, middlewares }
//!                                   │
//!                                   └──► Listener::handle(&Event)
//!                                             │
//!                          ┌──────────────────┼──────────────────┐
//!                          ▼                  ▼                  ▼
//!                     ListenerFn         ListenerFnOf<T>     LogWriter / custom
//! ```
//!
//! ## Implementing custom listeners
//! ```no_run
//! use emitvisor::{Event, Listener};
//! use async_trait::async_trait;
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Listener for Metrics {
//!     async fn handle(&self, event: &Event) {
//!         if event.topic().starts_with("errors.") {
//!             // increment failure counter
//!         }
//!     }
//! }
//! ```

mod listener;
mod listener_fn;
#[cfg(feature = "logging")]
mod log;

pub use listener::{Listener, ListenerId, ListenerRef};
pub use listener_fn::{ListenerFn, ListenerFnOf};
#[cfg(feature = "logging")]
pub use log::LogWriter;
