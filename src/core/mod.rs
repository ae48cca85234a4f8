//! Emitter core: registration, matching, dispatch and delivery workers.
//!
//! The only public API from this module is [`Emitter`] (plus its [`EmitterBuilder`]
//! and the [`Completion`] returned by `emit`).
//!
//! Internal modules:
//! - [`emitter`]: public API, wires registries and dispatch together;
//! - [`registry`]: topic → subscriptions and pattern → middleware maps;
//! - [`subscription`]: mailbox + worker per (topic, listener);
//! - [`dispatch`]: per-emit fan-out and the completion barrier;
//! - [`pattern`]: bidirectional shell-glob matching;
//! - [`builder`]: emitter construction with preinstalled middlewares.

mod builder;
mod dispatch;
mod emitter;
mod pattern;
mod registry;
mod subscription;

pub use builder::EmitterBuilder;
pub use dispatch::Completion;
pub use emitter::Emitter;
