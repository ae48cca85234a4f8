//! Event data model.
//!
//! ## Contents
//! - [`Event`] topic, flags and an opaque shared subject
//! - [`Flag`] delivery behaviour bits (`ONCE`, `VOID`, `SKIP`)
//! - [`TypedEvent`] typed view over an event whose subject is a known `T`

mod event;
mod flag;
mod typed;

pub use event::{Event, Subject};
pub use flag::Flag;
pub use typed::TypedEvent;
