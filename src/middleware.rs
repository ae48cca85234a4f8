//! # Middleware: event mutation before delivery.
//!
//! A [`Middleware`] mutates an [`Event`] in place, usually to set a [`Flag`]. It
//! runs at one of two points during dispatch:
//!
//! ```text
//! emit(event)
//!   └─► for each matching topic:
//!         apply(pattern-scoped chain)       ← shared event, visible to all listeners
//!         └─► for each subscription:
//!               clone event
//!               apply(listener-scoped chain) ← private clone, this listener only
//! ```
//!
//! ## Rules
//! - A chain runs in registration order.
//! - Nothing short-circuits: a middleware setting `VOID` does not stop the rest.
//!
//! ## Example
//! ```rust
//! use emitvisor::{Event, Flag, middleware};
//!
//! let tag = middleware::from_fn(|e: &mut Event| {
//!     if e.topic().starts_with("noisy.") {
//!         e.insert_flag(Flag::SKIP);
//!     }
//! });
//!
//! let mut ev = Event::empty("noisy.tick");
//! middleware::apply(&mut ev, &[tag, middleware::once()]);
//! assert!(ev.has_flag(Flag::SKIP | Flag::ONCE));
//! ```

use std::sync::Arc;

use crate::events::{Event, Flag};

/// Shared event-mutating function.
pub type Middleware = Arc<dyn Fn(&mut Event) + Send + Sync>;

/// Wraps a closure as a [`Middleware`].
pub fn from_fn<F>(f: F) -> Middleware
where
    F: Fn(&mut Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Sets [`Flag::ONCE`]: the subscription is removed after this delivery.
pub fn once() -> Middleware {
    flag(Flag::ONCE)
}

/// Sets [`Flag::VOID`]: the event is not delivered.
pub fn void() -> Middleware {
    flag(Flag::VOID)
}

/// Sets [`Flag::SKIP`]: the event is dropped instead of waiting on a full mailbox.
pub fn skip() -> Middleware {
    flag(Flag::SKIP)
}

fn flag(bits: Flag) -> Middleware {
    Arc::new(move |e: &mut Event| e.insert_flag(bits))
}

/// Runs every middleware of `chain` on `event`, in order.
pub fn apply(event: &mut Event, chain: &[Middleware]) {
    for mw in chain {
        mw(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn builtins_set_their_flag() {
        let mut ev = Event::empty("t");
        apply(&mut ev, &[once()]);
        assert_eq!(ev.flag(), Flag::ONCE);

        let mut ev = Event::empty("t");
        apply(&mut ev, &[void(), skip()]);
        assert_eq!(ev.flag(), Flag::VOID | Flag::SKIP);
    }

    #[test]
    fn chain_runs_in_order_without_short_circuit() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = |n: u8| {
            let seen = Arc::clone(&seen);
            from_fn(move |_e: &mut Event| seen.lock().unwrap().push(n))
        };

        let mut ev = Event::empty("t");
        apply(&mut ev, &[record(1), void(), record(2), record(3)]);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
        assert!(ev.has_flag(Flag::VOID));
    }
}
