//! Delivery flags carried by every [`Event`](super::Event).

use bitflags::bitflags;

bitflags! {
    /// Bitmask describing how an event is delivered to one subscription.
    ///
    /// Flags are normally set by middleware (see [`crate::middleware`]), either
    /// once per topic (pattern-scoped) or per subscription (listener-scoped).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flag: u8 {
        /// Remove the subscription after this event is delivered.
        const ONCE = 1 << 0;
        /// Do not attempt delivery at all.
        const VOID = 1 << 1;
        /// Deliver without waiting; drop the event if the mailbox is full.
        const SKIP = 1 << 2;
    }
}
