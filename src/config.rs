//! # Emitter configuration.
//!
//! Provides [`Config`], the settings read by [`Emitter`](crate::Emitter) when it
//! creates new subscriptions.
//!
//! ## Sentinel values
//! - `mailbox_capacity = 0` → smallest possible mailbox (clamped to 1)

/// Default mailbox capacity (clamped to 1 when a subscription is created).
pub const DEFAULT_MAILBOX_CAPACITY: usize = 0;

/// Configuration for an [`Emitter`](crate::Emitter).
///
/// ## Field semantics
/// - `mailbox_capacity`: bounded queue size of every subscription created
///   after this value is set (min 1; clamped by [`Config::mailbox_capacity_clamped`])
///
/// ## Notes
/// Changing the capacity on a live emitter (via
/// [`Emitter::set_capacity`](crate::Emitter::set_capacity)) affects only
/// subscriptions registered afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of each subscription mailbox.
    ///
    /// A full mailbox makes a blocking delivery wait and a `SKIP` delivery drop
    /// the event for that subscription only.
    pub mailbox_capacity: usize,
}

impl Config {
    /// Creates a config with the given mailbox capacity.
    #[must_use]
    pub fn with_capacity(mailbox_capacity: usize) -> Self {
        Self { mailbox_capacity }
    }

    /// Returns the mailbox capacity clamped to a minimum of 1.
    #[inline]
    pub fn mailbox_capacity_clamped(&self) -> usize {
        clamp_capacity(self.mailbox_capacity)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

#[inline]
pub(crate) fn clamp_capacity(capacity: usize) -> usize {
    capacity.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(Config::default().mailbox_capacity_clamped(), 1);
        assert_eq!(Config::with_capacity(8).mailbox_capacity_clamped(), 8);
    }
}
