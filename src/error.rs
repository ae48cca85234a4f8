//! Error types used inside the emitter.
//!
//! Nothing here is ever returned from the public [`Emitter`](crate::Emitter) API:
//! matching and dispatch are fire-and-forget. The enums exist so that the
//! internal code paths can use `Result` + `?` and log failures with stable labels.
//!
//! - [`DeliveryError`]: why a single delivery attempt did not reach a mailbox.
//! - [`PatternError`]: a topic pattern that failed to compile as a glob.
//!
//! Both types provide `as_label` for logs, in the same way across the crate.

use thiserror::Error;

/// # "Not sent" outcomes of one delivery attempt.
///
/// A delivery attempt either enqueues the event into the subscription mailbox
/// (success) or ends with one of these variants. None of them are surfaced to
/// the caller of `emit`; they decide only whether a `ONCE` subscription is removed
/// and what gets logged.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// Mailbox was full and the event carried `SKIP` (non-blocking delivery).
    #[error("mailbox full; event dropped")]
    Full,

    /// Mailbox was closed (unsubscribed) before or while sending.
    #[error("mailbox closed")]
    Closed,

    /// The emit call's completion signal fired before the send finished.
    #[error("delivery canceled by completion signal")]
    Canceled,
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use emitvisor::DeliveryError;
    ///
    /// assert_eq!(DeliveryError::Full.as_label(), "mailbox_full");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Full => "mailbox_full",
            DeliveryError::Closed => "mailbox_closed",
            DeliveryError::Canceled => "delivery_canceled",
        }
    }
}

/// # Malformed topic pattern.
///
/// Raised when a string cannot be compiled as a shell glob (e.g. an unclosed `[`).
/// Pattern resolution treats it as "no match".
#[derive(Error, Debug)]
#[error("invalid pattern {pattern:?}: {source}")]
pub struct PatternError {
    /// The offending pattern.
    pub pattern: String,
    /// Underlying glob compiler error.
    #[source]
    pub source: globset::Error,
}

impl PatternError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        "pattern_invalid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(DeliveryError::Full.as_label(), "mailbox_full");
        assert_eq!(DeliveryError::Closed.as_label(), "mailbox_closed");
        assert_eq!(DeliveryError::Canceled.as_label(), "delivery_canceled");
    }

    #[test]
    fn pattern_error_mentions_pattern() {
        let source = globset::Glob::new("[abc").unwrap_err();
        let err = PatternError {
            pattern: "[abc".to_string(),
            source,
        };
        assert_eq!(err.as_label(), "pattern_invalid");
        assert!(err.to_string().contains("[abc"));
    }
}
