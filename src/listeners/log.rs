//! # LogWriter: simple event logger
//!
//! A minimal listener that writes every received [`Event`] through `tracing`.
//! Use it for tests, demos, or to tap a topic while debugging.
//!
//! ## Example output (with a fmt subscriber)
//! ```text
//! INFO emitvisor::listeners::log: event received listener="log" topic="orders.created" seq=3 flag=Flag(ONCE)
//! ```

use async_trait::async_trait;
use tracing::info;

use crate::events::Event;
use crate::listeners::{Listener, ListenerRef};

/// Event writer listener.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Construct a [`LogWriter`] wrapped as a [`ListenerRef`].
    #[must_use]
    pub fn arc() -> ListenerRef {
        ListenerRef::new(Self)
    }
}

#[async_trait]
impl Listener for LogWriter {
    async fn handle(&self, e: &Event) {
        info!(
            listener = self.name(),
            topic = e.topic(),
            seq = e.seq(),
            flag = ?e.flag(),
            "event received"
        );
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Emitter;

    #[tokio::test]
    async fn log_writer_subscribes_like_any_listener() {
        let emitter = Emitter::with_capacity(4);
        let log = LogWriter::arc();
        emitter.on("orders.*", &log, Vec::new());

        emitter.emit(Event::new("orders.created", 1_u32)).await;
        assert_eq!(emitter.listeners("orders.created"), vec![log]);
        emitter.shutdown().await;
    }
}
