//! # Basic Emitter Example
//!
//! Shows the full emitter lifecycle:
//! - a custom [`Listener`] and a closure listener
//! - wildcard subscriptions and a one-shot subscription
//! - pattern-scoped middleware (`SKIP` for metrics, `VOID` for debug)
//! - awaited emits, unsubscribe and shutdown
//!
//! ## Run
//! ```bash
//! RUST_LOG=emitvisor=debug cargo run --example basic
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use emitvisor::{
    Config, Emitter, Event, Flag, Listener, ListenerFnOf, ListenerRef, TypedEvent, middleware,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Order {
    id: u64,
    total_cents: u64,
}

struct Revenue {
    cents: AtomicU64,
}

#[async_trait::async_trait]
impl Listener for Revenue {
    async fn handle(&self, event: &Event) {
        if let Some(order) = event.subject_as::<Order>() {
            self.cents.fetch_add(order.total_cents, Ordering::Relaxed);
        }
    }

    fn name(&self) -> &str {
        "revenue"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let emitter = Emitter::builder(Config::with_capacity(64))
        .with_middleware("metrics.*", [middleware::skip()])
        .with_middleware("debug.*", [middleware::void()])
        .build();

    let revenue = Arc::new(Revenue {
        cents: AtomicU64::new(0),
    });
    let revenue_ref = ListenerRef::from_arc(revenue.clone());

    let printer = ListenerFnOf::arc("printer", |ev: TypedEvent<Order>| async move {
        println!("[printer] {} -> order #{}", ev.topic(), ev.subject().id);
    });

    let first = ListenerFnOf::arc("first-order", |ev: TypedEvent<Order>| async move {
        println!("[first-order] welcome, order #{}", ev.subject().id);
    });

    emitter.on("orders.*", &revenue_ref, []);
    emitter.on("orders.created", &printer, []);
    emitter.once("orders.created", &first, []);

    println!("topics: {:?}", emitter.topics());
    println!("middleware patterns: {:?}", emitter.middleware_patterns());

    for id in 1..=3 {
        let order = Order {
            id,
            total_cents: id * 1_000,
        };
        emitter.emit(Event::new("orders.created", order)).await;
    }

    // Delivery flag set by the caller instead of middleware.
    emitter
        .emit(Event::new("orders.refunded", Order { id: 9, total_cents: 0 }).with_flag(Flag::SKIP))
        .await;

    // Dropped by the "debug.*" middleware.
    emitter.emit(Event::empty("debug.trace")).await;

    emitter.off("orders.created", &[printer]);
    println!(
        "listeners on orders.created: {:?}",
        emitter
            .listeners("orders.created")
            .iter()
            .map(ListenerRef::name)
            .collect::<Vec<_>>()
    );

    emitter.shutdown().await;
    println!(
        "revenue: {} cents",
        revenue.cents.load(Ordering::Relaxed)
    );
}
