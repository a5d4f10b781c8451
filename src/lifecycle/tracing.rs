//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
//! Module paths are hidden (`with_target(false)`); every event carries its own structured fields
//! (`order_id`, `product_id`, `table`, `id`, ...) instead.
//!
//! ## Levels
//!
//! - `info` - state changes: order created, status updated, product soft-deleted, store opened.
//! - `warn` - rejected business operations and degraded side channels (cache or event log down).
//! - `debug` - payloads, commits and rollbacks, cache hits.
//! - `trace` - row lock waits and acquisitions.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=order_desk::db=trace cargo run
//! ```
//!
//! With `RUST_LOG=debug` one order looks like:
//!
//! ```text
//! DEBUG create_order: Stock reserved user_id=user_1 product_id=product_1 quantity=2 stock_left=8
//! DEBUG create_order: Insert staged table="orders" id=order_1
//! DEBUG create_order: Committed written=2 released=1
//!  INFO create_order: Order created order_id=order_1
//!  INFO Order created order_id=order_1 user_id=user_1 product_id=product_1 quantity=2
//! ```
//!
//! The last line comes from the event log task and is therefore outside the request span.

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
