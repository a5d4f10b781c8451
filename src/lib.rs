//! # Order Desk
//!
//! > **An order-management backend that cannot oversell.**
//!
//! Users register and log in, browse a product catalog and place orders that draw from product
//! stock; admins manage products and move orders through their lifecycle. The part that matters
//! is the **stock reservation protocol**: creating an order atomically checks and decrements
//! stock, and cancelling it atomically puts the stock back, no matter how many requests race for
//! the same product.
//!
//! ## 🏗️ Design
//!
//! ### Pessimistic row locks
//! Every stock mutation locks the product row first and holds the lock until commit, the
//! in-process equivalent of `SELECT ... FOR UPDATE`. Two orders for the same product run their
//! check-and-decrement one after the other; orders for different products never wait on each other.
//! See [`db`].
//!
//! ### One transaction per session
//! A [`Session`](db::Session) collects locks and writes and publishes them in a single commit.
//! Services roll back on every error before returning it, so a failed call leaves no trace.
//!
//! ### Explicit lifecycle
//! No globals. [`OrderDesk`](lifecycle::OrderDesk) opens the store, starts the side-channel actors
//! and hands out services; [`shutdown`](lifecycle::OrderDesk::shutdown) stops everything.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. Storage ([`framework`], [`db`])
//! - **Role**: generic tables, per-row locks and per-transaction staging; the concrete store with
//!   constraint checks and delete policies.
//! - **Key items**: [`Entity`](framework::Entity), [`Store`](db::Store), [`Session`](db::Session).
//!
//! ### 2. The core ([`orders`])
//! - **Role**: the stock protocol and the order status machine.
//! - **Key items**: [`OrderService`](orders::OrderService),
//!   [`OrderRepository`](orders::OrderRepository), [`OrderError`](orders::OrderError).
//!
//! ### 3. Catalog and identity ([`products`], [`users`], [`auth`])
//! - **Role**: product CRUD with soft delete, registration/login, tokens and principals.
//!
//! ### 4. Side channels ([`cache`], [`events`])
//! - **Role**: best-effort product cache and fire-and-forget notices, each an actor in its own task.
//!
//! ### 5. Edges ([`api`], [`config`], [`lifecycle`])
//! - **Role**: error-to-status mapping and pagination, environment configuration, wiring and tracing.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! cargo test
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod events;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod orders;
pub mod products;
pub mod users;
