//! # Lifecycle & Wiring
//!
//! [`OrderDesk`] is the one place where the pieces are created and connected:
//!
//! 1. **Store** - opened from [`Config::store_options`](crate::config::Config::store_options).
//! 2. **Side-channel actors** - the product cache and the event log, each spawned in its own task.
//! 3. **Identity** - the password hasher and token issuer, shared behind `Arc`.
//! 4. **Services** - built per request (per worker) on a fresh store session, with clones of the
//!    actor clients injected.
//!
//! ## Graceful Shutdown
//!
//! [`OrderDesk::shutdown`] closes the store, flips the stop signal both actors watch and awaits
//! their tasks. Each actor answers what is already queued, then exits even if services handed out
//! by the desk still hold client clones. Those services keep working against nothing: store calls
//! fail with `Closed`, and cache and event requests are dropped.
//!
//! ## Observability
//!
//! [`setup_tracing`] installs the `tracing` subscriber; see the [`tracing`](self::tracing) module.

pub mod order_desk;
pub mod tracing;

pub use order_desk::*;
pub use tracing::*;
