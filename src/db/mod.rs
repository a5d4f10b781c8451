//! # Relational Store
//!
//! An in-memory relational store with the guarantees the order protocol relies on:
//!
//! - **Row-level exclusive locks** scoped to a transaction ([`Session::lock`]), the in-process
//!   equivalent of `SELECT ... FOR UPDATE`. A second locker of the same row waits until the holder
//!   commits or rolls back, and then observes the committed value.
//! - **Atomic commit**: all writes of a session become visible together, or not at all.
//! - **Referential integrity** for orders, a unique index on user email, and a configurable
//!   [`OnDelete`] policy when a user or product row is removed.
//!
//! ## Lifecycle
//!
//! A [`Store`] is an explicit, cloneable handle. There is no global engine: whoever starts the
//! application opens the store and passes it down, and [`Store::shutdown`] closes it.
//!
//! ```rust
//! use order_desk::db::{Store, StoreOptions};
//! use order_desk::model::{Product, ProductId};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), order_desk::framework::StoreError> {
//! let store = Store::open(StoreOptions::default());
//! let mut session = store.session();
//! let missing: Option<Product> = session.lock(ProductId(1)).await?;
//! assert!(missing.is_none());
//! session.rollback();
//! store.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod session;
pub mod store;

pub use session::*;
pub use store::*;

use crate::framework::{Entity, Staged, Table};
use crate::model::{Order, Product, User};

/// Committed state of every relation.
#[derive(Default)]
pub struct Tables {
    users: Table<User>,
    products: Table<Product>,
    orders: Table<Order>,
}

/// Locks held and writes staged by one session, per relation.
#[derive(Default)]
pub struct Pending {
    users: Staged<User>,
    products: Staged<Product>,
    orders: Staged<Order>,
}

impl Pending {
    fn release_all(&mut self) -> usize {
        self.users.release() + self.products.release() + self.orders.release()
    }

    fn is_dirty(&self) -> bool {
        self.users.is_dirty() || self.products.is_dirty() || self.orders.is_dirty()
    }
}

/// A record type stored in [`Tables`]. Lets the session address each relation generically.
pub trait Relation: Entity {
    fn table(tables: &Tables) -> &Table<Self>;
    fn staged(pending: &Pending) -> &Staged<Self>;
    fn staged_mut(pending: &mut Pending) -> &mut Staged<Self>;
}

macro_rules! relation {
    ($ty:ty, $field:ident) => {
        impl Relation for $ty {
            fn table(tables: &Tables) -> &Table<Self> {
                &tables.$field
            }
            fn staged(pending: &Pending) -> &Staged<Self> {
                &pending.$field
            }
            fn staged_mut(pending: &mut Pending) -> &mut Staged<Self> {
                &mut pending.$field
            }
        }
    };
}

relation!(User, users);
relation!(Product, products);
relation!(Order, orders);
