//! # Committed Tables
//!
//! A `Table<T>` holds the committed rows of one relation. Every row carries its own lock, so a
//! session can hold an exclusive lock on a single row for the duration of a transaction without
//! blocking readers or writers of any other row.
//!
//! Tables are never mutated directly by callers; committed state only changes when a session
//! commits its [`Staged`](super::Staged) writes through [`Table::apply`].

use super::entity::Entity;
use super::staging::Write;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The exclusive lock guarding one row.
pub type RowLock = Arc<Mutex<()>>;

struct Slot<T> {
    value: T,
    lock: RowLock,
}

/// Committed rows of one relation, keyed by id.
pub struct Table<T: Entity> {
    rows: BTreeMap<T::Id, Slot<T>>,
    sequence: AtomicU32,
}

impl<T: Entity> Table<T> {
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            sequence: AtomicU32::new(1),
        }
    }

    /// Allocates the next id from the table sequence. Ids of rolled back inserts are not reused.
    pub fn allocate_id(&self) -> T::Id {
        T::Id::from(self.sequence.fetch_add(1, Ordering::SeqCst))
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.rows.get(id).map(|slot| &slot.value)
    }

    /// The lock of a committed row, if the row exists.
    pub fn row_lock(&self, id: &T::Id) -> Option<RowLock> {
        self.rows.get(id).map(|slot| Arc::clone(&slot.lock))
    }

    /// Committed rows in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.rows.values().map(|slot| &slot.value)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Applies a committed write set.
    pub fn apply(&mut self, writes: BTreeMap<T::Id, Write<T>>) {
        for (id, write) in writes {
            match write {
                Write::Insert(value) => {
                    self.rows.insert(
                        id,
                        Slot {
                            value,
                            lock: RowLock::default(),
                        },
                    );
                }
                Write::Update(value) => {
                    if let Some(slot) = self.rows.get_mut(&id) {
                        slot.value = value;
                    }
                }
                Write::Delete => {
                    self.rows.remove(&id);
                }
            }
        }
    }
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}
