//! # Per-Transaction Staging
//!
//! `Staged<T>` is the part of an open transaction that concerns one relation: the row locks the
//! session currently owns and the writes it has not committed yet.
//!
//! ## Locking discipline
//!
//! - A row may only be updated or deleted after the session has locked it (or inserted it itself).
//!   Anything else is rejected with [`StoreError::NotLocked`].
//! - Locks are owned guards: they stay held until [`Staged::release`] is called on commit or
//!   rollback, or until the staging area is dropped.
//! - Writes are invisible to other sessions until they are moved into the [`Table`](super::Table).

use super::entity::Entity;
use super::error::StoreError;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::OwnedMutexGuard;

/// A pending change to one row.
#[derive(Debug, Clone)]
pub enum Write<T> {
    Insert(T),
    Update(T),
    Delete,
}

/// Locks held and writes staged by one session on one relation.
pub struct Staged<T: Entity> {
    held: HashMap<T::Id, OwnedMutexGuard<()>>,
    writes: BTreeMap<T::Id, Write<T>>,
}

impl<T: Entity> Staged<T> {
    pub fn new() -> Self {
        Self {
            held: HashMap::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Whether the session may write this row: it either holds the row lock or inserted the row.
    pub fn owns(&self, id: &T::Id) -> bool {
        self.held.contains_key(id) || matches!(self.writes.get(id), Some(Write::Insert(_)))
    }

    /// Records an acquired row lock.
    pub fn hold(&mut self, id: T::Id, guard: OwnedMutexGuard<()>) {
        self.held.insert(id, guard);
    }

    /// The session's own view of a row: its pending write if any, the committed value otherwise.
    pub fn view(&self, id: &T::Id, committed: Option<&T>) -> Option<T> {
        match self.writes.get(id) {
            Some(Write::Insert(value)) | Some(Write::Update(value)) => Some(value.clone()),
            Some(Write::Delete) => None,
            None => committed.cloned(),
        }
    }

    /// The session's own view of every row matching `filter`, in ascending id order.
    pub fn scan<'a>(
        &self,
        committed: impl Iterator<Item = &'a T>,
        filter: impl Fn(&T) -> bool,
    ) -> Vec<T> {
        let mut view: BTreeMap<T::Id, T> = committed
            .filter(|row| !self.writes.contains_key(&row.id()) && filter(row))
            .map(|row| (row.id(), row.clone()))
            .collect();
        for (id, write) in &self.writes {
            match write {
                Write::Insert(value) | Write::Update(value) if filter(value) => {
                    view.insert(*id, value.clone());
                }
                _ => {}
            }
        }
        view.into_values().collect()
    }

    pub fn insert(&mut self, value: T) {
        self.writes.insert(value.id(), Write::Insert(value));
    }

    pub fn update(&mut self, value: T) -> Result<(), StoreError> {
        let id = value.id();
        if !self.owns(&id) {
            return Err(StoreError::NotLocked {
                table: T::TABLE,
                id: id.to_string(),
            });
        }
        let write = match self.writes.get(&id) {
            Some(Write::Insert(_)) => Write::Insert(value),
            _ => Write::Update(value),
        };
        self.writes.insert(id, write);
        Ok(())
    }

    pub fn delete(&mut self, id: T::Id) -> Result<(), StoreError> {
        if !self.owns(&id) {
            return Err(StoreError::NotLocked {
                table: T::TABLE,
                id: id.to_string(),
            });
        }
        match self.writes.get(&id) {
            Some(Write::Insert(_)) => {
                self.writes.remove(&id);
            }
            _ => {
                self.writes.insert(id, Write::Delete);
            }
        }
        Ok(())
    }

    /// Pending writes, in ascending id order.
    pub fn writes(&self) -> impl Iterator<Item = (&T::Id, &Write<T>)> + '_ {
        self.writes.iter()
    }

    /// Moves the pending writes out, leaving the write set empty.
    pub fn take_writes(&mut self) -> BTreeMap<T::Id, Write<T>> {
        std::mem::take(&mut self.writes)
    }

    /// Discards pending writes and releases every row lock. Returns the number of locks released.
    pub fn release(&mut self) -> usize {
        self.writes.clear();
        let released = self.held.len();
        self.held.clear();
        released
    }

    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }
}

impl<T: Entity> Default for Staged<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    struct Note {
        id: u32,
        text: String,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("note error")]
    struct NoteError;

    impl Entity for Note {
        type Id = u32;
        type Create = String;
        type Patch = String;
        type Error = NoteError;
        const TABLE: &'static str = "notes";

        fn id(&self) -> u32 {
            self.id
        }

        fn from_create_params(id: u32, text: String) -> Result<Self, NoteError> {
            Ok(Self { id, text })
        }

        fn apply_patch(&mut self, text: String) -> Result<(), NoteError> {
            self.text = text;
            Ok(())
        }
    }

    fn note(id: u32, text: &str) -> Note {
        Note {
            id,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_update_requires_lock() {
        let mut staged = Staged::<Note>::new();
        let err = staged.update(note(1, "a")).unwrap_err();
        assert_eq!(
            err,
            StoreError::NotLocked {
                table: "notes",
                id: "1".to_string()
            }
        );
        assert!(!staged.is_dirty());
    }

    #[tokio::test]
    async fn test_locked_row_can_be_updated_and_released() {
        let lock = Arc::new(Mutex::new(()));
        let mut staged = Staged::<Note>::new();
        staged.hold(1, Arc::clone(&lock).lock_owned().await);
        assert!(lock.try_lock().is_err());

        staged.update(note(1, "b")).unwrap();
        assert_eq!(staged.view(&1, None), Some(note(1, "b")));

        assert_eq!(staged.release(), 1);
        assert!(lock.try_lock().is_ok());
        assert!(!staged.is_dirty());
    }

    #[test]
    fn test_own_insert_is_writable_and_delete_cancels_it() {
        let mut staged = Staged::<Note>::new();
        staged.insert(note(7, "new"));
        staged.update(note(7, "edited")).unwrap();
        assert!(matches!(staged.writes().next(), Some((&7, Write::Insert(n))) if n.text == "edited"));

        staged.delete(7).unwrap();
        assert!(!staged.is_dirty());
    }

    #[test]
    fn test_scan_overlays_pending_writes() {
        let committed = vec![note(1, "keep"), note(2, "drop"), note(3, "keep")];
        let mut staged = Staged::<Note>::new();
        staged.insert(note(4, "keep"));

        let view = staged.scan(committed.iter(), |n| n.text == "keep");
        let ids: Vec<u32> = view.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }
}
