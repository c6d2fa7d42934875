//! Per-book lock registry
//!
//! Serializes the read-check-write sequence of a lending operation per
//! book id. The registry's own map lock is held only long enough to
//! fetch or insert an entry, so operations on different books do not
//! contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Registry of per-book mutexes
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (or create) the lock for a book.
    ///
    /// The caller locks the returned mutex for the duration of its
    /// critical section. Entries are never removed; the registry grows
    /// with the catalog, one small entry per book ever touched.
    pub fn entry(&self, book_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            // A poisoned map still holds valid Arc entries
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(book_id).or_default().clone()
    }
}
