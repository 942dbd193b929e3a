//! Per-file advisory locks.
//!
//! Every operation that writes, opens or deletes a name in an area holds the
//! lock for that `(area, name)` pair. No caller holds two guards at once.
//! A key is forgotten as soon as its last guard drops with nobody waiting,
//! so the map only tracks names in use.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::paths::Area;

type LockKey = (Area, String);
type LockMap = DashMap<LockKey, Arc<Mutex<()>>>;

/// Async mutex keyed by `(area, file name)`.
#[derive(Debug, Clone, Default)]
pub struct FileLocks {
    locks: Arc<LockMap>,
}

/// Holds the lock for one `(area, name)` pair until dropped.
#[derive(Debug)]
pub struct FileGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: LockKey,
    locks: Arc<LockMap>,
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        // Release first so the map holds the only other reference
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `name` in `area`, waiting if it is held.
    ///
    /// The lock is released when the guard is dropped.
    pub async fn lock(&self, area: Area, name: &str) -> FileGuard {
        // Built before waiting so a cancelled wait still forgets the key
        let mut guard = FileGuard {
            guard: None,
            key: (area, name.to_string()),
            locks: Arc::clone(&self.locks),
        };
        let mutex = self
            .locks
            .entry(guard.key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        guard.guard = Some(mutex.lock_owned().await);
        guard
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
