//! Single-flight refresh locks
//!
//! A key gets a lock only while someone is refreshing it or waiting to. The
//! last guard released for a key removes the lock again, so the table tracks
//! in-flight refreshes and not every key ever refreshed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type KeyLock = Arc<tokio::sync::Mutex<()>>;

/// Per-key async locks used to serialise upstream refreshes
#[derive(Debug, Default)]
pub(crate) struct RefreshCoalescer {
    locks: Mutex<HashMap<String, KeyLock>>,
}

/// Exclusive right to refresh one key
///
/// Dropping it wakes the next waiter, or forgets the key when nobody waits.
pub(crate) struct RefreshGuard<'a> {
    coalescer: &'a RefreshCoalescer,
    key: String,
    held: Option<OwnedMutexGuard<()>>,
}

impl RefreshCoalescer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller is refreshing `key`
    pub(crate) async fn acquire(&self, key: &str) -> RefreshGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };

        RefreshGuard {
            coalescer: self,
            key: key.to_string(),
            held: Some(lock.lock_owned().await),
        }
    }

    /// Number of keys with a refresh in flight or queued
    pub(crate) fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());

        let mut locks = self
            .coalescer
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the table's own handle left: no holder, no waiter.
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}
