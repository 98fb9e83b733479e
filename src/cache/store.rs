//! In-memory cache store
//!
//! Holds at most one entry per key. Entries are replaced on refresh and never
//! evicted, so an expired entry stays available as a fallback for as long as
//! the store lives.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A cached upstream payload
#[derive(Debug)]
pub struct CacheEntry<T> {
    /// The upstream query this entry answers
    pub key: String,
    /// The payload as returned by the upstream
    pub payload: Arc<T>,
    /// When the payload was fetched from the upstream
    pub fetched_at: DateTime<Utc>,
}

// Manual impl: cloning an entry clones the `Arc`, so `T` need not be `Clone`.
impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            payload: Arc::clone(&self.payload),
            fetched_at: self.fetched_at,
        }
    }
}

/// Thread-safe map from cache key to entry
///
/// Lock guards never escape this type, so callers cannot hold the lock
/// across an `.await`.
#[derive(Debug)]
pub struct CacheStore<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T> CacheStore<T> {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a copy of the entry for `key`, fresh or not
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Inserts or replaces the entry for `key`
    pub fn put(&self, key: &str, payload: Arc<T>, fetched_at: DateTime<Utc>) {
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            fetched_at,
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), entry);
    }

    /// Number of keys held
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
