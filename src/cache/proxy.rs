//! Stale-tolerant caching proxy for upstream reads
//!
//! Serves a cached payload while it is younger than the freshness window,
//! refreshes it from the upstream otherwise, and falls back to the last
//! known-good payload when the refresh fails. The caller only sees an error
//! when the upstream fails and nothing has ever been cached for the key.

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::coalesce::RefreshCoalescer;
use super::store::CacheStore;

/// Default freshness window (one hour)
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(3600);

/// Errors surfaced by [`CacheProxy::get_data`]
#[derive(Debug, Error)]
pub enum CacheError<E> {
    /// The upstream fetch failed and there is no cached payload to fall back on
    #[error("no data available for '{key}': {source}")]
    NoDataAvailable {
        /// The key that was requested
        key: String,
        /// The upstream failure
        #[source]
        source: E,
    },
}

impl<E> CacheError<E> {
    /// The cache key the failed lookup was for
    pub fn key(&self) -> &str {
        match self {
            CacheError::NoDataAvailable { key, .. } => key,
        }
    }

    /// Consumes the error and returns the upstream failure
    pub fn into_source(self) -> E {
        match self {
            CacheError::NoDataAvailable { source, .. } => source,
        }
    }
}

/// Which path served a lookup
///
/// Meant for logs and metrics. Callers should present fresh and stale
/// payloads identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from cache within the freshness window, no upstream call
    Fresh,
    /// Fetched from the upstream and stored
    Refreshed,
    /// The upstream failed and an expired entry was served instead
    Stale,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CacheOutcome::Fresh => "fresh",
            CacheOutcome::Refreshed => "refreshed",
            CacheOutcome::Stale => "stale",
        };
        f.write_str(label)
    }
}

/// Caching proxy in front of a slow or unreliable upstream
///
/// The store is handed in at construction and may be shared with other
/// proxies. The payload type is chosen by the caller, so the proxy never needs
/// to know the upstream schema.
pub struct CacheProxy<T> {
    store: Arc<CacheStore<T>>,
    clock: Arc<dyn Clock>,
    freshness_window: Duration,
    coalescer: Option<RefreshCoalescer>,
}

impl<T> CacheProxy<T> {
    /// Creates a proxy using wall-clock time
    pub fn new(freshness_window: Duration) -> Self {
        Self::with_clock(freshness_window, Arc::new(SystemClock))
    }

    /// Creates a proxy with a custom time source and an empty store
    pub fn with_clock(freshness_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::with_store(freshness_window, clock, Arc::new(CacheStore::new()))
    }

    /// Creates a proxy over an existing store
    ///
    /// Entries already in `store` are served as if this proxy had fetched
    /// them, and refreshes are visible to every proxy sharing it.
    pub fn with_store(
        freshness_window: Duration,
        clock: Arc<dyn Clock>,
        store: Arc<CacheStore<T>>,
    ) -> Self {
        Self {
            store,
            clock,
            freshness_window,
            coalescer: None,
        }
    }

    /// Enables or disables single-flight refreshes
    ///
    /// When enabled, concurrent callers that find the same key stale wait on
    /// one another instead of each issuing an upstream request. Whoever gets
    /// the key second re-checks the cache before fetching.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.coalescer = enabled.then(RefreshCoalescer::new);
        self
    }

    /// The configured freshness window
    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Whether concurrent refreshes of one key are coalesced
    pub fn single_flight(&self) -> bool {
        self.coalescer.is_some()
    }

    /// The backing store
    pub fn store(&self) -> &Arc<CacheStore<T>> {
        &self.store
    }

    /// Number of keys currently cached
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns the cached payload and its fetch time without touching the upstream
    pub fn peek(&self, key: &str) -> Option<(Arc<T>, DateTime<Utc>)> {
        self.store
            .get(key)
            .map(|entry| (entry.payload, entry.fetched_at))
    }

    /// Returns the payload for `key`, fetching it through `fetch_fn` if needed
    ///
    /// # Arguments
    /// * `key` - Identifies the logical upstream query
    /// * `fetch_fn` - Performs one upstream request; only called on a miss or
    ///   when the cached entry is older than the freshness window
    ///
    /// # Returns
    /// * `Ok(payload)` - Fresh, refreshed, or (if the refresh failed) stale data
    /// * `Err(CacheError::NoDataAvailable)` - The fetch failed and nothing was cached
    pub async fn get_data<F, Fut, E>(&self, key: &str, fetch_fn: F) -> Result<Arc<T>, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.get_data_traced(key, fetch_fn)
            .await
            .map(|(payload, _)| payload)
    }

    /// Same as [`get_data`](Self::get_data), also reporting which path served the call
    pub async fn get_data_traced<F, Fut, E>(
        &self,
        key: &str,
        fetch_fn: F,
    ) -> Result<(Arc<T>, CacheOutcome), CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if let Some(payload) = self.fresh_payload(key) {
            debug!(key, "cache hit");
            return Ok((payload, CacheOutcome::Fresh));
        }

        // Held until the refresh below has been stored.
        let _refresh_guard = match &self.coalescer {
            Some(coalescer) => {
                let guard = coalescer.acquire(key).await;
                if let Some(payload) = self.fresh_payload(key) {
                    debug!(key, "refreshed by a concurrent caller");
                    return Ok((payload, CacheOutcome::Fresh));
                }
                Some(guard)
            }
            None => None,
        };

        match fetch_fn().await {
            Ok(payload) => {
                let payload = Arc::new(payload);
                self.store.put(key, Arc::clone(&payload), self.clock.now());
                info!(key, "cache refreshed from upstream");
                Ok((payload, CacheOutcome::Refreshed))
            }
            Err(error) => match self.store.get(key) {
                Some(entry) => {
                    warn!(
                        key,
                        fetched_at = %entry.fetched_at,
                        error = %error,
                        "upstream fetch failed, serving stale entry"
                    );
                    Ok((entry.payload, CacheOutcome::Stale))
                }
                None => {
                    warn!(key, error = %error, "upstream fetch failed and nothing is cached");
                    Err(CacheError::NoDataAvailable {
                        key: key.to_string(),
                        source: error,
                    })
                }
            },
        }
    }

    fn fresh_payload(&self, key: &str) -> Option<Arc<T>> {
        let entry = self.store.get(key)?;
        self.is_fresh(entry.fetched_at).then_some(entry.payload)
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        match (self.clock.now() - fetched_at).to_std() {
            Ok(age) => age < self.freshness_window,
            // Clock went backwards: the entry cannot be older than the window.
            Err(_) => true,
        }
    }
}

impl<T> fmt::Debug for CacheProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheProxy")
            .field("entries", &self.store.len())
            .field("freshness_window", &self.freshness_window)
            .field("single_flight", &self.single_flight())
            .field(
                "refreshing",
                &self.coalescer.as_ref().map_or(0, RefreshCoalescer::len),
            )
            .finish()
    }
}
