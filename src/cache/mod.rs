//! Cache module for fronting upstream APIs
//!
//! This module provides an in-memory caching proxy with a fixed freshness
//! window. It supports graceful degradation by serving expired entries when a
//! refresh fails, so callers keep getting the last known-good payload while the
//! upstream is down.

mod clock;
mod coalesce;
mod key;
mod proxy;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{cache_key, normalize_endpoint};
pub use proxy::{CacheError, CacheOutcome, CacheProxy, DEFAULT_FRESHNESS_WINDOW};
pub use store::{CacheEntry, CacheStore};
