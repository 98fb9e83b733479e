//! Cached access to the school and teacher statistics datasets
//!
//! Wraps an [`UpstreamClient`] in a [`CacheProxy`] so repeated queries within
//! the freshness window never reach the upstream, and an upstream outage
//! keeps serving the last snapshot that was fetched.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::upstream::{UpstreamClient, UpstreamError};
use super::Dataset;
use crate::cache::{cache_key, CacheError, CacheOutcome, CacheProxy};
use crate::config::Config;

/// Errors that can occur when fetching a dataset
#[derive(Debug, Error)]
pub enum DataError {
    /// The HTTP client could not be constructed
    #[error("Failed to build upstream client: {0}")]
    ClientSetup(#[source] UpstreamError),

    /// Upstream failed and no cached snapshot exists
    #[error("Data unavailable: {0}")]
    Unavailable(#[from] CacheError<UpstreamError>),
}

/// Dataset service backed by one cache proxy
#[derive(Debug)]
pub struct SchoolsData {
    upstream: UpstreamClient,
    proxy: CacheProxy<Value>,
    sekolah_endpoint: String,
    ptk_endpoint: String,
}

impl SchoolsData {
    /// Creates the service from configuration
    pub fn from_config(config: &Config) -> Result<Self, DataError> {
        let upstream = UpstreamClient::new(config.base_url.clone(), config.timeout())
            .map_err(DataError::ClientSetup)?;
        let proxy = CacheProxy::new(config.freshness_window()).with_single_flight(config.single_flight);
        Ok(Self::new(upstream, proxy)
            .with_endpoints(config.sekolah_endpoint.clone(), config.ptk_endpoint.clone()))
    }

    /// Creates the service from an upstream client and a proxy
    ///
    /// Uses the default `sekolah` and `ptk` endpoints.
    pub fn new(upstream: UpstreamClient, proxy: CacheProxy<Value>) -> Self {
        let defaults = Config::default();
        Self {
            upstream,
            proxy,
            sekolah_endpoint: defaults.sekolah_endpoint,
            ptk_endpoint: defaults.ptk_endpoint,
        }
    }

    /// Overrides the upstream endpoints the dataset aliases resolve to
    pub fn with_endpoints(mut self, sekolah: impl Into<String>, ptk: impl Into<String>) -> Self {
        self.sekolah_endpoint = sekolah.into();
        self.ptk_endpoint = ptk.into();
        self
    }

    /// The proxy holding cached snapshots
    pub fn proxy(&self) -> &CacheProxy<Value> {
        &self.proxy
    }

    /// Resolves a dataset to its upstream endpoint path
    pub fn endpoint<'a>(&'a self, dataset: &'a Dataset) -> &'a str {
        match dataset {
            Dataset::Sekolah => &self.sekolah_endpoint,
            Dataset::Ptk => &self.ptk_endpoint,
            Dataset::Endpoint(path) => path,
        }
    }

    /// Fetches a dataset snapshot through the cache
    ///
    /// # Arguments
    /// * `dataset` - Which dataset to query
    /// * `params` - Query parameters; part of the cache key
    ///
    /// # Returns
    /// * `Ok(payload)` - Fresh or, during an upstream outage, stale data
    /// * `Err(DataError::Unavailable)` - Upstream failed and nothing is cached
    pub async fn fetch(
        &self,
        dataset: &Dataset,
        params: &[(String, String)],
    ) -> Result<Arc<Value>, DataError> {
        self.fetch_traced(dataset, params)
            .await
            .map(|(payload, _)| payload)
    }

    /// Same as [`fetch`](Self::fetch), also reporting how the request was served
    pub async fn fetch_traced(
        &self,
        dataset: &Dataset,
        params: &[(String, String)],
    ) -> Result<(Arc<Value>, CacheOutcome), DataError> {
        let endpoint = self.endpoint(dataset);
        let key = cache_key(endpoint, params);
        let result = self
            .proxy
            .get_data_traced(&key, || self.upstream.get_json::<Value>(endpoint, params))
            .await?;
        Ok(result)
    }
}
