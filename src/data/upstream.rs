//! HTTP client for the schools-data API
//!
//! Every failure mode (network, non-2xx status, unparseable body) is reported
//! as an [`UpstreamError`]; the cache proxy treats them all the same way.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::cache::normalize_endpoint;

/// Errors that can occur when querying the upstream API
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed (connection, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body was not the expected JSON
    #[error("Failed to parse upstream response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client for the upstream JSON API
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Base URL every endpoint is resolved against
    base_url: String,
}

impl UpstreamClient {
    /// Creates a client whose requests time out after `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("govdata/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http_client, base_url))
    }

    /// Creates a client around an existing reqwest [`Client`]
    pub fn with_client(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// The base URL endpoints are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the full URL for an endpoint, without query parameters
    ///
    /// The endpoint is normalised the same way as in cache keys.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            normalize_endpoint(endpoint)
        )
    }

    /// Performs a GET on `endpoint` and parses the JSON body
    ///
    /// # Arguments
    /// * `endpoint` - Path relative to the base URL (e.g., "dataSekolah")
    /// * `params` - Query parameters, URL-encoded by reqwest
    ///
    /// # Returns
    /// * `Ok(T)` - The parsed body of a 2xx response
    /// * `Err(UpstreamError)` - On network failure, non-2xx status or bad JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<T, UpstreamError> {
        let url = self.endpoint_url(endpoint);
        debug!(%url, params = params.len(), "requesting upstream");

        let response = self.http_client.get(&url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
