//! Query orchestration for the govdata CLI
//!
//! Fetches every requested dataset concurrently through the shared cache and
//! turns the results into the JSON document printed on stdout.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::cache::CacheOutcome;
use crate::data::{DataError, Dataset, DatasetSummary, SchoolsData};

/// Result of fetching one dataset
#[derive(Debug)]
pub struct DatasetReport {
    /// The dataset that was requested
    pub dataset: Dataset,
    /// Payload and how it was served, or why there is none
    pub result: Result<(Arc<Value>, CacheOutcome), DataError>,
}

impl DatasetReport {
    /// Whether a payload (fresh or stale) is available
    pub fn is_available(&self) -> bool {
        self.result.is_ok()
    }
}

/// Main application struct tying the CLI query to the dataset service
#[derive(Debug)]
pub struct App {
    /// Cached dataset service, shared across watch rounds
    data: SchoolsData,
    /// Datasets to query, in output order
    datasets: Vec<Dataset>,
    /// Query parameters sent with every dataset
    params: Vec<(String, String)>,
    /// Render summaries instead of raw payloads
    summary: bool,
}

impl App {
    /// Creates an App for the given service and query
    pub fn new(data: SchoolsData, datasets: Vec<Dataset>, params: Vec<(String, String)>) -> Self {
        Self {
            data,
            datasets,
            params,
            summary: false,
        }
    }

    /// Switches output to [`DatasetSummary`] per dataset
    pub fn with_summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }

    /// The underlying dataset service
    pub fn data(&self) -> &SchoolsData {
        &self.data
    }

    /// Loads all requested datasets concurrently
    pub async fn load_all(&self) -> Vec<DatasetReport> {
        let futures = self
            .datasets
            .iter()
            .map(|dataset| self.data.fetch_traced(dataset, &self.params));
        let results = futures::future::join_all(futures).await;

        self.datasets
            .iter()
            .cloned()
            .zip(results)
            .map(|(dataset, result)| {
                match &result {
                    Ok((_, outcome)) => info!(dataset = %dataset, %outcome, "dataset loaded"),
                    Err(err) => info!(dataset = %dataset, error = %err, "dataset unavailable"),
                }
                DatasetReport { dataset, result }
            })
            .collect()
    }

    /// Renders reports as one JSON object keyed by dataset name
    ///
    /// Fresh and stale payloads render identically; a dataset with no data
    /// renders as `{"error": "..."}`.
    pub fn render(&self, reports: &[DatasetReport]) -> Value {
        let mut output = Map::new();
        for report in reports {
            let rendered = match &report.result {
                Ok((payload, _)) if self.summary => {
                    let summary = DatasetSummary::from_payload(payload);
                    json!({ "rows": summary.rows, "totals": summary.totals })
                }
                Ok((payload, _)) => payload.as_ref().clone(),
                Err(err) => json!({ "error": err.to_string() }),
            };
            output.insert(report.dataset.name().to_string(), rendered);
        }
        Value::Object(output)
    }
}

/// Whether every report carries data
pub fn all_available(reports: &[DatasetReport]) -> bool {
    reports.iter().all(DatasetReport::is_available)
}
