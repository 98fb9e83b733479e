//! Command-line interface parsing for govdata
//!
//! This module handles parsing of CLI arguments using clap, including the
//! repeatable `--param KEY=VALUE` query parameters and the config overrides.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::data::Dataset;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--param` value is not of the form KEY=VALUE
    #[error("Invalid parameter: '{0}'. Expected KEY=VALUE")]
    InvalidParam(String),

    /// `--watch` was given a zero interval
    #[error("Watch interval must be at least one second")]
    InvalidWatchInterval,
}

/// govdata - Cached access to the national schools-data API
#[derive(Parser, Debug)]
#[command(name = "govdata")]
#[command(about = "Query school and teacher statistics through a stale-tolerant cache")]
#[command(version)]
pub struct Cli {
    /// Datasets to fetch: sekolah, ptk, or a raw endpoint path
    #[arg(required = true, value_name = "DATASET")]
    pub datasets: Vec<String>,

    /// Query parameter sent with every request (repeatable)
    ///
    /// Examples:
    ///   govdata sekolah --param semester_id=20241
    ///   govdata ptk --param kode_wilayah=010000 --param id_level_wilayah=1
    #[arg(long = "param", short = 'p', value_name = "KEY=VALUE", value_parser = parse_param_arg)]
    pub params: Vec<(String, String)>,

    /// Base URL of the upstream API
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Seconds a fetched payload is served before refetching
    #[arg(long, value_name = "SECS")]
    pub freshness_secs: Option<u64>,

    /// Upstream request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Path to a JSON config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Coalesce concurrent refreshes of the same query
    #[arg(long)]
    pub single_flight: bool,

    /// Print row counts and numeric totals instead of raw payloads
    #[arg(long)]
    pub summary: bool,

    /// Re-run the query every SECS seconds until interrupted
    #[arg(long, value_name = "SECS")]
    pub watch: Option<u64>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// Parses a `KEY=VALUE` argument into a pair.
///
/// # Arguments
/// * `s` - The parameter string from CLI
///
/// # Returns
/// * `Ok((key, value))` if the string contains `=` and a non-empty key
/// * `Err(CliError::InvalidParam)` otherwise
pub fn parse_param_arg(s: &str) -> Result<(String, String), CliError> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidParam(s.to_string())),
    }
}

impl Cli {
    /// The requested datasets, in command-line order
    ///
    /// Aliases of a dataset already listed are dropped, so `sekolah schools`
    /// fetches and prints one entry.
    pub fn dataset_list(&self) -> Vec<Dataset> {
        let mut list = Vec::with_capacity(self.datasets.len());
        for dataset in self.datasets.iter().map(|name| Dataset::parse(name)) {
            if !list.contains(&dataset) {
                list.push(dataset);
            }
        }
        list
    }

    /// Applies flag overrides on top of a loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref url) = self.base_url {
            config.base_url = url.clone();
        }
        if let Some(secs) = self.freshness_secs {
            config.freshness_secs = secs;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if self.single_flight {
            config.single_flight = true;
        }
    }

    /// The `--watch` interval, if any
    pub fn watch_interval(&self) -> Result<Option<Duration>, CliError> {
        match self.watch {
            None => Ok(None),
            Some(0) => Err(CliError::InvalidWatchInterval),
            Some(secs) => Ok(Some(Duration::from_secs(secs))),
        }
    }

    /// Default tracing filter for this invocation
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "govdata=debug"
        } else {
            "govdata=info"
        }
    }
}
