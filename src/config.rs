//! Runtime configuration for the schools-data proxy
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! `GOVDATA_*` environment variables. CLI flags are applied last by the caller.

use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default upstream base URL (Dapodik public recap API)
pub const DEFAULT_BASE_URL: &str = "https://dapo.kemdikbud.go.id/rekap";

/// Default freshness window in seconds
pub const DEFAULT_FRESHNESS_SECS: u64 = 3600;

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_BASE_URL: &str = "GOVDATA_BASE_URL";
const ENV_FRESHNESS_SECS: &str = "GOVDATA_FRESHNESS_SECS";
const ENV_TIMEOUT_SECS: &str = "GOVDATA_TIMEOUT_SECS";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`Config`]
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An environment variable holds a value of the wrong type
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    /// A setting is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Proxy configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the schools-data API
    pub base_url: String,
    /// How long a fetched payload is served without refetching
    pub freshness_secs: u64,
    /// Timeout applied to each upstream request
    pub timeout_secs: u64,
    /// Coalesce concurrent refreshes of the same key
    pub single_flight: bool,
    /// Upstream endpoint for the `sekolah` dataset
    pub sekolah_endpoint: String,
    /// Upstream endpoint for the `ptk` dataset
    pub ptk_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            freshness_secs: DEFAULT_FRESHNESS_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            single_flight: false,
            sekolah_endpoint: "dataSekolah".to_string(),
            ptk_endpoint: "dataPTK".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from defaults, file and environment
    ///
    /// # Arguments
    /// * `path` - Explicit config file. When `None`, `config.json` in the
    ///   platform config directory is used if it exists.
    ///
    /// # Returns
    /// * `Ok(Config)` with all layers applied
    /// * `Err(ConfigError)` if an explicit file is missing, or any layer is invalid
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `GOVDATA_*` overrides using the given variable lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(value) = lookup(ENV_FRESHNESS_SECS) {
            self.freshness_secs = parse_env_secs(ENV_FRESHNESS_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = parse_env_secs(ENV_TIMEOUT_SECS, value)?;
        }
        Ok(())
    }

    /// Checks that the settings can be used to build a client
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Freshness window as a [`Duration`]
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns `config.json` in the XDG config directory (`~/.config/govdata/` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "govdata")?;
    Some(project_dirs.config_dir().join("config.json"))
}

fn parse_env_secs(name: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}
