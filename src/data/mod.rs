//! Schools-data API access
//!
//! This module contains the upstream HTTP client, the cached dataset service
//! built on top of it, and the summary type used for CLI output.

pub mod schools;
pub mod summary;
pub mod upstream;

pub use schools::{DataError, SchoolsData};
pub use summary::DatasetSummary;
pub use upstream::{UpstreamClient, UpstreamError};

use std::fmt;

/// A dataset exposed by the schools-data API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dataset {
    /// School counts (`sekolah`)
    Sekolah,
    /// Teacher and education staff counts (`ptk`)
    Ptk,
    /// Any other endpoint, passed through as a path
    Endpoint(String),
}

impl Dataset {
    /// Parses a dataset name; unknown names are treated as raw endpoint paths
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "sekolah" | "schools" => Dataset::Sekolah,
            "ptk" | "teachers" => Dataset::Ptk,
            _ => Dataset::Endpoint(name.trim().to_string()),
        }
    }

    /// Name used as the key in CLI output
    pub fn name(&self) -> &str {
        match self {
            Dataset::Sekolah => "sekolah",
            Dataset::Ptk => "ptk",
            Dataset::Endpoint(path) => path,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
