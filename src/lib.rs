//! govdata library
//!
//! Stale-tolerant caching proxy for the schools-data API, plus the upstream
//! client, configuration and CLI pieces built on it.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
