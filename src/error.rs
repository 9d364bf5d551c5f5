//! Error types for the promo-watch crate

use thiserror::Error;

use crate::analyzer::AnalyzeError;
use crate::config::ConfigError;
use crate::fetcher::FetchError;
use crate::monitor::MonitorError;

/// Result type for promo-watch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for promo-watch operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A page could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Page analysis failed
    #[error("Analysis error: {0}")]
    Analyze(#[from] AnalyzeError),

    /// A site could not be processed
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error while writing results
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io(err.error)
    }
}
