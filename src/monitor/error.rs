//! Error types for the monitor module

use thiserror::Error;

/// Error type for site-level failures
///
/// These never abort a run; they end up in `SiteResult::error`.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The configured site URL cannot be parsed
    #[error("invalid site URL {url:?}: {source}")]
    InvalidSiteUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The concurrency limiter was closed
    #[error("concurrency limiter unavailable: {0}")]
    Limiter(#[from] tokio::sync::AcquireError),

    /// The site task panicked or was cancelled
    #[error("site task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for MonitorError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
