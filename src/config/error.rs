//! Error types for the config module

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML or has the wrong shape
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// No API key in the environment or the config file
    #[error("missing GEMINI_API_KEY: set it in the environment, a .env file, or `gemini_api_key` in the config")]
    MissingApiKey,

    /// The site list is empty
    #[error("no sites configured: add at least one entry under `sites`")]
    NoSites,

    /// A numeric limit is out of range
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Name of the offending option
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn must_be_positive(field: &'static str) -> Self {
        Self::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        }
    }
}
