//! # promo-watch - Promotion monitoring for a list of websites
//!
//! This crate checks a configured list of sites for active promotions. For each
//! site it fetches the homepage, picks same-domain links whose URL or anchor text
//! mentions a promotion keyword, extracts the visible text of every candidate
//! page and asks a Gemini model whether the page advertises a promotion. The
//! per-site verdicts are written as JSON and CSV, optionally with an HTML report.
//!
//! ## Features
//!
//! - YAML configuration with environment overrides for the API key
//! - Bounded, retrying page fetches with a global concurrency cap
//! - Rate-limited completion calls with tolerant parsing of model replies
//! - Atomic result files
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use promo_watch::{config::Settings, model, monitor::Monitor, report};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Arc::new(Settings::load(Path::new("config.yml"))?);
//!     let model = model::gemini_from_settings(&settings)?;
//!
//!     let monitor = Monitor::new(settings.clone(), model)?;
//!     let output = monitor.run().await;
//!
//!     let files = report::write_run(&output, &settings)?;
//!     println!("{} sites checked, saved to {}", output.len(), files.json.display());
//!     Ok(())
//! }
//! ```

mod error;

pub mod analyzer;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod model;
pub mod monitor;
pub mod report;

pub use error::{Error, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::analyzer::{PageResult, PageStatus, Verdict};
    pub use crate::config::Settings;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::monitor::{Monitor, RunOutput, SiteResult};
}
