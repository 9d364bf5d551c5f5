//! # Monitor Configuration Module
//!
//! Loads the YAML configuration file into an immutable [`Settings`] value that
//! is constructed once per run and handed to every component. Nothing in the
//! crate reads configuration from global state.
//!
//! ## Key Components
//!
//! - `Settings`: the resolved, validated run settings
//! - `SettingsBuilder`: builder pattern implementation used by tests and CLI overrides
//! - `SiteDescriptor`: one configured website
//! - `ConfigFile`: the raw shape of `config.yml`, with defaults applied
//!
//! The API key is taken from `GEMINI_API_KEY` when set and falls back to the
//! `gemini_api_key` entry of the file.

mod error;

pub use error::ConfigError;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_MAX_PAGES_PER_SITE: usize = 5;
const DEFAULT_TEXT_LIMIT: usize = 2000;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_CONCURRENT: usize = 5;
const DEFAULT_RETRY_COUNT: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;
const DEFAULT_OUTPUT_DIR: &str = "results";

/// A website to monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    /// Homepage URL of the site
    pub url: String,
}

impl SiteDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A `sites` entry, either `- https://example.com` or `- url: https://example.com`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SiteEntry {
    Bare(String),
    Descriptor(SiteDescriptor),
}

impl From<SiteEntry> for SiteDescriptor {
    fn from(entry: SiteEntry) -> Self {
        match entry {
            SiteEntry::Bare(url) => SiteDescriptor::new(url),
            SiteEntry::Descriptor(site) => site,
        }
    }
}

/// Raw contents of the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub sites: Vec<SiteEntry>,
    pub keywords: Vec<String>,
    pub batch_size: usize,
    pub max_pages_per_site: usize,
    pub text_limit: usize,
    /// Request timeout in seconds
    pub timeout: u64,
    pub max_concurrent: usize,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub gemini_model: String,
    pub gemini_api_key: Option<String>,
    pub requests_per_minute: u32,
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub html_report: bool,
    pub timestamp_results: bool,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            keywords: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_pages_per_site: DEFAULT_MAX_PAGES_PER_SITE,
            text_limit: DEFAULT_TEXT_LIMIT,
            timeout: DEFAULT_TIMEOUT_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_api_key: None,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            user_agent: default_user_agent(),
            html_report: false,
            timestamp_results: false,
        }
    }
}

fn default_user_agent() -> String {
    format!("promo-watch/{}", env!("CARGO_PKG_VERSION"))
}

/// API key wrapper that never prints its value
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Resolved settings for one monitoring run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Sites to check, in output order
    pub sites: Vec<SiteDescriptor>,

    /// Lowercased promotion keywords
    pub keywords: Vec<String>,

    /// Number of sites processed per batch
    pub batch_size: usize,

    /// Maximum candidate pages per site, homepage included
    pub max_pages_per_site: usize,

    /// Maximum characters of page text sent to the model
    pub text_limit: usize,

    /// Timeout for a single HTTP attempt
    pub request_timeout: Duration,

    /// Global cap on in-flight fetch/analyze operations
    pub max_concurrent: usize,

    /// Total fetch attempts per URL
    pub retry_count: u32,

    /// Fixed delay between fetch attempts
    pub retry_delay: Duration,

    /// Gemini model identifier
    pub model_name: String,

    /// Client-side quota for model calls
    pub requests_per_minute: u32,

    /// User agent sent with page requests
    pub user_agent: String,

    /// Directory receiving result files
    pub output_dir: PathBuf,

    /// Whether to also render an HTML report
    pub html_report: bool,

    /// Whether result file names carry a unix timestamp suffix
    pub timestamp_results: bool,

    api_key: Option<ApiKey>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config_file(ConfigFile::default(), None)
    }
}

impl Settings {
    /// Create a new builder
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Load settings from a YAML file, taking the API key from the environment
    /// when present.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let env_key = std::env::var(API_KEY_ENV).ok();
        let settings = Self::from_yaml_str(&yaml, env_key)?;
        settings.require_api_key()?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Parse and validate settings from YAML text.
    ///
    /// `env_api_key` takes precedence over `gemini_api_key` in the document.
    /// The presence of an API key is not checked here; see
    /// [`Settings::require_api_key`].
    pub fn from_yaml_str(yaml: &str, env_api_key: Option<String>) -> Result<Self, ConfigError> {
        let file = if yaml.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str::<ConfigFile>(yaml)?
        };
        let settings = Self::from_config_file(file, env_api_key);
        settings.validate()?;
        Ok(settings)
    }

    /// Resolve a raw config file into settings without validating it
    pub fn from_config_file(file: ConfigFile, env_api_key: Option<String>) -> Self {
        let api_key = env_api_key
            .filter(|key| !key.trim().is_empty())
            .or(file.gemini_api_key.filter(|key| !key.trim().is_empty()))
            .map(|key| ApiKey::new(key.trim()));

        Self {
            sites: file.sites.into_iter().map(SiteDescriptor::from).collect(),
            keywords: normalize_keywords(file.keywords),
            batch_size: file.batch_size,
            max_pages_per_site: file.max_pages_per_site,
            text_limit: file.text_limit,
            request_timeout: Duration::from_secs(file.timeout),
            max_concurrent: file.max_concurrent,
            retry_count: file.retry_count,
            retry_delay: Duration::from_millis(file.retry_delay_ms),
            model_name: file.gemini_model,
            requests_per_minute: file.requests_per_minute,
            user_agent: file.user_agent,
            output_dir: file.output_dir,
            html_report: file.html_report,
            timestamp_results: file.timestamp_results,
            api_key,
        }
    }

    /// Check the limits and the site list
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::NoSites);
        }
        if let Some(site) = self.sites.iter().find(|site| site.url.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "sites",
                reason: format!("empty url in entry {:?}", site),
            });
        }
        let positive: [(&'static str, u64); 7] = [
            ("batch_size", self.batch_size as u64),
            ("max_pages_per_site", self.max_pages_per_site as u64),
            ("text_limit", self.text_limit as u64),
            ("timeout", self.request_timeout.as_millis() as u64),
            ("max_concurrent", self.max_concurrent as u64),
            ("retry_count", u64::from(self.retry_count)),
            ("requests_per_minute", u64::from(self.requests_per_minute)),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::must_be_positive(*field));
        }
        Ok(())
    }

    /// The API key, or `ConfigError::MissingApiKey`
    pub fn require_api_key(&self) -> Result<&ApiKey, ConfigError> {
        self.api_key.as_ref().ok_or(ConfigError::MissingApiKey)
    }
}

fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !normalized.contains(&keyword) {
            normalized.push(keyword);
        }
    }
    normalized
}

/// Builder for Settings
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Create a new builder with default settings and no sites
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
        }
    }

    /// Start from already loaded settings, e.g. to apply CLI overrides
    pub fn from_settings(settings: Settings) -> Self {
        Self { settings }
    }

    /// Set the sites to monitor
    pub fn sites<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.sites = urls.into_iter().map(SiteDescriptor::new).collect();
        self
    }

    /// Set the promotion keywords
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.keywords = normalize_keywords(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.settings.batch_size = batch_size;
        self
    }

    pub fn max_pages_per_site(mut self, max_pages_per_site: usize) -> Self {
        self.settings.max_pages_per_site = max_pages_per_site;
        self
    }

    pub fn text_limit(mut self, text_limit: usize) -> Self {
        self.settings.text_limit = text_limit;
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.settings.request_timeout = request_timeout;
        self
    }

    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.settings.max_concurrent = max_concurrent;
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.settings.retry_count = retry_count;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.settings.retry_delay = retry_delay;
        self
    }

    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.settings.model_name = model_name.into();
        self
    }

    pub fn requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.settings.requests_per_minute = requests_per_minute;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.settings.user_agent = user_agent.into();
        self
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.settings.output_dir = output_dir.into();
        self
    }

    pub fn html_report(mut self, html_report: bool) -> Self {
        self.settings.html_report = html_report;
        self
    }

    pub fn timestamp_results(mut self, timestamp_results: bool) -> Self {
        self.settings.timestamp_results = timestamp_results;
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.settings.api_key = Some(ApiKey::new(api_key));
        self
    }

    /// Build the settings
    pub fn build(self) -> Settings {
        self.settings
    }
}
