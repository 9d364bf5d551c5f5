//! Page fetching with bounded retries
//!
//! Every attempt is a plain GET with the configured timeout. Transport errors
//! and non-success statuses are retried after a fixed delay until the attempt
//! budget (`retry_count`) is spent.

mod error;

pub use error::FetchError;

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::Settings;

/// HTTP fetcher shared by the link extractor and the analyzer
#[derive(Debug, Clone)]
pub struct Fetcher {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Timeout for a single attempt
    timeout: Duration,

    /// Total attempts per URL
    attempts: u32,

    /// Delay between attempts
    retry_delay: Duration,
}

impl Fetcher {
    /// Create a fetcher from the run settings
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            timeout: settings.request_timeout,
            attempts: settings.retry_count.max(1),
            retry_delay: settings.retry_delay,
        })
    }

    /// Fetch the body of `url` as text
    ///
    /// Returns the last error once all attempts have failed.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!(attempt, bytes = body.len(), "Fetched page");
                    return Ok(body);
                }
                Err(err) if err.is_retriable() && attempt < self.attempts => {
                    debug!(attempt, error = %err, "Fetch attempt failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(url, attempt, error = %err, "Failed to fetch page");
                    info!(monotonic_counter.fetch_failures = 1_u64);
                    return Err(err);
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url)?;
        let response = self
            .client
            .get(parsed)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
