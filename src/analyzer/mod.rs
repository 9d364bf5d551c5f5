//! # Page Analyzer Module
//!
//! Judges a single page for promotional content. The page is fetched, reduced
//! to a bounded snippet of visible text, wrapped in a prompt and sent to the
//! completion model. The model's reply is parsed into a [`Verdict`].
//!
//! Analysis never fails outward: fetch failures and model errors are folded
//! into the returned [`PageResult`] through its [`PageStatus`].

mod prompt;
mod verdict;

pub use prompt::{PREAMBLE, build_prompt};
pub use verdict::{FALLBACK_SUMMARY_CHARS, Verdict, heuristic_verdict, parse_structured, parse_verdict};

use std::sync::Arc;

use rig::completion::{CompletionError, CompletionModel};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::extractor::visible_text;
use crate::fetcher::Fetcher;
use crate::model::response_text;

/// Outcome category of a page analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// The model produced a verdict
    Ok,
    /// The page could not be downloaded
    FetchFailed,
    /// The model call failed
    Error,
}

/// Result of analyzing one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub has_promotion: bool,
    pub promotion_summary: String,
    pub status: PageStatus,
    /// Reason for a `fetch_failed` or `error` status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    pub fn analyzed(url: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            url: url.into(),
            has_promotion: verdict.has_promotion,
            promotion_summary: verdict.promotion_summary,
            status: PageStatus::Ok,
            error: None,
        }
    }

    pub fn fetch_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::unanalyzed(url, PageStatus::FetchFailed, reason)
    }

    pub fn failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::unanalyzed(url, PageStatus::Error, reason)
    }

    fn unanalyzed(url: impl Into<String>, status: PageStatus, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            has_promotion: false,
            promotion_summary: String::new(),
            status,
            error: Some(reason.into()),
        }
    }
}

/// Error type for analysis failures
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The completion call failed
    #[error("model call failed: {0}")]
    Completion(#[from] CompletionError),

    /// The analysis task panicked or was cancelled
    #[error("analysis task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for AnalyzeError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Analyzes pages with a completion model
#[derive(Clone)]
pub struct Analyzer<M: CompletionModel> {
    model: M,
    fetcher: Fetcher,
    settings: Arc<Settings>,
}

impl<M: CompletionModel> Analyzer<M> {
    pub fn new(model: M, fetcher: Fetcher, settings: Arc<Settings>) -> Self {
        Self {
            model,
            fetcher,
            settings,
        }
    }

    /// Fetch and analyze `url`
    #[instrument(skip(self), level = "debug")]
    pub async fn analyze_page(&self, url: &str) -> PageResult {
        match self.fetcher.fetch(url).await {
            Ok(html) => self.analyze_html(url, &html).await,
            Err(err) => PageResult::fetch_failed(url, err.to_string()),
        }
    }

    /// Analyze an already fetched page
    #[instrument(skip(self, html), level = "debug")]
    pub async fn analyze_html(&self, url: &str, html: &str) -> PageResult {
        let snippet = visible_text(html, self.settings.text_limit);
        debug!(chars = snippet.chars().count(), "Extracted page text");

        match self.complete(&build_prompt(url, &snippet)).await {
            Ok(raw) => {
                let verdict = parse_verdict(&raw, &self.settings.keywords);
                info!(monotonic_counter.pages_analyzed = 1_u64);
                debug!(has_promotion = verdict.has_promotion, "Page analyzed");
                PageResult::analyzed(url, verdict)
            }
            Err(err) => {
                warn!(url, error = %err, "Page analysis failed");
                PageResult::failed(url, err.to_string())
            }
        }
    }

    /// Send one prompt to the model and return the text of its reply
    pub async fn complete(&self, prompt: &str) -> Result<String, AnalyzeError> {
        let request = self
            .model
            .completion_request(prompt.to_string())
            .preamble(PREAMBLE.to_string())
            .build();
        let response = self.model.completion(request).await?;
        Ok(response_text(&response.choice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MockCompletionModel;
    use mockito::Server;
    use std::time::Duration;

    fn analyzer(model: MockCompletionModel) -> Analyzer<MockCompletionModel> {
        let settings = Arc::new(
            Settings::builder()
                .keywords(["sale"])
                .retry_count(1)
                .retry_delay(Duration::ZERO)
                .build(),
        );
        let fetcher = Fetcher::new(&settings).unwrap();
        Analyzer::new(model, fetcher, settings)
    }

    #[tokio::test]
    async fn test_analyze_html_structured_reply() {
        let model = MockCompletionModel::new();
        model
            .set_text_response(r#"{"has_promotion": true, "promotion_summary": "30% off boots"}"#)
            .await;

        let result = analyzer(model)
            .analyze_html("https://shop.example.com/", "<p>Boots on sale</p>")
            .await;

        assert_eq!(result.status, PageStatus::Ok);
        assert!(result.has_promotion);
        assert_eq!(result.promotion_summary, "30% off boots");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_analyze_html_fallback_reply() {
        let model = MockCompletionModel::new();
        model.set_text_response("There is a summer SALE running.").await;

        let result = analyzer(model)
            .analyze_html("https://shop.example.com/", "<p>Summer</p>")
            .await;

        assert_eq!(result.status, PageStatus::Ok);
        assert!(result.has_promotion);
        assert_eq!(result.promotion_summary, "There is a summer SALE running.");
    }

    #[tokio::test]
    async fn test_model_error_is_captured() {
        let model = MockCompletionModel::new();
        model.set_error("quota exceeded").await;

        let result = analyzer(model)
            .analyze_html("https://shop.example.com/", "<p>Sale</p>")
            .await;

        assert_eq!(result.status, PageStatus::Error);
        assert!(!result.has_promotion);
        assert!(result.error.unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_analyze_page_fetch_failure_skips_model() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone")
            .with_status(500)
            .create_async()
            .await;

        let model = MockCompletionModel::new();
        let result = analyzer(model.clone())
            .analyze_page(&format!("{}/gone", server.url()))
            .await;

        assert_eq!(result.status, PageStatus::FetchFailed);
        assert!(!result.has_promotion);
        assert_eq!(result.promotion_summary, "");
        assert!(result.error.is_some());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_page_success() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/deals")
            .with_status(200)
            .with_body("<html><body><h1>Deals</h1></body></html>")
            .create_async()
            .await;

        let model = MockCompletionModel::new();
        model
            .set_text_response(r#"{"has_promotion": false, "promotion_summary": ""}"#)
            .await;
        let result = analyzer(model.clone())
            .analyze_page(&format!("{}/deals", server.url()))
            .await;

        assert_eq!(result.status, PageStatus::Ok);
        assert!(!result.has_promotion);
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn test_page_status_serialization() {
        let json = serde_json::to_string(&PageStatus::FetchFailed).unwrap();
        assert_eq!(json, "\"fetch_failed\"");
    }
}
