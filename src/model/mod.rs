//! # LLM Client Module
//!
//! Builds the completion model used by the analyzer, with client-side rate
//! limiting so a large site list cannot exhaust the API quota.
//!
//! ## Key Components
//!
//! - `RateLimitedCompletionModel`: wraps any completion model in a `governor` limiter
//! - `GeminiCompletionModel`: the rate-limited Gemini model used in production
//! - `MockCompletionModel`: scripted model for tests
//! - `response_text`: flattens a completion choice into plain text

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use rig::{completion::AssistantContent, one_or_many::OneOrMany, providers::gemini};

use crate::config::{ConfigError, Settings};

pub mod mock_model;
pub mod ratelimited_completion;

pub use mock_model::MockCompletionModel;
pub use ratelimited_completion::RateLimitedCompletionModel;

/// Rate-limited Gemini completion model
pub type GeminiCompletionModel = RateLimitedCompletionModel<gemini::completion::CompletionModel>;

/// Build the Gemini model named in the settings
///
/// Fails with `ConfigError::MissingApiKey` when no key was configured.
pub fn gemini_from_settings(settings: &Settings) -> Result<GeminiCompletionModel, ConfigError> {
    let api_key = settings.require_api_key()?;
    let gemini_client = gemini::Client::new(api_key.expose());
    Ok(new_gemini(
        &gemini_client,
        &settings.model_name,
        settings.requests_per_minute,
    ))
}

/// Wrap a Gemini completion model in a per-minute quota
pub fn new_gemini(
    gemini_client: &gemini::Client,
    model_name: &str,
    requests_per_minute: u32,
) -> GeminiCompletionModel {
    let quota = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_minute(quota));
    RateLimitedCompletionModel::new(gemini_client.completion_model(model_name), limiter)
}

/// Concatenate the text parts of a completion choice
pub fn response_text(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
