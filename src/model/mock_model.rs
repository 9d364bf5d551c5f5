//! # Mock Completion Model for Testing
//!
//! Provides a `MockCompletionModel` that implements the `CompletionModel` trait
//! so the analyzer and monitor can be exercised without API calls. It returns
//! a predefined response or error, can simulate latency, and records how many
//! completions were in flight at the same time.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    one_or_many::OneOrMany,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error(String),
}

/// A mock completion model for testing purposes.
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    reply: Arc<Mutex<Option<MockReply>>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockCompletionModel {
    /// Creates a new mock model that answers with an empty text response.
    pub fn new() -> Self {
        Self {
            reply: Arc::new(Mutex::new(None)),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Hold every completion for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer every completion with `text`.
    pub async fn set_text_response(&self, text: &str) {
        *self.reply.lock().await = Some(MockReply::Text(text.to_string()));
    }

    /// Fail every completion with a provider error.
    pub async fn set_error(&self, message: &str) {
        *self.reply.lock().await = Some(MockReply::Error(message.to_string()));
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of completions observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.reply.lock().await.clone();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Some(MockReply::Text(text)) => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text(text.clone())),
                raw_response: text,
            }),
            Some(MockReply::Error(message)) => Err(CompletionError::ProviderError(message)),
            None => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text("")),
                raw_response: "".to_string(),
            }),
        }
    }
}
