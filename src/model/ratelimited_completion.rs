use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use rig::completion::{self, CompletionError, CompletionModel, CompletionRequest, CompletionResponse};
use tracing::{Instrument, debug_span, info_span};

/// Raw provider response, kept opaque behind the limiter
pub struct RateLimitResponse<T> {
    #[allow(dead_code)]
    response: T,
}

/// Completion model that waits for a `governor` quota slot before every call
#[derive(Clone)]
pub struct RateLimitedCompletionModel<M: CompletionModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedCompletionModel<M>
where
    M: CompletionModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }
}

impl<M: CompletionModel> CompletionModel for RateLimitedCompletionModel<M> {
    type Response = RateLimitResponse<M::Response>;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<completion::CompletionResponse<Self::Response>, CompletionError> {
        self.limiter.until_ready().instrument(debug_span!("limiter")).await;
        let response = self
            .model
            .completion(completion_request)
            .instrument(info_span!("completion"))
            .await;
        response.map(|response| CompletionResponse {
            choice: response.choice,
            raw_response: RateLimitResponse {
                response: response.raw_response,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockCompletionModel, response_text};
    use governor::{Quota, RateLimiter};
    use std::num::NonZeroU32;

    #[tokio::test]
    async fn test_passes_through_choice() {
        let mock = MockCompletionModel::new();
        mock.set_text_response("{\"has_promotion\": false}").await;
        let limiter = RateLimiter::direct(Quota::per_minute(NonZeroU32::new(600).unwrap()));
        let model = RateLimitedCompletionModel::new(mock, limiter);

        let response = model
            .completion_request("hello".to_string())
            .send()
            .await
            .unwrap();
        assert_eq!(response_text(&response.choice), "{\"has_promotion\": false}");
    }
}
