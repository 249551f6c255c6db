//! LlmProvider trait definition

use async_trait::async_trait;

use super::{LlmError, LlmRequest, LlmResponse};

/// Stateless LLM provider - each call is independent
///
/// Providers are stateless with respect to the orchestrator: every
/// [`generate`](LlmProvider::generate) call carries the full request.
/// Implementations may pool connections internally.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// The provider's registered name (e.g. "anthropic")
    fn name(&self) -> &str;

    /// Send a single completion request and wait for the full response
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}

impl std::fmt::Debug for dyn LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProvider").field("name", &self.name()).finish()
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::llm::types::TokenUsage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock provider for unit tests, returning canned responses in order
    pub struct MockProvider {
        responses: Vec<Result<LlmResponse, LlmError>>,
        call_count: AtomicUsize,
    }

    impl MockProvider {
        pub fn new(responses: Vec<Result<LlmResponse, LlmError>>) -> Self {
            Self {
                responses,
                call_count: AtomicUsize::new(0),
            }
        }

        /// A provider that always succeeds with the given text
        pub fn text(content: impl Into<String>) -> Self {
            Self::new(vec![Ok(response_with(content))])
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    /// Build a plain successful response around some content
    pub fn response_with(content: impl Into<String>) -> LlmResponse {
        LlmResponse {
            content: content.into(),
            model: "mock-model".to_string(),
            usage: TokenUsage::with_components(100, 50),
            cost_usd: 0.001,
            duration_ms: 5,
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(idx) {
                Some(Ok(resp)) => Ok(resp.clone()),
                Some(Err(e)) => Err(clone_error(e)),
                None => Err(LlmError::InvalidResponse(
                    "No more mock responses".to_string(),
                )),
            }
        }
    }

    // LlmError is not Clone (reqwest::Error isn't); rebuild the variants tests use
    fn clone_error(e: &LlmError) -> LlmError {
        match e {
            LlmError::RateLimited { retry_after } => LlmError::RateLimited {
                retry_after: *retry_after,
            },
            LlmError::ApiError { status, message } => LlmError::ApiError {
                status: *status,
                message: message.clone(),
            },
            LlmError::InvalidResponse(s) => LlmError::InvalidResponse(s.clone()),
            LlmError::Timeout(d) => LlmError::Timeout(*d),
            LlmError::MissingApiKey(s) => LlmError::MissingApiKey(s.clone()),
            other => LlmError::InvalidResponse(other.to_string()),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::llm::types::ChatMessage;
        use std::time::Duration;

        fn request() -> LlmRequest {
            LlmRequest {
                model: "mock-model".to_string(),
                messages: vec![ChatMessage::user("hello")],
                temperature: 0.7,
                max_tokens: 100,
                timeout: Duration::from_secs(5),
            }
        }

        #[tokio::test]
        async fn test_mock_returns_responses_in_order() {
            let provider = MockProvider::new(vec![
                Ok(response_with("one")),
                Ok(response_with("two")),
            ]);

            assert_eq!(provider.generate(request()).await.unwrap().content, "one");
            assert_eq!(provider.generate(request()).await.unwrap().content, "two");
            assert_eq!(provider.call_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_errors_when_exhausted() {
            let provider = MockProvider::new(vec![]);
            assert!(provider.generate(request()).await.is_err());
        }
    }
}
