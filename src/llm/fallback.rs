//! Fallback backend: wraps any [`CompletionBackend`] and substitutes a canned
//! reply when the model answers with no content.
//!
//! Only [`BackendError::EmptyResponse`] is absorbed. Rate limits and transport
//! failures still propagate so the engine can retry or report them.

use async_trait::async_trait;

use crate::llm::backend::{BackendError, CompletionBackend, CompletionRequest};

/// Reply used in place of an empty completion.
pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, I couldn't process that.";

// ---------------------------------------------------------------------------
// FallbackBackend
// ---------------------------------------------------------------------------

/// A transparent wrapper that turns empty completions into
/// [`EMPTY_REPLY_FALLBACK`].
///
/// # Example
/// ```rust
/// use medication_assistant::config::LlmConfig;
/// use medication_assistant::llm::{ApiBackend, FallbackBackend};
///
/// let inner = ApiBackend::from_config(&LlmConfig::default());
/// let backend = FallbackBackend::new(inner);
/// ```
pub struct FallbackBackend<B: CompletionBackend> {
    inner: B,
}

impl<B: CompletionBackend> FallbackBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<B: CompletionBackend> CompletionBackend for FallbackBackend<B> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        match self.inner.complete(request).await {
            Err(BackendError::EmptyResponse) => {
                log::warn!("completion had no content; using fallback reply");
                Ok(EMPTY_REPLY_FALLBACK.to_string())
            }
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<String, BackendError>);

    #[async_trait]
    impl CompletionBackend for Fixed {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, BackendError> {
            self.0.clone()
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: String::new(),
            messages: Vec::new(),
            temperature: 0.7,
            max_tokens: 250,
        }
    }

    #[tokio::test]
    async fn passes_through_success() {
        let backend = FallbackBackend::new(Fixed(Ok("What dosage?".into())));
        assert_eq!(backend.complete(&request()).await.unwrap(), "What dosage?");
    }

    #[tokio::test]
    async fn empty_response_becomes_fallback_reply() {
        let backend = FallbackBackend::new(Fixed(Err(BackendError::EmptyResponse)));
        assert_eq!(backend.complete(&request()).await.unwrap(), EMPTY_REPLY_FALLBACK);
    }

    #[tokio::test]
    async fn rate_limit_still_propagates() {
        let backend = FallbackBackend::new(Fixed(Err(BackendError::RateLimited("429".into()))));
        let err = backend.complete(&request()).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn timeout_still_propagates() {
        let backend = FallbackBackend::new(Fixed(Err(BackendError::Timeout)));
        assert!(matches!(
            backend.complete(&request()).await,
            Err(BackendError::Timeout)
        ));
    }

    #[test]
    fn fallback_is_object_safe() {
        let _: Box<dyn CompletionBackend> = Box::new(FallbackBackend::new(Fixed(Ok("ok".into()))));
    }
}
