//! Language Model adapter
//!
//! Bridges the LlmBackend trait to the core LanguageModel trait and enforces the
//! per-call timeout, so every completion either returns within its budget or
//! fails with `Error::UpstreamTimeout`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use research_agent_core::{
    Error, GenerateRequest, GenerateResponse, LanguageModel, Result, TokenUsage,
};

use crate::backend::{GenerationOptions, LlmBackend};

/// Output budget used when a request does not set one
const DEFAULT_MAX_TOKENS: usize = 512;

/// Adapter that wraps an LlmBackend to implement the core LanguageModel trait.
///
/// # Example
///
/// ```ignore
/// let backend = OpenAIBackend::new(OpenAIConfig::openai(key, "gpt-4o-mini"))?;
/// let llm: Arc<dyn LanguageModel> = Arc::new(
///     LanguageModelAdapter::new(backend, Duration::from_secs(60))
/// );
/// ```
pub struct LanguageModelAdapter {
    backend: Arc<dyn LlmBackend>,
    model_name: String,
    timeout: Duration,
}

impl LanguageModelAdapter {
    /// Create a new adapter wrapping an LlmBackend
    pub fn new<B: LlmBackend + 'static>(backend: B, timeout: Duration) -> Self {
        Self::from_arc(Arc::new(backend), timeout)
    }

    /// Create from an Arc'd backend
    pub fn from_arc(backend: Arc<dyn LlmBackend>, timeout: Duration) -> Self {
        let model_name = backend.model_name().to_string();
        Self {
            backend,
            model_name,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl LanguageModel for LanguageModelAdapter {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let options = GenerationOptions {
            max_tokens: request
                .max_tokens
                .map(|t| t as usize)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
        };

        let call = self.backend.generate(&request.messages, options);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => Ok(GenerateResponse {
                text: result.text,
                finish_reason: result.finish_reason,
                usage: Some(TokenUsage::new(
                    result.prompt_tokens as u32,
                    result.tokens as u32,
                )),
            }),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Error::UpstreamTimeout(format!(
                "{} did not answer within {:?}",
                self.model_name, self.timeout
            ))),
        }
    }

    async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GenerationResult;
    use crate::LlmError;
    use research_agent_core::{FinishReason, Message};

    struct MockBackend {
        response: &'static str,
        delay: Duration,
        fail_with: Option<fn() -> LlmError>,
    }

    impl MockBackend {
        fn ok(response: &'static str) -> Self {
            Self {
                response,
                delay: Duration::ZERO,
                fail_with: None,
            }
        }
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        async fn generate(
            &self,
            messages: &[Message],
            options: GenerationOptions,
        ) -> std::result::Result<GenerationResult, LlmError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(make_err) = self.fail_with {
                return Err(make_err());
            }
            Ok(GenerationResult {
                text: format!("{} ({} msgs, {} max)", self.response, messages.len(), options.max_tokens),
                prompt_tokens: 7,
                tokens: 3,
                total_time_ms: 1,
                finish_reason: FinishReason::Stop,
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "mock-model"
        }
    }

    #[tokio::test]
    async fn test_adapter_generate() {
        let adapter = LanguageModelAdapter::new(MockBackend::ok("Hello"), Duration::from_secs(5));

        let request = GenerateRequest::new("System").with_user_message("Hi").with_max_tokens(42);
        let response = adapter.generate(request).await.unwrap();

        assert_eq!(response.text, "Hello (2 msgs, 42 max)");
        assert_eq!(response.usage.unwrap().total_tokens, 10);
        assert_eq!(adapter.model_name(), "mock-model");
    }

    #[tokio::test]
    async fn test_adapter_default_budget() {
        let adapter = LanguageModelAdapter::new(MockBackend::ok("x"), Duration::from_secs(5));
        let response = adapter.generate(GenerateRequest::from_user("Hi")).await.unwrap();
        assert!(response.text.ends_with("512 max)"));
    }

    #[tokio::test]
    async fn test_adapter_timeout() {
        let backend = MockBackend {
            response: "late",
            delay: Duration::from_millis(200),
            fail_with: None,
        };
        let adapter = LanguageModelAdapter::new(backend, Duration::from_millis(20));

        let result = adapter.generate(GenerateRequest::from_user("Hi")).await;
        assert!(matches!(result, Err(Error::UpstreamTimeout(_))));
    }

    #[tokio::test]
    async fn test_adapter_error_mapping() {
        let backend = MockBackend {
            response: "",
            delay: Duration::ZERO,
            fail_with: Some(|| LlmError::RateLimited("slow down".into())),
        };
        let adapter = LanguageModelAdapter::new(backend, Duration::from_secs(1));

        let result = adapter.generate(GenerateRequest::from_user("Hi")).await;
        assert!(matches!(result, Err(Error::UpstreamRateLimited(_))));
    }
}
