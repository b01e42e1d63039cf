//! Completion service integration
//!
//! Features:
//! - Multiple backend support (OpenAI, Azure OpenAI, Claude, local OpenAI-compatible)
//! - Retry with doubling backoff for transient failures
//! - Per-call timeout enforced by the adapter
//! - Unavailable stand-in when no credential is configured

pub mod adapter;
pub mod backend;
pub mod claude;
pub mod factory;

pub use adapter::LanguageModelAdapter;
pub use backend::{GenerationOptions, GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use claude::{ClaudeBackend, ClaudeConfig, ClaudeModel};
pub use factory::{LlmFactory, LlmProvider, LlmProviderConfig, UnavailableModel};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for research_agent_core::Error {
    fn from(err: LlmError) -> Self {
        use research_agent_core::Error;
        match err {
            LlmError::Timeout => Error::UpstreamTimeout("completion service".to_string()),
            LlmError::RateLimited(msg) => Error::UpstreamRateLimited(msg),
            LlmError::InvalidResponse(msg) => Error::UpstreamMalformedResponse(msg),
            LlmError::Configuration(msg) => Error::ConfigurationMissing(msg),
            other => Error::Llm(other.to_string()),
        }
    }
}
