//! LLM Factory - Provider Abstraction Layer
//!
//! Creates a `LanguageModel` from settings.
//!
//! ## Supported Providers
//! - **OpenAI**: gpt-4o-mini by default
//! - **Azure OpenAI**: deployment + api-version
//! - **Claude**: Anthropic Messages API
//! - **Local**: any OpenAI-compatible server (Ollama, vLLM)
//!
//! A remote provider without a credential does not fail startup: the factory
//! returns an [`UnavailableModel`] and every pipeline stage runs on its fallback.
//!
//! ## Example
//! ```ignore
//! let llm = LlmFactory::create(&settings.llm);
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use research_agent_config::LlmSettings;
use research_agent_core::{Error, GenerateRequest, GenerateResponse, LanguageModel, Result};

use crate::{
    adapter::LanguageModelAdapter,
    backend::{OpenAIBackend, OpenAIConfig},
    claude::{ClaudeBackend, ClaudeConfig},
    LlmError,
};

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    OpenAI,
    AzureOpenAI,
    Claude,
    /// OpenAI-compatible local server
    Local,
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Ok(LlmProvider::OpenAI),
            "azure" | "azure-openai" => Ok(LlmProvider::AzureOpenAI),
            "claude" | "anthropic" => Ok(LlmProvider::Claude),
            "local" | "ollama" | "vllm" => Ok(LlmProvider::Local),
            other => Err(LlmError::Configuration(format!("Unknown LLM provider: {}", other))),
        }
    }
}

/// Unified LLM provider configuration
#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Azure API version (for Azure OpenAI only)
    pub azure_api_version: Option<String>,
}

impl LlmProviderConfig {
    /// Build from settings, resolving key and endpoint defaults
    pub fn from_settings(settings: &LlmSettings) -> std::result::Result<Self, LlmError> {
        Ok(Self {
            provider: settings.provider.parse()?,
            api_key: settings.resolved_api_key(),
            endpoint: settings.resolved_endpoint(),
            model: settings.resolved_model(),
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            azure_api_version: settings.api_version.clone(),
        })
    }

    /// Set model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn require_key(&self, env_hint: &str) -> std::result::Result<String, LlmError> {
        self.api_key
            .clone()
            .ok_or_else(|| LlmError::Configuration(format!("{:?} requires {}", self.provider, env_hint)))
    }
}

/// Factory for creating LLM backends
pub struct LlmFactory;

impl LlmFactory {
    /// Create a LanguageModel, degrading to [`UnavailableModel`] on any
    /// configuration problem
    pub fn create(settings: &LlmSettings) -> Arc<dyn LanguageModel> {
        match LlmProviderConfig::from_settings(settings).and_then(|c| Self::try_create(&c)) {
            Ok(model) => {
                tracing::info!(
                    provider = %settings.provider,
                    model = model.model_name(),
                    "Completion service configured"
                );
                model
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    provider = %settings.provider,
                    "Completion service unavailable, pipeline will use heuristic fallbacks"
                );
                Arc::new(UnavailableModel::new(e.to_string()))
            }
        }
    }

    /// Create a LanguageModel from config (implements core trait)
    pub fn try_create(config: &LlmProviderConfig) -> std::result::Result<Arc<dyn LanguageModel>, LlmError> {
        match config.provider {
            LlmProvider::OpenAI => {
                let api_key = config.require_key("OPENAI_API_KEY")?;
                let openai = OpenAIConfig {
                    endpoint: config.endpoint.clone(),
                    temperature: config.temperature,
                    timeout: config.timeout,
                    max_retries: config.max_retries,
                    ..OpenAIConfig::openai(api_key, config.model.clone())
                };
                let backend = OpenAIBackend::new(openai)?;
                Ok(Arc::new(LanguageModelAdapter::new(backend, config.timeout)))
            }
            LlmProvider::AzureOpenAI => {
                let api_key = config.require_key("AZURE_OPENAI_API_KEY")?;
                let api_version = config.azure_api_version.clone().ok_or_else(|| {
                    LlmError::Configuration("Azure OpenAI requires api_version".to_string())
                })?;
                let azure = OpenAIConfig {
                    temperature: config.temperature,
                    timeout: config.timeout,
                    max_retries: config.max_retries,
                    ..OpenAIConfig::azure(
                        config.endpoint.clone(),
                        api_key,
                        config.model.clone(),
                        api_version,
                    )
                };
                let backend = OpenAIBackend::new(azure)?;
                Ok(Arc::new(LanguageModelAdapter::new(backend, config.timeout)))
            }
            LlmProvider::Claude => {
                let api_key = config.require_key("ANTHROPIC_API_KEY")?;
                let claude = ClaudeConfig {
                    max_retries: config.max_retries,
                    ..ClaudeConfig::new(api_key)
                        .with_model(&config.model)
                        .with_temperature(config.temperature)
                        .with_endpoint(config.endpoint.clone())
                        .with_timeout(config.timeout)
                };
                let backend = ClaudeBackend::new(claude)?;
                Ok(Arc::new(LanguageModelAdapter::new(backend, config.timeout)))
            }
            LlmProvider::Local => {
                let local = OpenAIConfig {
                    temperature: config.temperature,
                    timeout: config.timeout,
                    max_retries: config.max_retries,
                    ..OpenAIConfig::local(config.endpoint.clone(), config.model.clone())
                };
                let backend = OpenAIBackend::new(local)?;
                Ok(Arc::new(LanguageModelAdapter::new(backend, config.timeout)))
            }
        }
    }
}

/// Language model stand-in used when no completion service is configured
///
/// Every call fails immediately with `Error::ConfigurationMissing`.
pub struct UnavailableModel {
    reason: String,
}

impl UnavailableModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for UnavailableModel {
    async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse> {
        Err(Error::ConfigurationMissing(self.reason.clone()))
    }

    async fn is_available(&self) -> bool {
        false
    }

    fn model_name(&self) -> &str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claude::ClaudeModel;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("openai".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAI);
        assert_eq!("Anthropic".parse::<LlmProvider>().unwrap(), LlmProvider::Claude);
        assert_eq!("ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Local);
        assert_eq!("azure".parse::<LlmProvider>().unwrap(), LlmProvider::AzureOpenAI);
        assert!("bard".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_create_openai_with_key() {
        let settings = LlmSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let config = LlmProviderConfig::from_settings(&settings).unwrap();
        let llm = LlmFactory::try_create(&config).unwrap();
        assert_eq!(llm.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_claude_uses_its_own_default_model() {
        let settings = LlmSettings {
            provider: "claude".to_string(),
            api_key: Some("sk-ant-test".to_string()),
            ..Default::default()
        };
        let llm = LlmFactory::create(&settings);
        assert_eq!(llm.model_name(), ClaudeModel::Haiku3_5.model_id());
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let config = LlmProviderConfig {
            provider: LlmProvider::Claude,
            api_key: None,
            endpoint: "https://api.anthropic.com".to_string(),
            model: "haiku".to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(5),
            max_retries: 0,
            azure_api_version: None,
        };
        assert!(matches!(
            LlmFactory::try_create(&config),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn test_local_needs_no_key() {
        let settings = LlmSettings {
            provider: "local".to_string(),
            model: Some("llama3".to_string()),
            ..Default::default()
        };
        let llm = LlmFactory::create(&settings);
        assert_eq!(llm.model_name(), "llama3");
    }

    #[tokio::test]
    async fn test_unknown_provider_degrades_to_unavailable() {
        let settings = LlmSettings {
            provider: "bard".to_string(),
            ..Default::default()
        };
        let llm = LlmFactory::create(&settings);
        assert_eq!(llm.model_name(), "unavailable");
        assert!(!llm.is_available().await);

        let result = llm.generate(GenerateRequest::from_user("hi")).await;
        assert!(matches!(result, Err(Error::ConfigurationMissing(_))));
    }
}
