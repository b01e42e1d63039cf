//! Configuration management for the research agent
//!
//! Supports loading configuration from:
//! - TOML/YAML/JSON files under `config/`
//! - Environment variables (RESEARCH_AGENT__ prefix)
//!
//! Every pipeline threshold (relevance cut-offs, batch sizes, caps, TTLs) is a
//! setting with a default from [`constants`].

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from_file, CacheSettings, LlmSettings, ObservabilityConfig,
    PipelineSettings, RateLimitConfig, SearchSettings, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for research_agent_core::Error {
    fn from(err: ConfigError) -> Self {
        research_agent_core::Error::Config(err.to_string())
    }
}
