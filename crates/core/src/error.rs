//! Error types shared across the research agent crates

use thiserror::Error;

/// Core error type
///
/// The first six variants form the failure taxonomy of the pipeline. Components
/// catch these locally and degrade to a fallback; they are surfaced to callers
/// only through diagnostics, never as a failed request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("Upstream rate limited: {0}")]
    UpstreamRateLimited(String),

    #[error("Malformed upstream response: {0}")]
    UpstreamMalformedResponse(String),

    #[error("No candidates found")]
    NoCandidatesFound,

    #[error("No relevant candidates")]
    NoRelevantCandidates,

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::UpstreamTimeout(_) | Error::UpstreamRateLimited(_))
    }

    /// Short stable label, used as a metrics dimension
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UpstreamTimeout(_) => "upstream_timeout",
            Error::UpstreamRateLimited(_) => "upstream_rate_limited",
            Error::UpstreamMalformedResponse(_) => "upstream_malformed",
            Error::NoCandidatesFound => "no_candidates",
            Error::NoRelevantCandidates => "no_relevant_candidates",
            Error::ConfigurationMissing(_) => "configuration_missing",
            Error::Llm(_) => "llm",
            Error::Search(_) => "search",
            Error::Config(_) => "config",
            Error::Validation(_) => "validation",
            Error::Serialization(_) => "serialization",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;
