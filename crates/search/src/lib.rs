//! Bibliographic search adapters
//!
//! Implements the core `PaperSearch` trait against external catalogues.
//! Currently Semantic Scholar's Graph API.

pub mod semantic_scholar;

pub use semantic_scholar::{SemanticScholarClient, SemanticScholarConfig};

use thiserror::Error;

/// Search adapter errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    #[error("Timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Timeout
        } else if err.is_decode() {
            SearchError::Parse(err.to_string())
        } else {
            SearchError::Network(err.to_string())
        }
    }
}

impl From<SearchError> for research_agent_core::Error {
    fn from(err: SearchError) -> Self {
        use research_agent_core::Error;
        match err {
            SearchError::RateLimitExceeded { .. } => Error::UpstreamRateLimited(err.to_string()),
            SearchError::Timeout => Error::UpstreamTimeout("search service".to_string()),
            SearchError::Parse(msg) => Error::UpstreamMalformedResponse(msg),
            SearchError::Configuration(msg) => Error::Config(msg),
            other => Error::Search(other.to_string()),
        }
    }
}
