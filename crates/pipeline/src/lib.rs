//! Research pipeline
//!
//! Wires the retrieval and synthesis stages behind the per-client rate
//! limiter and the result cache:
//!
//! ```text
//! admit -> cache lookup -> expand -> retrieve -> score -> rank -> synthesize -> cache store
//! ```

pub mod cache;
pub mod category;
pub mod metrics;
pub mod orchestrator;
pub mod question;
pub mod rate_limit;

pub use cache::InMemoryCache;
pub use category::detect_category;
pub use orchestrator::ResearchPipeline;
pub use question::{cache_key, question_hash};
pub use rate_limit::SlidingWindowLimiter;

use thiserror::Error;

/// Errors visible to callers of the pipeline
///
/// Upstream failures never appear here; they degrade inside the stages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<research_agent_core::Error> for PipelineError {
    fn from(err: research_agent_core::Error) -> Self {
        match err {
            research_agent_core::Error::Validation(msg) => PipelineError::InvalidRequest(msg),
            other => PipelineError::InvalidRequest(other.to_string()),
        }
    }
}
