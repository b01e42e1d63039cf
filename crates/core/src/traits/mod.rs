//! Collaborator traits for the research pipeline
//!
//! Every external dependency sits behind one of these traits so backends can be
//! swapped by configuration and replaced by mocks in tests.
//!
//! ```text
//! LanguageModel:  prompt -> text | failure
//! PaperSearch:    query  -> candidate papers | failure
//! CacheStore:     key    -> cached research result (TTL bounded)
//! RateLimitStore: client -> admitted?
//! ```

mod llm;
mod search;
mod store;

pub use llm::LanguageModel;
pub use search::PaperSearch;
pub use store::{CacheStore, RateLimitStore};
