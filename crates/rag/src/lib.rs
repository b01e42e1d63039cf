//! Research retrieval and synthesis stages
//!
//! Stages, in pipeline order:
//! - [`QueryExpander`]: question to search queries, heuristic fallback
//! - [`FanoutRetriever`]: concurrent search, dedup and cap
//! - [`RelevanceScorer`]: batched rubric scoring, lexical fallback
//! - [`Ranker`]: combined score, threshold with one relaxation step
//! - [`Synthesizer`]: evidence-graded answer, deterministic fallback
//! - [`PaperAnalyzer`]: single-paper breakdown
//!
//! No stage returns an error. Every upstream failure degrades to a typed
//! "no signal" result and is logged at `warn`.

pub mod analysis;
pub mod lexical;
pub mod query_expansion;
pub mod ranker;
pub mod retriever;
pub mod scorer;
pub mod synthesis;

pub use analysis::{AnalyzerConfig, PaperAnalyzer};
pub use query_expansion::{QueryExpander, QueryExpansionConfig};
pub use ranker::{combined_score, Ranker, RankerConfig, Ranking};
pub use retriever::{dedup_candidates, FanoutRetriever, RetrieverConfig};
pub use scorer::{RelevanceScorer, ScorerConfig};
pub use synthesis::{Synthesis, SynthesisConfig, SynthesisSource, Synthesizer};

/// First `max` characters of `text`, with an ellipsis when cut
pub(crate) fn excerpt(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
