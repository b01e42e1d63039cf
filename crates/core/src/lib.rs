//! Core traits and types for the research agent
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits (language model, paper search, cache, rate limiter)
//! - Research domain records (queries, papers, scores, synthesis)
//! - LLM request/response types
//! - The decode-or-fallback step for model replies
//! - Error types

pub mod decode;
pub mod error;
pub mod llm_types;
pub mod research;
pub mod traits;

pub use decode::{decode_json, extract_json_object, Decoded};
pub use error::{Error, Result};
pub use llm_types::{
    FinishReason, GenerateRequest, GenerateResponse, Message, Role, TokenUsage,
};
pub use research::{
    normalize_question, AnalysisSource, CacheEntry, CandidatePaper, Category, DisplayPaper,
    EvidenceStrength, ExplanationLevel, KeyInsight, PaperAnalysis, QueryPlan, RankedPaper,
    ResearchQuery, ResearchResult, ScoreSource, ScoredPaper, SynthesisResult,
};

pub use traits::{CacheStore, LanguageModel, PaperSearch, RateLimitStore};
