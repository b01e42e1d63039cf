//! Research domain types
//!
//! Records that flow through one pipeline invocation:
//!
//! ```text
//! ResearchQuery -> QueryPlan -> CandidatePaper -> ScoredPaper -> RankedPaper
//!                                                                  |
//!                                        SynthesisResult <---------+
//! ```
//!
//! Everything except `ResearchResult` (cached) is created per request and dropped
//! at response time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Requested depth of the explanation
///
/// Drives prompt phrasing only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationLevel {
    Simple,
    #[default]
    Medium,
    Academic,
}

/// Instruction text per level
const LEVEL_INSTRUCTIONS: [(ExplanationLevel, &str); 3] = [
    (
        ExplanationLevel::Simple,
        "Explain very simply, as to a curious teenager. Avoid technical terms entirely.",
    ),
    (
        ExplanationLevel::Medium,
        "Explain at a general-audience level. Introduce technical terms only with a short definition.",
    ),
    (
        ExplanationLevel::Academic,
        "Explain at an academic level with precise technical terminology, study designs and effect sizes.",
    ),
];

impl ExplanationLevel {
    pub const ALL: [ExplanationLevel; 3] = [Self::Simple, Self::Medium, Self::Academic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Academic => "academic",
        }
    }

    /// Prompt instruction for this level
    pub fn instruction(&self) -> &'static str {
        LEVEL_INSTRUCTIONS
            .iter()
            .find(|(level, _)| level == self)
            .map(|(_, text)| *text)
            .unwrap_or(LEVEL_INSTRUCTIONS[1].1)
    }
}

impl fmt::Display for ExplanationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExplanationLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "medium" => Ok(Self::Medium),
            "academic" => Ok(Self::Academic),
            other => Err(Error::Validation(format!(
                "unknown explanation level '{}', expected simple, medium or academic",
                other
            ))),
        }
    }
}

/// Trim, lowercase and collapse inner whitespace
pub fn normalize_question(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A validated research question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    raw: String,
    text: String,
    normalized: String,
    level: ExplanationLevel,
}

impl ResearchQuery {
    /// Validate and build a query
    ///
    /// Length bounds are counted in characters after trimming.
    pub fn new(
        raw: impl Into<String>,
        level: ExplanationLevel,
        min_chars: usize,
        max_chars: usize,
    ) -> Result<Self> {
        let raw = raw.into();
        let text = raw.trim().to_string();
        let len = text.chars().count();

        if len < min_chars {
            return Err(Error::Validation(format!(
                "question must be at least {} characters",
                min_chars
            )));
        }
        if len > max_chars {
            return Err(Error::Validation(format!(
                "question must be at most {} characters",
                max_chars
            )));
        }

        let normalized = normalize_question(&text);
        Ok(Self {
            raw,
            text,
            normalized,
            level,
        })
    }

    /// Original input
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Trimmed text, used in prompts and responses
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Normalized text, used for cache identity
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn level(&self) -> ExplanationLevel {
        self.level
    }
}

/// Search plan produced by the query expander
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Search-engine queries, in priority order
    pub queries: Vec<String>,
    /// Scientific terms extracted from the question
    #[serde(default)]
    pub terms: Vec<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    /// True when produced by the heuristic rather than the language model
    #[serde(default)]
    pub heuristic: bool,
}

/// A bibliographic record from the search service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidatePaper {
    /// External identifier; may be absent
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub citation_count: u32,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
}

impl CandidatePaper {
    pub fn new(id: Option<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_citations(mut self, count: u32) -> Self {
        self.citation_count = count;
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Deduplication key: identifier when present, else lowercased title
    pub fn identity_key(&self) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => format!("id:{}", id),
            _ => format!("title:{}", self.title.trim().to_lowercase()),
        }
    }

    /// Abstract text, empty when missing
    pub fn abstract_str(&self) -> &str {
        self.abstract_text.as_deref().unwrap_or("")
    }

    /// Authors as display text: first three names, then "et al."
    pub fn author_line(&self) -> String {
        let mut line = self
            .authors
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if self.authors.len() > 3 {
            line.push_str(" et al.");
        }
        line
    }
}

/// Where a relevance score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Language model rubric score
    Delegated,
    /// Weighted word overlap after a failed delegated call
    LexicalFallback,
    /// Fixed low score for a missing or too-short abstract
    Fixed,
}

/// Candidate with a relevance estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPaper {
    #[serde(flatten)]
    pub paper: CandidatePaper,
    /// Always within 0..=100
    pub relevance_score: u8,
    pub relevance_reason: String,
    pub score_source: ScoreSource,
}

impl ScoredPaper {
    /// Build a scored paper, clamping the score into 0..=100
    pub fn new(
        paper: CandidatePaper,
        score: f64,
        reason: impl Into<String>,
        source: ScoreSource,
    ) -> Self {
        let clamped = if score.is_finite() {
            score.round().clamp(0.0, 100.0) as u8
        } else {
            0
        };
        Self {
            paper,
            relevance_score: clamped,
            relevance_reason: reason.into(),
            score_source: source,
        }
    }
}

/// Scored paper with its ordering signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPaper {
    #[serde(flatten)]
    pub scored: ScoredPaper,
    pub combined_score: f64,
}

impl RankedPaper {
    pub fn paper(&self) -> &CandidatePaper {
        &self.scored.paper
    }

    pub fn relevance_score(&self) -> u8 {
        self.scored.relevance_score
    }
}

/// Coarse grade of how well the sources support an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStrength {
    Strong,
    Moderate,
    Limited,
    #[default]
    Insufficient,
}

impl EvidenceStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Limited => "limited",
            Self::Insufficient => "insufficient",
        }
    }

    /// Lenient parse of model output; anything unknown is insufficient
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "strong" => Self::Strong,
            "moderate" => Self::Moderate,
            "limited" => Self::Limited,
            _ => Self::Insufficient,
        }
    }
}

impl fmt::Display for EvidenceStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final structured answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub summary: String,
    pub evidence_strength: EvidenceStrength,
    pub evidence_description: String,
    pub key_points: Vec<String>,
    pub limitations: String,
    pub related_questions: Vec<String>,
}

impl SynthesisResult {
    /// Well-formed result carrying no evidence
    pub fn insufficient(summary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            evidence_strength: EvidenceStrength::Insufficient,
            evidence_description: description.into(),
            key_points: Vec::new(),
            limitations: String::new(),
            related_questions: Vec::new(),
        }
    }
}

/// One translated finding from a paper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyInsight {
    /// Finding restated in the reader's language
    #[serde(default)]
    pub translated: String,
    /// Excerpt in the paper's original language
    #[serde(default)]
    pub original: String,
    /// What it means in everyday terms
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Delegated,
    Fallback,
}

/// Deep breakdown of a single paper against a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperAnalysis {
    pub relevance_score: u8,
    pub main_finding: String,
    pub key_insights: Vec<KeyInsight>,
    pub methodology_note: String,
    pub practical_takeaway: String,
    pub source: AnalysisSource,
}

impl PaperAnalysis {
    /// Neutral result used whenever analysis cannot be performed
    pub fn fallback() -> Self {
        Self {
            relevance_score: 50,
            main_finding: "Analysis could not be completed.".to_string(),
            key_insights: Vec::new(),
            methodology_note: String::new(),
            practical_takeaway: String::new(),
            source: AnalysisSource::Fallback,
        }
    }
}

/// Best-effort topical label for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nutrition,
    Sleep,
    Psychology,
    Sports,
    Technology,
    Environment,
    Education,
    #[default]
    Health,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Nutrition => "Nutrition",
            Self::Sleep => "Sleep",
            Self::Psychology => "Psychology",
            Self::Sports => "Sports",
            Self::Technology => "Technology",
            Self::Environment => "Environment",
            Self::Education => "Education",
            Self::Health => "Health",
        }
    }
}

/// Full pipeline output for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub question: String,
    pub question_hash: String,
    pub level: ExplanationLevel,
    pub category: Category,
    pub synthesis: SynthesisResult,
    /// Ranked papers, truncated for display
    pub papers: Vec<RankedPaper>,
    /// Number of ranked papers before truncation
    pub paper_count: usize,
    pub cache_hit: bool,
    /// Components that degraded to a fallback while producing this result
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

/// Cached pipeline output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: ResearchResult,
    pub created_at: DateTime<Utc>,
    pub ttl_ms: u64,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, payload: ResearchResult, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            payload,
            created_at: Utc::now(),
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        (now - self.created_at).num_milliseconds() >= self.ttl_ms as i64
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Paper record shaped for API responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayPaper {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub year: Option<i32>,
    pub citations: u32,
    pub relevance_score: u8,
    pub combined_score: f64,
    pub authors: String,
    pub venue: String,
    pub url: String,
    pub pdf_url: Option<String>,
}

impl From<&RankedPaper> for DisplayPaper {
    fn from(ranked: &RankedPaper) -> Self {
        let paper = ranked.paper();
        Self {
            id: paper.id.clone().unwrap_or_default(),
            title: paper.title.clone(),
            abstract_text: paper.abstract_str().to_string(),
            year: paper.year,
            citations: paper.citation_count,
            relevance_score: ranked.relevance_score(),
            combined_score: (ranked.combined_score * 100.0).round() / 100.0,
            authors: paper.author_line(),
            venue: paper.venue.clone().unwrap_or_default(),
            url: paper.url.clone().unwrap_or_default(),
            pdf_url: paper.pdf_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_and_instruction() {
        assert_eq!(
            "Academic".parse::<ExplanationLevel>().unwrap(),
            ExplanationLevel::Academic
        );
        assert!("expert".parse::<ExplanationLevel>().is_err());
        for level in ExplanationLevel::ALL {
            assert!(!level.instruction().is_empty());
        }
        assert_ne!(
            ExplanationLevel::Simple.instruction(),
            ExplanationLevel::Academic.instruction()
        );
    }

    #[test]
    fn test_query_validation_bounds() {
        let short = ResearchQuery::new("  coffee  ", ExplanationLevel::Medium, 10, 500);
        assert!(matches!(short, Err(Error::Validation(_))));

        let long = ResearchQuery::new("a".repeat(501), ExplanationLevel::Medium, 10, 500);
        assert!(long.is_err());

        let ok = ResearchQuery::new(
            "  Is   Coffee harmful to health?  ",
            ExplanationLevel::Simple,
            10,
            500,
        )
        .unwrap();
        assert_eq!(ok.text(), "Is   Coffee harmful to health?");
        assert_eq!(ok.normalized(), "is coffee harmful to health?");
        assert_eq!(ok.level(), ExplanationLevel::Simple);
    }

    #[test]
    fn test_identity_key_prefers_id() {
        let with_id = CandidatePaper::new(Some("abc".into()), "Title");
        let blank_id = CandidatePaper::new(Some("  ".into()), "Some Title");
        let no_id = CandidatePaper::new(None, "  SOME title ");

        assert_eq!(with_id.identity_key(), "id:abc");
        assert_eq!(blank_id.identity_key(), no_id.identity_key());
    }

    #[test]
    fn test_author_line() {
        let paper = CandidatePaper::new(None, "T").with_authors(["A", "B", "C", "D"]);
        assert_eq!(paper.author_line(), "A, B, C et al.");

        let paper = CandidatePaper::new(None, "T").with_authors(["A", "B"]);
        assert_eq!(paper.author_line(), "A, B");
    }

    #[test]
    fn test_scored_paper_clamps() {
        let p = CandidatePaper::new(None, "T");
        assert_eq!(
            ScoredPaper::new(p.clone(), 140.0, "", ScoreSource::Delegated).relevance_score,
            100
        );
        assert_eq!(
            ScoredPaper::new(p.clone(), -3.0, "", ScoreSource::Delegated).relevance_score,
            0
        );
        assert_eq!(
            ScoredPaper::new(p, f64::NAN, "", ScoreSource::Delegated).relevance_score,
            0
        );
    }

    #[test]
    fn test_evidence_strength_lenient() {
        assert_eq!(EvidenceStrength::parse_lenient(" Strong "), EvidenceStrength::Strong);
        assert_eq!(
            EvidenceStrength::parse_lenient("very strong"),
            EvidenceStrength::Insufficient
        );
        let json = serde_json::to_string(&EvidenceStrength::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }

    #[test]
    fn test_candidate_abstract_field_name() {
        let json = r#"{"title":"X","abstract":"body","citation_count":3}"#;
        let paper: CandidatePaper = serde_json::from_str(json).unwrap();
        assert_eq!(paper.abstract_str(), "body");
        assert_eq!(paper.citation_count, 3);
    }

    fn sample_result() -> ResearchResult {
        ResearchResult {
            question: "Is coffee harmful to health?".to_string(),
            question_hash: "abc".to_string(),
            level: ExplanationLevel::Medium,
            category: Category::Nutrition,
            synthesis: SynthesisResult::insufficient("none", "none"),
            papers: Vec::new(),
            paper_count: 0,
            cache_hit: false,
            fallbacks: Vec::new(),
        }
    }

    #[test]
    fn test_cache_entry_expiry() {
        let entry = CacheEntry::new("k", sample_result(), Duration::from_secs(3600));
        assert!(!entry.is_expired());
        let later = entry.created_at + chrono::Duration::hours(2);
        assert!(entry.is_expired_at(later));

        let zero = CacheEntry::new("k", sample_result(), Duration::ZERO);
        assert!(zero.is_expired());
    }

    #[test]
    fn test_display_paper_from_ranked() {
        let paper = CandidatePaper::new(Some("p1".into()), "Coffee and health")
            .with_authors(["A", "B", "C", "D", "E"])
            .with_citations(12);
        let ranked = RankedPaper {
            scored: ScoredPaper::new(paper, 70.0, "relevant", ScoreSource::Delegated),
            combined_score: 42.1234,
        };
        let display = DisplayPaper::from(&ranked);
        assert_eq!(display.id, "p1");
        assert_eq!(display.authors, "A, B, C et al.");
        assert_eq!(display.combined_score, 42.12);
        assert_eq!(display.relevance_score, 70);
    }
}
