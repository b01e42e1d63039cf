//! Ranking and filtering
//!
//! `combined = 0.6 * relevance + min(citations / 50, 30) + recency`
//!
//! where `recency = max(0, 10 - age)` for papers published within the recency
//! cutoff and 0 otherwise. Papers below the relevance threshold are dropped;
//! if that empties a non-empty set, the relaxed threshold is tried once.

use chrono::{Datelike, Utc};

use research_agent_config::PipelineSettings;
use research_agent_core::{RankedPaper, ScoredPaper};

const RELEVANCE_WEIGHT: f64 = 0.6;
const CITATIONS_PER_POINT: f64 = 50.0;
const MAX_CITATION_POINTS: f64 = 30.0;
const MAX_RECENCY_POINTS: i32 = 10;

#[derive(Debug, Clone)]
pub struct RankerConfig {
    pub relevance_threshold: u8,
    pub relaxed_threshold: u8,
    pub recency_cutoff_years: i32,
    /// Fixed reference year; the current UTC year when unset
    pub current_year: Option<i32>,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

impl RankerConfig {
    pub fn from_settings(pipeline: &PipelineSettings) -> Self {
        Self {
            relevance_threshold: pipeline.relevance_threshold,
            relaxed_threshold: pipeline.relaxed_threshold,
            recency_cutoff_years: pipeline.recency_cutoff_years,
            current_year: None,
        }
    }

    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }
}

/// Ranked papers plus how the threshold was applied
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub papers: Vec<RankedPaper>,
    /// The relaxed threshold was used
    pub relaxed: bool,
}

pub struct Ranker {
    config: RankerConfig,
}

impl Ranker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    fn current_year(&self) -> i32 {
        self.config.current_year.unwrap_or_else(|| Utc::now().year())
    }

    /// Filter, score and order papers
    pub fn rank(&self, scored: Vec<ScoredPaper>) -> Ranking {
        let year = self.current_year();
        let threshold = self.config.relevance_threshold;

        let strict_hits = scored.iter().filter(|p| p.relevance_score >= threshold).count();
        let (threshold, relaxed) = if strict_hits == 0 && !scored.is_empty() {
            tracing::debug!(
                from = threshold,
                to = self.config.relaxed_threshold,
                "No paper met the relevance threshold, relaxing"
            );
            (self.config.relaxed_threshold, true)
        } else {
            (threshold, false)
        };

        let mut papers: Vec<RankedPaper> = scored
            .into_iter()
            .filter(|p| p.relevance_score >= threshold)
            .map(|scored| RankedPaper {
                combined_score: combined_score(&scored, year, self.config.recency_cutoff_years),
                scored,
            })
            .collect();

        // Stable: equal keys keep retrieval order
        papers.sort_by(|a, b| {
            b.combined_score
                .total_cmp(&a.combined_score)
                .then_with(|| b.paper().citation_count.cmp(&a.paper().citation_count))
        });

        Ranking { papers, relaxed }
    }
}

/// Ordering signal blending relevance, citation weight and recency
pub fn combined_score(paper: &ScoredPaper, current_year: i32, recency_cutoff_years: i32) -> f64 {
    let relevance = RELEVANCE_WEIGHT * f64::from(paper.relevance_score);
    let citations = (f64::from(paper.paper.citation_count) / CITATIONS_PER_POINT).min(MAX_CITATION_POINTS);
    let recency = match paper.paper.year {
        Some(year) if year >= current_year - recency_cutoff_years => {
            let age = (current_year - year).max(0);
            f64::from((MAX_RECENCY_POINTS - age).max(0))
        }
        _ => 0.0,
    };
    relevance + citations + recency
}
