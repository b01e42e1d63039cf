//! Relevance scoring
//!
//! Candidates are scored in fixed-size batches; papers within a batch are
//! scored concurrently and batches run one after another, which bounds the
//! number of in-flight completion calls. Each candidate gets exactly one
//! score from one of three sources:
//!
//! | Source            | When                                        |
//! |-------------------|---------------------------------------------|
//! | `Fixed`           | abstract missing or shorter than the minimum |
//! | `Delegated`       | rubric call answered with a usable score     |
//! | `LexicalFallback` | rubric call failed or could not be decoded   |

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;

use research_agent_config::{LlmSettings, PipelineSettings};
use research_agent_core::{
    decode_json, CandidatePaper, Decoded, GenerateRequest, LanguageModel, ScoreSource, ScoredPaper,
};

use crate::{excerpt, lexical};

const SYSTEM_PROMPT: &str = "You grade how well a scientific paper answers a research question.";

const RUBRIC: &str = "Scoring bands:\n\
    0-20: irrelevant, different topic\n\
    21-40: tangential, shares some terms but does not address the question\n\
    41-60: partially relevant, addresses a related aspect\n\
    61-80: relevant, directly studies part of the question\n\
    81-100: highly relevant, directly answers the question";

/// Longest abstract excerpt sent for scoring
const ABSTRACT_EXCERPT_CHARS: usize = 1200;

/// Scorer configuration
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Papers scored concurrently per batch
    pub batch_size: usize,
    /// Abstracts shorter than this get the fixed score
    pub min_abstract_chars: usize,
    pub short_abstract_score: u8,
    pub max_tokens: u32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default(), &LlmSettings::default())
    }
}

impl ScorerConfig {
    pub fn from_settings(pipeline: &PipelineSettings, llm: &LlmSettings) -> Self {
        Self {
            batch_size: pipeline.score_batch_size.max(1),
            min_abstract_chars: pipeline.min_abstract_chars,
            short_abstract_score: pipeline.short_abstract_score.min(100),
            max_tokens: llm.scoring_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScorePayload {
    #[serde(alias = "relevance_score")]
    score: f64,
    #[serde(default)]
    reason: String,
}

/// Relevance scorer
pub struct RelevanceScorer {
    llm: Arc<dyn LanguageModel>,
    config: ScorerConfig,
}

impl RelevanceScorer {
    pub fn new(llm: Arc<dyn LanguageModel>, config: ScorerConfig) -> Self {
        Self { llm, config }
    }

    /// Score every candidate, preserving input order
    pub async fn score(&self, candidates: Vec<CandidatePaper>, question: &str) -> Vec<ScoredPaper> {
        let mut scored = Vec::with_capacity(candidates.len());
        let mut remaining = candidates.into_iter();

        loop {
            let batch: Vec<CandidatePaper> = remaining.by_ref().take(self.config.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let results = join_all(batch.into_iter().map(|paper| self.score_one(paper, question))).await;
            scored.extend(results);
        }

        let lexical = scored
            .iter()
            .filter(|p| p.score_source == ScoreSource::LexicalFallback)
            .count();
        tracing::debug!(papers = scored.len(), lexical, "Relevance scoring complete");
        scored
    }

    async fn score_one(&self, paper: CandidatePaper, question: &str) -> ScoredPaper {
        if paper.abstract_str().trim().chars().count() < self.config.min_abstract_chars {
            return ScoredPaper::new(
                paper,
                f64::from(self.config.short_abstract_score),
                "Abstract missing or too short to assess",
                ScoreSource::Fixed,
            );
        }

        let decoded = match self.llm.generate(self.build_request(&paper, question)).await {
            Ok(response) => decode_json::<ScorePayload>(&response.text).and_then(|payload| {
                if payload.score.is_finite() {
                    Decoded::Ok(payload)
                } else {
                    Decoded::Fallback("score is not a number".to_string())
                }
            }),
            Err(e) => Decoded::Fallback(e.to_string()),
        };

        match decoded {
            Decoded::Ok(payload) => ScoredPaper::new(paper, payload.score, payload.reason, ScoreSource::Delegated),
            Decoded::Fallback(reason) => {
                tracing::warn!(error = %reason, title = %paper.title, "Relevance scoring failed, using lexical overlap");
                Self::lexical_score(paper, question)
            }
        }
    }

    fn build_request(&self, paper: &CandidatePaper, question: &str) -> GenerateRequest {
        let prompt = format!(
            "Question: \"{}\"\n\nPaper title: {}\nAbstract: {}\n\n{}\n\n\
             Reply with JSON only: {{\"score\": <0-100>, \"reason\": \"one short sentence\"}}",
            question,
            paper.title,
            excerpt(paper.abstract_str(), ABSTRACT_EXCERPT_CHARS),
            RUBRIC,
        );

        GenerateRequest::new(SYSTEM_PROMPT)
            .with_user_message(prompt)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(0.0)
    }

    /// Weighted word overlap between the question and (title, abstract)
    pub fn lexical_score(paper: CandidatePaper, question: &str) -> ScoredPaper {
        let score = lexical::paper_relevance(question, &paper.title, paper.abstract_str());
        ScoredPaper::new(
            paper,
            score,
            "Estimated from word overlap with the question",
            ScoreSource::LexicalFallback,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{paper, ScriptedLlm, LONG_ABSTRACT};
    use research_agent_core::Error;

    fn scorer(llm: Arc<ScriptedLlm>) -> RelevanceScorer {
        RelevanceScorer::new(llm, ScorerConfig::default())
    }

    #[tokio::test]
    async fn test_short_abstract_skips_model() {
        let llm = Arc::new(ScriptedLlm::replying("{\"score\": 90, \"reason\": \"x\"}"));
        let scored = scorer(llm.clone())
            .score(vec![paper("1", "Coffee", "Too short."), paper("2", "Tea", "")], "coffee?")
            .await;

        assert_eq!(llm.calls(), 0);
        assert!(scored.iter().all(|p| p.relevance_score == 15 && p.score_source == ScoreSource::Fixed));
    }

    #[tokio::test]
    async fn test_delegated_score_clamped() {
        let llm = Arc::new(ScriptedLlm::new(|prompt| {
            if prompt.contains("Paper title: High") {
                Ok("```json\n{\"score\": 140, \"reason\": \"direct answer\"}\n```".to_string())
            } else {
                Ok("{\"relevance_score\": 42.6}".to_string())
            }
        }));
        let scored = scorer(llm)
            .score(
                vec![paper("1", "High", LONG_ABSTRACT), paper("2", "Mid", LONG_ABSTRACT)],
                "Is coffee harmful to health?",
            )
            .await;

        assert_eq!(scored[0].relevance_score, 100);
        assert_eq!(scored[0].relevance_reason, "direct answer");
        assert_eq!(scored[1].relevance_score, 43);
        assert!(scored.iter().all(|p| p.score_source == ScoreSource::Delegated));
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_lexical() {
        let llm = Arc::new(ScriptedLlm::new(|prompt| {
            if prompt.contains("Paper title: Broken") {
                Ok("I think it is quite relevant".to_string())
            } else {
                Err(Error::UpstreamTimeout("60s".into()))
            }
        }));
        let scored = scorer(llm)
            .score(
                vec![
                    paper("1", "Broken", LONG_ABSTRACT),
                    paper("2", "Coffee intake and cardiovascular events", LONG_ABSTRACT),
                ],
                "Is coffee harmful to health?",
            )
            .await;

        assert_eq!(scored.len(), 2);
        assert!(scored.iter().all(|p| p.score_source == ScoreSource::LexicalFallback));
        assert!(scored.iter().all(|p| p.relevance_score <= 100));
        assert!(scored[1].relevance_score > 0);
    }

    #[tokio::test]
    async fn test_every_candidate_scored_in_order_across_batches() {
        let llm = Arc::new(ScriptedLlm::replying("{\"score\": 70, \"reason\": \"ok\"}"));
        let candidates: Vec<CandidatePaper> = (0..23)
            .map(|i| paper(&i.to_string(), &format!("Paper {}", i), LONG_ABSTRACT))
            .collect();

        let scored = scorer(llm.clone()).score(candidates, "coffee and health").await;

        assert_eq!(scored.len(), 23);
        assert_eq!(llm.calls(), 23);
        for (i, p) in scored.iter().enumerate() {
            assert_eq!(p.paper.id.as_deref(), Some(i.to_string().as_str()));
        }
    }
}
