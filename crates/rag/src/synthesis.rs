//! Evidence synthesis
//!
//! Builds the final structured answer from the top-ranked papers. Always
//! returns a fully populated [`SynthesisResult`]; [`SynthesisSource`] records
//! which path produced it so callers can decide whether the answer is worth
//! caching.

use std::sync::Arc;

use serde::Deserialize;

use research_agent_config::{LlmSettings, PipelineSettings};
use research_agent_core::{
    decode_json, Decoded, EvidenceStrength, ExplanationLevel, GenerateRequest, LanguageModel,
    RankedPaper, SynthesisResult,
};

use crate::excerpt;

const SYSTEM_PROMPT: &str = "You are a careful science communicator. You summarize what peer-reviewed \
research says about a question and grade the strength of the evidence honestly.";

const EVIDENCE_RUBRIC: &str = "Evidence strength:\n\
    - strong: 5 or more consistent, high-quality studies\n\
    - moderate: 3-5 mostly consistent studies\n\
    - limited: 1-2 studies, or studies that conflict\n\
    - insufficient: the papers give no usable signal";

const ABSTRACT_EXCERPT_CHARS: usize = 400;

/// Summaries shorter than this are treated as malformed
const MIN_SUMMARY_CHARS: usize = 40;

const NO_EVIDENCE_SUMMARY: &str =
    "Not enough academic sources were found on this topic to give an evidence-based answer.";
const NO_EVIDENCE_DESCRIPTION: &str = "No relevant sources were found.";

const INCONCLUSIVE_SUMMARY: &str = "The available studies do not support a clear conclusion on this \
question. Consider the listed papers individually.";
const INCONCLUSIVE_DESCRIPTION: &str = "A reliable summary could not be produced from the sources.";

/// Which path produced a synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisSource {
    /// Model answer parsed and accepted
    Delegated,
    /// No papers to synthesize; model not called
    NoEvidence,
    /// Model answered but the summary was missing or too short
    Inconclusive,
    /// Model call or decoding failed
    Fallback,
}

/// Synthesis result and its provenance
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub result: SynthesisResult,
    pub source: SynthesisSource,
}

impl Synthesis {
    /// Only a delegated answer is a successful synthesis
    pub fn is_cacheable(&self) -> bool {
        self.source == SynthesisSource::Delegated
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Papers included in the prompt
    pub top_k: usize,
    pub max_tokens: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default(), &LlmSettings::default())
    }
}

impl SynthesisConfig {
    pub fn from_settings(pipeline: &PipelineSettings, llm: &LlmSettings) -> Self {
        Self {
            top_k: pipeline.top_k.max(1),
            max_tokens: llm.synthesis_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SynthesisPayload {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    evidence_strength: String,
    #[serde(default)]
    evidence_description: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    limitations: String,
    #[serde(default)]
    related_questions: Vec<String>,
}

pub struct Synthesizer {
    llm: Arc<dyn LanguageModel>,
    config: SynthesisConfig,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>, config: SynthesisConfig) -> Self {
        Self { llm, config }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        papers: &[RankedPaper],
        level: ExplanationLevel,
    ) -> Synthesis {
        if papers.is_empty() {
            return Synthesis {
                result: SynthesisResult::insufficient(NO_EVIDENCE_SUMMARY, NO_EVIDENCE_DESCRIPTION),
                source: SynthesisSource::NoEvidence,
            };
        }

        let request = self.build_request(question, papers, level);
        let decoded = match self.llm.generate(request).await {
            Ok(response) => decode_json::<SynthesisPayload>(&response.text),
            Err(e) => Decoded::Fallback(e.to_string()),
        };

        match decoded {
            Decoded::Ok(payload) => Self::accept(payload),
            Decoded::Fallback(reason) => {
                tracing::warn!(error = %reason, papers = papers.len(), "Synthesis failed, using fallback summary");
                Synthesis {
                    result: fallback_result(papers.len()),
                    source: SynthesisSource::Fallback,
                }
            }
        }
    }

    fn accept(payload: SynthesisPayload) -> Synthesis {
        let summary = payload.summary.trim().to_string();
        if summary.chars().count() < MIN_SUMMARY_CHARS {
            tracing::warn!(chars = summary.chars().count(), "Synthesis summary missing or too short");
            return Synthesis {
                result: SynthesisResult::insufficient(INCONCLUSIVE_SUMMARY, INCONCLUSIVE_DESCRIPTION),
                source: SynthesisSource::Inconclusive,
            };
        }

        Synthesis {
            result: SynthesisResult {
                summary,
                evidence_strength: EvidenceStrength::parse_lenient(&payload.evidence_strength),
                evidence_description: payload.evidence_description.trim().to_string(),
                key_points: non_blank(payload.key_points),
                limitations: payload.limitations.trim().to_string(),
                related_questions: non_blank(payload.related_questions),
            },
            source: SynthesisSource::Delegated,
        }
    }

    fn build_request(&self, question: &str, papers: &[RankedPaper], level: ExplanationLevel) -> GenerateRequest {
        let papers_text = papers
            .iter()
            .take(self.config.top_k)
            .enumerate()
            .map(|(i, ranked)| {
                let paper = ranked.paper();
                format!(
                    "{}. {} (Year: {}, Citations: {}, Relevance: {}/100)\n   {}",
                    i + 1,
                    paper.title,
                    paper.year.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string()),
                    paper.citation_count,
                    ranked.relevance_score(),
                    excerpt(paper.abstract_str(), ABSTRACT_EXCERPT_CHARS),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Question: \"{question}\"\n\nPapers:\n{papers}\n\n{rubric}\n\n\
             Audience: {level}\n\n\
             Reply with JSON only:\n\
             {{\"summary\": \"3-5 paragraphs\", \"evidence_strength\": \"strong|moderate|limited|insufficient\", \
             \"evidence_description\": \"why this grade\", \"key_points\": [\"point\"], \
             \"limitations\": \"caveats of the evidence\", \"related_questions\": [\"question\"]}}",
            question = question,
            papers = papers_text,
            rubric = EVIDENCE_RUBRIC,
            level = level.instruction(),
        );

        GenerateRequest::new(SYSTEM_PROMPT)
            .with_user_message(prompt)
            .with_max_tokens(self.config.max_tokens)
    }
}

/// Deterministic answer used when the model cannot be reached
fn fallback_result(paper_count: usize) -> SynthesisResult {
    SynthesisResult::insufficient(
        format!(
            "{} relevant {} found, but a summary could not be generated at this time.",
            paper_count,
            if paper_count == 1 { "paper was" } else { "papers were" }
        ),
        "Summary unavailable.",
    )
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
