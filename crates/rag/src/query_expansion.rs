//! Query expansion
//!
//! Turns a free-text question into a short list of academic search queries.
//! The language model is asked for a structured plan; when that fails, returns
//! too few queries, or is unavailable, a deterministic heuristic takes over:
//! - recognized topic words map to fixed pre-written queries
//! - otherwise the question is combined with research-method suffixes

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use research_agent_config::{LlmSettings, PipelineSettings};
use research_agent_core::{decode_json, Decoded, GenerateRequest, LanguageModel, QueryPlan};

use crate::lexical;

/// Topic words and the queries they expand to
const TOPIC_QUERIES: &[(&[&str], &[&str])] = &[
    (
        &["coffee", "caffeine", "espresso"],
        &[
            "coffee consumption health outcomes",
            "caffeine intake cardiovascular risk",
            "coffee consumption mortality meta-analysis",
        ],
    ),
    (
        &["sleep", "insomnia", "nap"],
        &[
            "sleep duration health outcomes",
            "sleep deprivation cognitive performance",
            "sleep quality systematic review",
        ],
    ),
    (
        &["exercise", "workout", "fitness", "running"],
        &[
            "physical exercise health benefits",
            "exercise all-cause mortality cohort",
            "aerobic exercise randomized controlled trial",
        ],
    ),
    (
        &["meditation", "mindfulness"],
        &[
            "mindfulness meditation mental health",
            "meditation stress reduction randomized trial",
            "mindfulness-based intervention meta-analysis",
        ],
    ),
    (
        &["screen", "smartphone", "social media"],
        &[
            "screen time mental health adolescents",
            "smartphone use wellbeing",
            "social media use depression meta-analysis",
        ],
    ),
    (
        &["sugar", "sweetener"],
        &[
            "sugar intake health effects",
            "artificial sweeteners metabolic outcomes",
            "dietary sugar obesity systematic review",
        ],
    ),
];

/// Appended to the question when no topic matches
const METHOD_SUFFIXES: &[&str] = &["", "systematic review", "meta-analysis", "randomized controlled trial"];

const SYSTEM_PROMPT: &str = "You are a research librarian. You turn everyday questions into \
precise English queries for an academic paper search engine.";

/// Query expansion configuration
#[derive(Debug, Clone)]
pub struct QueryExpansionConfig {
    /// Lower bound on the final plan
    pub min_queries: usize,
    /// Upper bound on the final plan
    pub max_queries: usize,
    /// Fewer model queries than this triggers the heuristic
    pub min_llm_queries: usize,
    pub max_tokens: u32,
}

impl Default for QueryExpansionConfig {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default(), &LlmSettings::default())
    }
}

impl QueryExpansionConfig {
    pub fn from_settings(pipeline: &PipelineSettings, llm: &LlmSettings) -> Self {
        Self {
            min_queries: pipeline.min_queries.max(1),
            max_queries: pipeline.max_queries.clamp(1, 8),
            min_llm_queries: pipeline.min_llm_queries,
            max_tokens: llm.expansion_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExpansionPayload {
    #[serde(default)]
    queries: Vec<String>,
    #[serde(default)]
    terms: Vec<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Query expander
pub struct QueryExpander {
    llm: Arc<dyn LanguageModel>,
    config: QueryExpansionConfig,
}

impl QueryExpander {
    pub fn new(llm: Arc<dyn LanguageModel>, config: QueryExpansionConfig) -> Self {
        Self { llm, config }
    }

    /// Expand a question into a plan with 1..=max_queries queries
    pub async fn expand(&self, question: &str) -> QueryPlan {
        let decoded = match self.llm.generate(self.build_request(question)).await {
            Ok(response) => decode_json::<ExpansionPayload>(&response.text)
                .and_then(|payload| self.validate(payload)),
            Err(e) => Decoded::Fallback(e.to_string()),
        };

        match decoded {
            Decoded::Ok(plan) => {
                tracing::debug!(queries = plan.queries.len(), "Query expansion complete");
                plan
            }
            Decoded::Fallback(reason) => {
                tracing::warn!(error = %reason, "Query expansion failed, using heuristic queries");
                self.heuristic_plan(question)
            }
        }
    }

    fn build_request(&self, question: &str) -> GenerateRequest {
        let prompt = format!(
            "Question: \"{question}\"\n\n\
             Write between 3 and {max} English search queries that would find peer-reviewed \
             studies answering this question. Prefer scientific terminology over everyday words. \
             Also list the key scientific terms.\n\n\
             Reply with JSON only:\n\
             {{\"queries\": [\"query 1\", \"query 2\", \"query 3\"], \"terms\": [\"term\"], \"rationale\": \"one sentence\"}}",
            question = question,
            max = self.config.max_queries,
        );

        GenerateRequest::new(SYSTEM_PROMPT)
            .with_user_message(prompt)
            .with_max_tokens(self.config.max_tokens)
    }

    fn validate(&self, payload: ExpansionPayload) -> Decoded<QueryPlan> {
        let queries = dedup_queries(payload.queries, self.config.max_queries);
        if queries.len() < self.config.min_llm_queries.max(self.config.min_queries) {
            return Decoded::Fallback(format!(
                "model returned {} usable queries, need {}",
                queries.len(),
                self.config.min_llm_queries
            ));
        }

        Decoded::Ok(QueryPlan {
            queries,
            terms: payload
                .terms
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            rationale: payload.rationale.filter(|r| !r.trim().is_empty()),
            heuristic: false,
        })
    }

    /// Deterministic plan built without the language model
    pub fn heuristic_plan(&self, question: &str) -> QueryPlan {
        let lowered = question.to_lowercase();
        let words: HashSet<String> = lexical::tokenize(&lowered).into_iter().collect();

        let topic = TOPIC_QUERIES.iter().find(|(keys, _)| {
            keys.iter().any(|key| {
                if key.contains(' ') {
                    lowered.contains(key)
                } else {
                    words.contains(*key)
                }
            })
        });

        let base = match question.trim().trim_end_matches('?').trim() {
            "" => question.trim().to_string(),
            stripped => stripped.to_string(),
        };
        let candidates: Vec<String> = match topic {
            Some((_, queries)) => queries.iter().map(|q| q.to_string()).collect(),
            None => METHOD_SUFFIXES
                .iter()
                .map(|suffix| {
                    if suffix.is_empty() {
                        base.clone()
                    } else {
                        format!("{} {}", base, suffix)
                    }
                })
                .collect(),
        };

        let mut queries = dedup_queries(candidates, self.config.max_queries);
        if queries.is_empty() {
            queries.push(question.trim().to_string());
        }

        QueryPlan {
            queries,
            terms: lexical::content_terms(question),
            rationale: None,
            heuristic: true,
        }
    }
}

/// Trim, drop blanks and case-insensitive duplicates, cap at `max`
fn dedup_queries(queries: Vec<String>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .filter(|q| seen.insert(q.to_lowercase()))
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;

    fn expander(llm: ScriptedLlm) -> QueryExpander {
        QueryExpander::new(Arc::new(llm), QueryExpansionConfig::default())
    }

    #[tokio::test]
    async fn test_expand_parses_fenced_payload() {
        let llm = ScriptedLlm::replying(
            "Here you go:\n```json\n{\"queries\": [\"melatonin sleep onset\", \"melatonin RCT\", \" \", \"Melatonin sleep onset\"], \
             \"terms\": [\"melatonin\"], \"rationale\": \"focus on trials\"}\n```",
        );
        let plan = expander(llm).expand("Does melatonin help you fall asleep?").await;

        assert!(!plan.heuristic);
        assert_eq!(plan.queries, vec!["melatonin sleep onset", "melatonin RCT"]);
        assert_eq!(plan.terms, vec!["melatonin"]);
        assert_eq!(plan.rationale.as_deref(), Some("focus on trials"));
    }

    #[tokio::test]
    async fn test_too_few_queries_falls_back() {
        let llm = ScriptedLlm::replying("{\"queries\": [\"only one\"]}");
        let plan = expander(llm).expand("Is coffee harmful to health?").await;
        assert!(plan.heuristic);
        assert_eq!(plan.queries[0], "coffee consumption health outcomes");
    }

    #[tokio::test]
    async fn test_unavailable_model_falls_back() {
        let plan = expander(ScriptedLlm::failing())
            .expand("Does learning a second language delay dementia?")
            .await;

        assert!(plan.heuristic);
        assert_eq!(
            plan.queries,
            vec![
                "Does learning a second language delay dementia",
                "Does learning a second language delay dementia systematic review",
                "Does learning a second language delay dementia meta-analysis",
                "Does learning a second language delay dementia randomized controlled trial",
            ]
        );
        assert!(plan.terms.contains(&"dementia".to_string()));
    }

    #[tokio::test]
    async fn test_queries_capped_at_max() {
        let llm = ScriptedLlm::replying(
            "{\"queries\": [\"a1\",\"a2\",\"a3\",\"a4\",\"a5\",\"a6\",\"a7\",\"a8\",\"a9\",\"a10\"]}",
        );
        let plan = expander(llm).expand("Some question about things").await;
        assert_eq!(plan.queries.len(), 8);
    }

    #[test]
    fn test_heuristic_topic_matching() {
        let expander = expander(ScriptedLlm::failing());

        let plan = expander.heuristic_plan("How much social media is too much?");
        assert_eq!(plan.queries[0], "screen time mental health adolescents");

        // "nap" must match as a word, not inside "snapshot"
        let plan = expander.heuristic_plan("Is a snapshot of memory reliable?");
        assert_eq!(plan.queries[0], "Is a snapshot of memory reliable");
    }

    #[test]
    fn test_heuristic_never_empty() {
        let config = QueryExpansionConfig {
            max_queries: 1,
            ..Default::default()
        };
        let expander = QueryExpander::new(Arc::new(ScriptedLlm::failing()), config);
        let plan = expander.heuristic_plan("???");
        assert_eq!(plan.queries, vec!["???"]);
    }
}
