//! Single-paper analysis
//!
//! Explains one paper against the question: main finding, key insights
//! restated for the reader next to the original sentence, a methodology note
//! and a practical takeaway. Same fallback discipline as synthesis.

use std::sync::Arc;

use serde::Deserialize;

use research_agent_config::LlmSettings;
use research_agent_core::{
    decode_json, AnalysisSource, CandidatePaper, Decoded, GenerateRequest, KeyInsight,
    LanguageModel, PaperAnalysis,
};

const SYSTEM_PROMPT: &str = "You explain scientific papers to non-specialists without overstating \
their findings.";

/// Insights requested per paper
const MAX_INSIGHTS: usize = 3;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub max_tokens: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from_settings(&LlmSettings::default())
    }
}

impl AnalyzerConfig {
    pub fn from_settings(llm: &LlmSettings) -> Self {
        Self {
            max_tokens: llm.analysis_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    #[serde(default = "neutral_score")]
    relevance_score: f64,
    #[serde(default)]
    main_finding: String,
    #[serde(default)]
    key_insights: Vec<KeyInsight>,
    #[serde(default)]
    methodology_note: String,
    #[serde(default)]
    practical_takeaway: String,
}

fn neutral_score() -> f64 {
    50.0
}

pub struct PaperAnalyzer {
    llm: Arc<dyn LanguageModel>,
    config: AnalyzerConfig,
}

impl PaperAnalyzer {
    pub fn new(llm: Arc<dyn LanguageModel>, config: AnalyzerConfig) -> Self {
        Self { llm, config }
    }

    /// Analyze a paper; never fails
    pub async fn analyze(&self, paper: &CandidatePaper, question: &str) -> PaperAnalysis {
        if paper.abstract_str().trim().is_empty() {
            tracing::debug!(title = %paper.title, "No abstract to analyze");
            return PaperAnalysis::fallback();
        }

        let decoded = match self.llm.generate(self.build_request(paper, question)).await {
            Ok(response) => decode_json::<AnalysisPayload>(&response.text).and_then(validate),
            Err(e) => Decoded::Fallback(e.to_string()),
        };

        match decoded {
            Decoded::Ok(analysis) => analysis,
            Decoded::Fallback(reason) => {
                tracing::warn!(error = %reason, title = %paper.title, "Paper analysis failed");
                PaperAnalysis::fallback()
            }
        }
    }

    fn build_request(&self, paper: &CandidatePaper, question: &str) -> GenerateRequest {
        let prompt = format!(
            "Question being researched: \"{question}\"\n\n\
             Paper: {title}\nAbstract: {abstract_text}\n\n\
             Tasks:\n\
             1. Extract the {n} findings from this paper most relevant to the question.\n\
             2. Restate each finding in plain language and quote the original abstract sentence.\n\
             3. Explain what each finding means in everyday life.\n\n\
             Reply with JSON only:\n\
             {{\"relevance_score\": <0-100>, \"main_finding\": \"1-2 sentences\", \
             \"key_insights\": [{{\"translated\": \"plain restatement\", \"original\": \"original sentence\", \
             \"explanation\": \"everyday meaning\"}}], \
             \"methodology_note\": \"study design and size\", \"practical_takeaway\": \"one sentence\"}}",
            question = question,
            title = paper.title,
            abstract_text = paper.abstract_str().trim(),
            n = MAX_INSIGHTS,
        );

        GenerateRequest::new(SYSTEM_PROMPT)
            .with_user_message(prompt)
            .with_max_tokens(self.config.max_tokens)
    }
}

fn validate(payload: AnalysisPayload) -> Decoded<PaperAnalysis> {
    let main_finding = payload.main_finding.trim().to_string();
    if main_finding.is_empty() {
        return Decoded::Fallback("analysis has no main finding".to_string());
    }

    let score = if payload.relevance_score.is_finite() {
        payload.relevance_score.round().clamp(0.0, 100.0) as u8
    } else {
        50
    };

    Decoded::Ok(PaperAnalysis {
        relevance_score: score,
        main_finding,
        key_insights: payload
            .key_insights
            .into_iter()
            .filter(|i| !i.translated.trim().is_empty())
            .take(MAX_INSIGHTS)
            .collect(),
        methodology_note: payload.methodology_note.trim().to_string(),
        practical_takeaway: payload.practical_takeaway.trim().to_string(),
        source: AnalysisSource::Delegated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{paper, ScriptedLlm, LONG_ABSTRACT};

    fn analyzer(llm: Arc<ScriptedLlm>) -> PaperAnalyzer {
        PaperAnalyzer::new(llm, AnalyzerConfig::default())
    }

    #[tokio::test]
    async fn test_analysis_parsed_and_clamped() {
        let llm = Arc::new(ScriptedLlm::replying(
            r#"Sure! {"relevance_score": 130,
               "main_finding": "Daily coffee was not linked to higher cardiovascular risk.",
               "key_insights": [
                 {"translated": "Coffee drinkers had no extra heart risk.", "original": "examined how daily coffee intake relates", "explanation": "Your morning cup is fine."},
                 {"translated": "", "original": "ignored", "explanation": ""}
               ],
               "methodology_note": "Cohort of 20,000 adults over ten years",
               "practical_takeaway": "Moderate coffee is fine for most adults."}"#,
        ));
        let analysis = analyzer(llm)
            .analyze(&paper("p1", "Coffee cohort", LONG_ABSTRACT), "Is coffee harmful?")
            .await;

        assert_eq!(analysis.source, AnalysisSource::Delegated);
        assert_eq!(analysis.relevance_score, 100);
        assert_eq!(analysis.key_insights.len(), 1);
        assert_eq!(analysis.key_insights[0].explanation, "Your morning cup is fine.");
    }

    #[tokio::test]
    async fn test_empty_abstract_skips_model() {
        let llm = Arc::new(ScriptedLlm::replying("{}"));
        let analysis = analyzer(llm.clone())
            .analyze(&paper("p1", "No abstract", "  "), "Is coffee harmful?")
            .await;

        assert_eq!(llm.calls(), 0);
        assert_eq!(analysis, PaperAnalysis::fallback());
    }

    #[tokio::test]
    async fn test_failure_yields_fallback() {
        let analysis = analyzer(Arc::new(ScriptedLlm::failing()))
            .analyze(&paper("p1", "Coffee cohort", LONG_ABSTRACT), "Is coffee harmful?")
            .await;
        assert_eq!(analysis.relevance_score, 50);
        assert_eq!(analysis.main_finding, "Analysis could not be completed.");

        let analysis = analyzer(Arc::new(ScriptedLlm::replying(r#"{"relevance_score": 80}"#)))
            .analyze(&paper("p1", "Coffee cohort", LONG_ABSTRACT), "Is coffee harmful?")
            .await;
        assert_eq!(analysis.source, AnalysisSource::Fallback);
    }
}
