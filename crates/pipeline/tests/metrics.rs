//! Recorded pipeline metrics
//!
//! Lives in its own test binary because it installs the global recorder.

use std::sync::Arc;

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusBuilder;
use research_agent_config::Settings;
use research_agent_core::{
    CandidatePaper, ExplanationLevel, GenerateRequest, GenerateResponse, LanguageModel,
    PaperSearch, Result,
};
use research_agent_pipeline::metrics::PIPELINE_DURATION_SECONDS;
use research_agent_pipeline::ResearchPipeline;

/// Answers every stage with a well-formed reply
struct ScriptedLlm;

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let text = if prompt.contains("Evidence strength:") {
            r#"{"summary": "Moderate coffee intake was not linked to harm.", "evidence_strength": "moderate", "evidence_description": "Several cohorts agree.", "key_points": ["No excess mortality"], "limitations": "Observational.", "related_questions": []}"#
        } else if prompt.contains("Paper title:") {
            r#"{"score": 90, "reason": "on topic"}"#
        } else {
            r#"{"queries": ["coffee mortality", "caffeine heart risk"], "terms": ["coffee"]}"#
        };
        Ok(GenerateResponse::text(text))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct OnePaper;

#[async_trait]
impl PaperSearch for OnePaper {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<CandidatePaper>> {
        Ok(vec![CandidatePaper::new(Some("p1".to_string()), "Coffee and mortality")
            .with_abstract(
                "A prospective cohort of 50,000 adults followed coffee intake and all-cause \
                 mortality for fifteen years.",
            )])
    }

    fn name(&self) -> &str {
        "one-paper"
    }
}

#[tokio::test]
async fn test_duration_recorded_for_hits_and_misses() {
    let handle = PrometheusBuilder::new().install_recorder().unwrap();
    let pipeline = ResearchPipeline::new(&Settings::default(), Arc::new(ScriptedLlm), Arc::new(OnePaper));

    let first = pipeline
        .run("Is coffee harmful to health?", ExplanationLevel::Medium)
        .await
        .unwrap();
    let second = pipeline
        .run("Is coffee harmful to health?", ExplanationLevel::Medium)
        .await
        .unwrap();
    assert!(!first.cache_hit);
    assert!(second.cache_hit);

    let rendered = handle.render();
    assert!(rendered.contains(&format!("{}_count{{cache=\"miss\"}} 1", PIPELINE_DURATION_SECONDS)));
    assert!(rendered.contains(&format!("{}_count{{cache=\"hit\"}} 1", PIPELINE_DURATION_SECONDS)));
}
