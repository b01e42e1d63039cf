//! Retrieval fan-out
//!
//! Runs every planned query concurrently against the search service, each
//! under its own timeout. A failed or timed-out query contributes nothing;
//! the batch as a whole never fails. Results are merged in plan order,
//! deduplicated by identity key and capped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use research_agent_config::{PipelineSettings, SearchSettings};
use research_agent_core::{CandidatePaper, PaperSearch, QueryPlan};

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Results requested per query
    pub per_query_limit: usize,
    /// Timeout applied to each query independently
    pub query_timeout: Duration,
    /// Maximum candidates kept after dedup
    pub candidate_cap: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self::from_settings(&SearchSettings::default(), &PipelineSettings::default())
    }
}

impl RetrieverConfig {
    pub fn from_settings(search: &SearchSettings, pipeline: &PipelineSettings) -> Self {
        Self {
            per_query_limit: search.per_query_limit,
            // Room for the adapter's own rate-limit retries
            query_timeout: search.query_budget(),
            candidate_cap: pipeline.candidate_cap,
        }
    }
}

/// Concurrent multi-query retriever
pub struct FanoutRetriever {
    search: Arc<dyn PaperSearch>,
    config: RetrieverConfig,
}

impl FanoutRetriever {
    pub fn new(search: Arc<dyn PaperSearch>, config: RetrieverConfig) -> Self {
        Self { search, config }
    }

    /// Retrieve deduplicated candidates for every query in the plan
    ///
    /// An empty result is a valid outcome, not an error.
    pub async fn retrieve(&self, plan: &QueryPlan) -> Vec<CandidatePaper> {
        let searches = plan.queries.iter().map(|query| self.search_one(query));
        let batches = join_all(searches).await;

        let total: usize = batches.iter().map(Vec::len).sum();
        let candidates = dedup_candidates(batches, self.config.candidate_cap);

        tracing::debug!(
            queries = plan.queries.len(),
            hits = total,
            candidates = candidates.len(),
            source = self.search.name(),
            "Retrieval fan-out complete"
        );
        candidates
    }

    async fn search_one(&self, query: &str) -> Vec<CandidatePaper> {
        let call = self.search.search(query, self.config.per_query_limit);
        match tokio::time::timeout(self.config.query_timeout, call).await {
            Ok(Ok(papers)) => papers,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, query, "Search query failed, skipping");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    query,
                    timeout_ms = self.config.query_timeout.as_millis() as u64,
                    "Search query timed out, skipping"
                );
                Vec::new()
            }
        }
    }
}

/// Merge batches in order, keeping the first paper per identity key
pub fn dedup_candidates<I>(batches: I, cap: usize) -> Vec<CandidatePaper>
where
    I: IntoIterator<Item = Vec<CandidatePaper>>,
{
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|paper| !paper.title.trim().is_empty())
        .filter(|paper| seen.insert(paper.identity_key()))
        .take(cap)
        .collect()
}
