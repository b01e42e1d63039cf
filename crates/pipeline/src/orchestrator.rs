//! Research Pipeline Orchestrator
//!
//! Runs one question through every stage and assembles the [`ResearchResult`].
//! The only errors it returns are input validation and rate-limit denial;
//! every upstream failure is absorbed by a stage fallback and listed in
//! `ResearchResult::fallbacks`.

use std::sync::Arc;
use std::time::Instant;

use research_agent_config::{PipelineSettings, Settings};
use research_agent_core::{
    CacheStore, CandidatePaper, Error, ExplanationLevel, LanguageModel, PaperAnalysis,
    PaperSearch, RateLimitStore, ResearchQuery, ResearchResult, ScoreSource,
};
use research_agent_rag::{
    AnalyzerConfig, FanoutRetriever, PaperAnalyzer, QueryExpander, QueryExpansionConfig, Ranker,
    RankerConfig, RelevanceScorer, RetrieverConfig, ScorerConfig, SynthesisConfig,
    SynthesisSource, Synthesizer,
};

use crate::cache::InMemoryCache;
use crate::category::detect_category;
use crate::metrics;
use crate::question::{cache_key, question_hash};
use crate::rate_limit::SlidingWindowLimiter;
use crate::PipelineError;

/// Research pipeline
pub struct ResearchPipeline {
    llm: Arc<dyn LanguageModel>,
    expander: QueryExpander,
    retriever: FanoutRetriever,
    scorer: RelevanceScorer,
    ranker: Ranker,
    synthesizer: Synthesizer,
    analyzer: PaperAnalyzer,
    cache: Option<Arc<dyn CacheStore>>,
    limiter: Option<Arc<dyn RateLimitStore>>,
    settings: PipelineSettings,
}

impl ResearchPipeline {
    /// Build every stage from settings, with in-memory cache and limiter
    /// when enabled
    pub fn new(settings: &Settings, llm: Arc<dyn LanguageModel>, search: Arc<dyn PaperSearch>) -> Self {
        let pipeline = &settings.pipeline;

        let cache: Option<Arc<dyn CacheStore>> = settings
            .cache
            .enabled
            .then(|| Arc::new(InMemoryCache::from_settings(&settings.cache)) as Arc<dyn CacheStore>);
        let limiter: Option<Arc<dyn RateLimitStore>> = settings.rate_limit.enabled.then(|| {
            Arc::new(SlidingWindowLimiter::from_settings(&settings.rate_limit)) as Arc<dyn RateLimitStore>
        });

        Self {
            expander: QueryExpander::new(
                llm.clone(),
                QueryExpansionConfig::from_settings(pipeline, &settings.llm),
            ),
            retriever: FanoutRetriever::new(
                search,
                RetrieverConfig::from_settings(&settings.search, pipeline),
            ),
            scorer: RelevanceScorer::new(llm.clone(), ScorerConfig::from_settings(pipeline, &settings.llm)),
            ranker: Ranker::new(RankerConfig::from_settings(pipeline)),
            synthesizer: Synthesizer::new(
                llm.clone(),
                SynthesisConfig::from_settings(pipeline, &settings.llm),
            ),
            analyzer: PaperAnalyzer::new(llm.clone(), AnalyzerConfig::from_settings(&settings.llm)),
            llm,
            cache,
            limiter,
            settings: pipeline.clone(),
        }
    }

    /// Replace the result cache (e.g. with an external store)
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the rate limiter
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimitStore>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Override ranking parameters
    pub fn with_ranker(mut self, config: RankerConfig) -> Self {
        self.ranker = Ranker::new(config);
        self
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheStore>> {
        self.cache.as_ref()
    }

    /// Drop expired cache entries and idle rate windows
    ///
    /// Returns (purged cache entries, idle clients forgotten).
    pub async fn sweep_stores(&self) -> (usize, usize) {
        let purged = match &self.cache {
            Some(cache) => cache.purge_expired().await,
            None => 0,
        };
        let idle = match &self.limiter {
            Some(limiter) => limiter.sweep_idle().await,
            None => 0,
        };
        (purged, idle)
    }

    pub async fn llm_available(&self) -> bool {
        self.llm.is_available().await
    }

    /// Admission check for a client; always admits when limiting is disabled
    pub async fn admit(&self, client_key: &str) -> bool {
        let Some(limiter) = &self.limiter else {
            return true;
        };
        let admitted = limiter.admit(client_key).await;
        if !admitted {
            metrics::record_rate_limited();
            tracing::warn!(client = client_key, "Rate limit exceeded");
        }
        admitted
    }

    /// Validate raw input against the configured length bounds
    pub fn validate(&self, question: &str, level: ExplanationLevel) -> Result<ResearchQuery, PipelineError> {
        ResearchQuery::new(
            question,
            level,
            self.settings.question_min_chars,
            self.settings.question_max_chars,
        )
        .map_err(PipelineError::from)
    }

    /// Rate-limited [`run`](Self::run)
    pub async fn run_for_client(
        &self,
        client_key: &str,
        question: &str,
        level: ExplanationLevel,
    ) -> Result<ResearchResult, PipelineError> {
        if !self.admit(client_key).await {
            return Err(PipelineError::RateLimited);
        }
        self.run(question, level).await
    }

    /// Answer a research question
    pub async fn run(&self, question: &str, level: ExplanationLevel) -> Result<ResearchResult, PipelineError> {
        let start = Instant::now();
        metrics::record_request();

        let query = self.validate(question, level)?;
        let hash = question_hash(query.normalized());
        let key = cache_key(&hash, level);

        if let Some(cache) = &self.cache {
            if let Some(mut cached) = cache.get(&key).await {
                metrics::record_cache_hit();
                tracing::info!(question_hash = %hash, %level, "Cache hit");
                cached.cache_hit = true;
                metrics::record_duration(start.elapsed(), true);
                return Ok(cached);
            }
        }

        let mut fallbacks: Vec<String> = Vec::new();

        let plan = self.expander.expand(query.text()).await;
        if plan.heuristic {
            fallbacks.push("query_expansion".to_string());
        }

        let candidates = self.retriever.retrieve(&plan).await;
        if candidates.is_empty() {
            fallbacks.push(Error::NoCandidatesFound.kind().to_string());
        }

        let scored = self.scorer.score(candidates, query.text()).await;
        if scored.iter().any(|p| p.score_source == ScoreSource::LexicalFallback) {
            fallbacks.push("scoring:lexical".to_string());
        }
        let scored_count = scored.len();

        let ranking = self.ranker.rank(scored);
        if ranking.papers.is_empty() && scored_count > 0 {
            fallbacks.push(Error::NoRelevantCandidates.kind().to_string());
        }

        let synthesis = self.synthesizer.synthesize(query.text(), &ranking.papers, level).await;
        match synthesis.source {
            SynthesisSource::Fallback => fallbacks.push("synthesis".to_string()),
            SynthesisSource::Inconclusive => fallbacks.push("synthesis:inconclusive".to_string()),
            SynthesisSource::Delegated | SynthesisSource::NoEvidence => {}
        }

        let paper_count = ranking.papers.len();
        let mut papers = ranking.papers;
        papers.truncate(self.settings.display_limit);

        let result = ResearchResult {
            question: query.text().to_string(),
            question_hash: hash,
            level,
            category: detect_category(query.text()),
            synthesis: synthesis.result.clone(),
            papers,
            paper_count,
            cache_hit: false,
            fallbacks,
        };

        if synthesis.is_cacheable() {
            if let Some(cache) = &self.cache {
                cache.set(&key, result.clone()).await;
            }
        }

        for component in &result.fallbacks {
            metrics::record_fallback(component);
        }
        metrics::record_duration(start.elapsed(), false);

        tracing::info!(
            question_hash = %result.question_hash,
            %level,
            queries = plan.queries.len(),
            scored = scored_count,
            papers = paper_count,
            relaxed = ranking.relaxed,
            evidence = %result.synthesis.evidence_strength,
            fallbacks = ?result.fallbacks,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Research pipeline complete"
        );

        Ok(result)
    }

    /// Rate-limited [`analyze_paper`](Self::analyze_paper) with the same
    /// question bounds as [`run`](Self::run)
    pub async fn analyze_paper_for_client(
        &self,
        client_key: &str,
        paper: &CandidatePaper,
        question: &str,
    ) -> Result<PaperAnalysis, PipelineError> {
        if !self.admit(client_key).await {
            return Err(PipelineError::RateLimited);
        }
        let query = self.validate(question, ExplanationLevel::default())?;
        self.validate_paper(paper)?;
        Ok(self.analyze_paper(paper, query.text()).await)
    }

    /// Bound the caller-supplied paper text that goes into the analysis prompt
    pub fn validate_paper(&self, paper: &CandidatePaper) -> Result<(), PipelineError> {
        let title_len = paper.title.trim().chars().count();
        if title_len == 0 {
            return Err(PipelineError::InvalidRequest("paper title is required".to_string()));
        }
        if title_len > self.settings.question_max_chars {
            return Err(PipelineError::InvalidRequest(format!(
                "paper title must be at most {} characters",
                self.settings.question_max_chars
            )));
        }
        if paper.abstract_str().chars().count() > self.settings.abstract_max_chars {
            return Err(PipelineError::InvalidRequest(format!(
                "paper abstract must be at most {} characters",
                self.settings.abstract_max_chars
            )));
        }
        Ok(())
    }

    /// Deep breakdown of one paper against a question; never fails
    pub async fn analyze_paper(&self, paper: &CandidatePaper, question: &str) -> PaperAnalysis {
        let analysis = self.analyzer.analyze(paper, question).await;
        if analysis.source == research_agent_core::AnalysisSource::Fallback {
            metrics::record_fallback("paper_analysis");
        }
        analysis
    }
}
