//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{budgets, endpoints, limits, models, pipeline, timeouts};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Completion service configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Bibliographic search configuration
    #[serde(default)]
    pub search: SearchSettings,

    /// Pipeline thresholds and caps
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Result cache
    #[serde(default)]
    pub cache: CacheSettings,

    /// Per-client admission control
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Worst-case wall time of one research request
    ///
    /// Expansion and synthesis are one completion each, scoring is one
    /// completion per sequential batch, and retrieval fans out so a single
    /// search budget covers it.
    pub fn research_budget(&self) -> Duration {
        let batch = self.pipeline.score_batch_size.max(1);
        let scoring_batches = self.pipeline.candidate_cap.div_ceil(batch) as u32;
        let completions = 2 + scoring_batches;

        Duration::from_secs(self.llm.timeout_secs) * completions
            + self.search.query_budget()
            + Duration::from_secs(timeouts::RESEARCH_SLACK_SECS)
    }

    /// HTTP request timeout: the configured value, raised to the research
    /// budget so a degraded request still returns its fallback answer
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_seconds).max(self.research_budget())
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_llm()?;
        self.validate_search()?;
        self.validate_pipeline()?;
        self.validate_cache()?;
        self.validate_rate_limit()?;

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            });
        }

        if llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_secs".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        let budgets = [
            ("llm.expansion_tokens", llm.expansion_tokens),
            ("llm.scoring_tokens", llm.scoring_tokens),
            ("llm.synthesis_tokens", llm.synthesis_tokens),
            ("llm.analysis_tokens", llm.analysis_tokens),
        ];
        for (field, value) in budgets {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "Token budget must be positive".to_string(),
                });
            }
        }

        Ok(())
    }

    fn validate_search(&self) -> Result<(), ConfigError> {
        let search = &self.search;

        if search.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField("search.endpoint".to_string()));
        }

        if search.per_query_limit == 0 || search.per_query_limit > 100 {
            return Err(ConfigError::InvalidValue {
                field: "search.per_query_limit".to_string(),
                message: format!("Must be between 1 and 100, got {}", search.per_query_limit),
            });
        }

        if search.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.timeout_secs".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    fn validate_pipeline(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;

        if p.min_queries == 0 || p.min_queries > p.max_queries {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.min_queries".to_string(),
                message: format!(
                    "Must be between 1 and max_queries ({}), got {}",
                    p.max_queries, p.min_queries
                ),
            });
        }

        if p.max_queries > pipeline::MAX_QUERIES {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.max_queries".to_string(),
                message: format!(
                    "At most {} queries are supported, got {}",
                    pipeline::MAX_QUERIES,
                    p.max_queries
                ),
            });
        }

        if p.score_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.score_batch_size".to_string(),
                message: "Batch size must be at least 1".to_string(),
            });
        }

        if p.candidate_cap == 0 || p.top_k == 0 || p.display_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.candidate_cap".to_string(),
                message: "candidate_cap, top_k and display_limit must be positive".to_string(),
            });
        }

        if p.relevance_threshold > 100 || p.relaxed_threshold > p.relevance_threshold {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.relaxed_threshold".to_string(),
                message: format!(
                    "Need relaxed ({}) <= relevance ({}) <= 100",
                    p.relaxed_threshold, p.relevance_threshold
                ),
            });
        }

        if p.short_abstract_score > 100 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.short_abstract_score".to_string(),
                message: format!("Must be at most 100, got {}", p.short_abstract_score),
            });
        }

        if p.abstract_max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.abstract_max_chars".to_string(),
                message: "Must be positive".to_string(),
            });
        }

        if p.question_min_chars == 0 || p.question_min_chars > p.question_max_chars {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.question_min_chars".to_string(),
                message: format!(
                    "Need 0 < min ({}) <= max ({})",
                    p.question_min_chars, p.question_max_chars
                ),
            });
        }

        Ok(())
    }

    fn validate_cache(&self) -> Result<(), ConfigError> {
        if self.cache.enabled && self.cache.ttl_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl_hours".to_string(),
                message: "TTL must be at least 1 hour when caching is enabled".to_string(),
            });
        }

        Ok(())
    }

    fn validate_rate_limit(&self) -> Result<(), ConfigError> {
        let rl = &self.rate_limit;

        if rl.enabled && (rl.max_requests == 0 || rl.window_secs == 0) {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit".to_string(),
                message: "max_requests and window_secs must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Trust the first hop of X-Forwarded-For as the client key
    #[serde(default = "default_true")]
    pub trust_forwarded_for: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    timeouts::REQUEST_SECS
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_request_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            trust_forwarded_for: true,
        }
    }
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider: openai, azure, claude, local
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (deployment name for Azure); provider default when absent
    #[serde(default)]
    pub model: Option<String>,

    /// Endpoint override; provider default when absent
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key; falls back to the provider's environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// Azure API version
    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-call timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Retries for network/timeout/5xx failures
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,

    #[serde(default = "default_expansion_tokens")]
    pub expansion_tokens: u32,

    #[serde(default = "default_scoring_tokens")]
    pub scoring_tokens: u32,

    #[serde(default = "default_synthesis_tokens")]
    pub synthesis_tokens: u32,

    #[serde(default = "default_analysis_tokens")]
    pub analysis_tokens: u32,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_llm_timeout() -> u64 {
    timeouts::LLM_SECS
}
fn default_llm_retries() -> u32 {
    1
}
fn default_expansion_tokens() -> u32 {
    budgets::EXPANSION_TOKENS
}
fn default_scoring_tokens() -> u32 {
    budgets::SCORING_TOKENS
}
fn default_synthesis_tokens() -> u32 {
    budgets::SYNTHESIS_TOKENS
}
fn default_analysis_tokens() -> u32 {
    budgets::ANALYSIS_TOKENS
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            endpoint: None,
            api_key: None,
            api_version: None,
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
            expansion_tokens: default_expansion_tokens(),
            scoring_tokens: default_scoring_tokens(),
            synthesis_tokens: default_synthesis_tokens(),
            analysis_tokens: default_analysis_tokens(),
        }
    }
}

impl LlmSettings {
    /// Environment variable holding the key for this provider
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self.provider.to_lowercase().as_str() {
            "openai" | "gpt" => Some("OPENAI_API_KEY"),
            "azure" | "azure-openai" => Some("AZURE_OPENAI_API_KEY"),
            "claude" | "anthropic" => Some("ANTHROPIC_API_KEY"),
            _ => None,
        }
    }

    /// Configured model, else the provider default
    pub fn resolved_model(&self) -> String {
        if let Some(model) = self.model.as_ref().filter(|m| !m.trim().is_empty()) {
            return model.clone();
        }
        match self.provider.to_lowercase().as_str() {
            "claude" | "anthropic" => models::ANTHROPIC_DEFAULT.to_string(),
            "local" | "ollama" | "vllm" => models::LOCAL_DEFAULT.to_string(),
            _ => models::OPENAI_DEFAULT.to_string(),
        }
    }

    /// Configured key, else the provider's environment variable
    ///
    /// Empty values count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.api_key_env_var()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.trim().is_empty())
            })
    }

    /// Endpoint override, else the provider default
    pub fn resolved_endpoint(&self) -> String {
        if let Some(endpoint) = self.endpoint.as_ref().filter(|e| !e.trim().is_empty()) {
            return endpoint.clone();
        }
        match self.provider.to_lowercase().as_str() {
            "claude" | "anthropic" => endpoints::ANTHROPIC_DEFAULT.to_string(),
            "local" | "ollama" | "vllm" => endpoints::LOCAL_DEFAULT.to_string(),
            _ => endpoints::OPENAI_DEFAULT.to_string(),
        }
    }
}

/// Bibliographic search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Optional partner key, sent as `x-api-key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-query timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Records requested per query
    #[serde(default = "default_per_query_limit")]
    pub per_query_limit: usize,

    /// Retries on HTTP 429
    #[serde(default = "default_search_retries")]
    pub max_retries: u32,

    /// Linear backoff step: attempt n waits n * step
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl SearchSettings {
    /// Time one query may take including its backoff waits
    ///
    /// Retry n waits n * step, so all retries together wait
    /// step * n(n+1)/2 on top of the request timeout.
    pub fn query_budget(&self) -> Duration {
        let n = u64::from(self.max_retries);
        Duration::from_secs(self.timeout_secs)
            + Duration::from_millis(self.retry_backoff_ms * n * (n + 1) / 2)
    }
}

fn default_search_endpoint() -> String {
    endpoints::SEMANTIC_SCHOLAR_DEFAULT.to_string()
}
fn default_search_timeout() -> u64 {
    timeouts::SEARCH_SECS
}
fn default_per_query_limit() -> usize {
    10
}
fn default_search_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    1000
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key: None,
            timeout_secs: default_search_timeout(),
            per_query_limit: default_per_query_limit(),
            max_retries: default_search_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Pipeline thresholds and caps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Fewest queries a plan may hold
    #[serde(default = "default_min_queries")]
    pub min_queries: usize,

    /// Most queries a plan may hold
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,

    /// Fewer model-suggested queries than this triggers the heuristic
    #[serde(default = "default_min_llm_queries")]
    pub min_llm_queries: usize,

    /// Post-dedup candidate cap
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,

    #[serde(default = "default_score_batch_size")]
    pub score_batch_size: usize,

    #[serde(default = "default_min_abstract_chars")]
    pub min_abstract_chars: usize,

    #[serde(default = "default_short_abstract_score")]
    pub short_abstract_score: u8,

    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: u8,

    #[serde(default = "default_relaxed_threshold")]
    pub relaxed_threshold: u8,

    /// Papers older than this many years get no recency bonus
    #[serde(default = "default_recency_cutoff_years")]
    pub recency_cutoff_years: i32,

    /// Papers passed to synthesis
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Papers returned to the caller
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,

    #[serde(default = "default_question_min_chars")]
    pub question_min_chars: usize,

    /// Also bounds paper titles sent for analysis
    #[serde(default = "default_question_max_chars")]
    pub question_max_chars: usize,

    /// Longest abstract accepted for single-paper analysis
    #[serde(default = "default_abstract_max_chars")]
    pub abstract_max_chars: usize,
}

fn default_min_queries() -> usize {
    1
}
fn default_max_queries() -> usize {
    pipeline::MAX_QUERIES
}
fn default_min_llm_queries() -> usize {
    2
}
fn default_candidate_cap() -> usize {
    pipeline::CANDIDATE_CAP
}
fn default_score_batch_size() -> usize {
    pipeline::SCORE_BATCH_SIZE
}
fn default_min_abstract_chars() -> usize {
    pipeline::MIN_ABSTRACT_CHARS
}
fn default_short_abstract_score() -> u8 {
    pipeline::SHORT_ABSTRACT_SCORE
}
fn default_relevance_threshold() -> u8 {
    pipeline::RELEVANCE_THRESHOLD
}
fn default_relaxed_threshold() -> u8 {
    pipeline::RELAXED_THRESHOLD
}
fn default_recency_cutoff_years() -> i32 {
    pipeline::RECENCY_CUTOFF_YEARS
}
fn default_top_k() -> usize {
    pipeline::SYNTHESIS_TOP_K
}
fn default_display_limit() -> usize {
    10
}
fn default_question_min_chars() -> usize {
    pipeline::QUESTION_MIN_CHARS
}
fn default_question_max_chars() -> usize {
    pipeline::QUESTION_MAX_CHARS
}
fn default_abstract_max_chars() -> usize {
    pipeline::ABSTRACT_MAX_CHARS
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_queries: default_min_queries(),
            max_queries: default_max_queries(),
            min_llm_queries: default_min_llm_queries(),
            candidate_cap: default_candidate_cap(),
            score_batch_size: default_score_batch_size(),
            min_abstract_chars: default_min_abstract_chars(),
            short_abstract_score: default_short_abstract_score(),
            relevance_threshold: default_relevance_threshold(),
            relaxed_threshold: default_relaxed_threshold(),
            recency_cutoff_years: default_recency_cutoff_years(),
            top_k: default_top_k(),
            display_limit: default_display_limit(),
            question_min_chars: default_question_min_chars(),
            question_max_chars: default_question_max_chars(),
            abstract_max_chars: default_abstract_max_chars(),
        }
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_hours")]
    pub ttl_hours: u64,

    /// Oldest entries are evicted past this size
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

fn default_cache_ttl_hours() -> u64 {
    limits::CACHE_TTL_HOURS
}
fn default_cache_max_entries() -> usize {
    limits::CACHE_MAX_ENTRIES
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: default_cache_ttl_hours(),
            max_entries: default_cache_max_entries(),
        }
    }
}

/// Sliding-window rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests admitted per client per window
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> usize {
    limits::RATE_LIMIT_MAX_REQUESTS
}
fn default_window_secs() -> u64 {
    limits::RATE_LIMIT_WINDOW_SECS
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Expose Prometheus metrics on /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Sources, later overriding earlier:
/// 1. `config/default.{toml,yaml,json}`
/// 2. `config/{env}.{toml,yaml,json}`
/// 3. `RESEARCH_AGENT__*` environment variables (e.g. `RESEARCH_AGENT__SERVER__PORT`)
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("RESEARCH_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

/// Load settings from one explicit file
pub fn load_settings_from_file(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config = Config::builder()
        .add_source(File::from(path))
        .build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.pipeline.relevance_threshold, 35);
        assert_eq!(settings.pipeline.relaxed_threshold, 25);
        assert_eq!(settings.pipeline.score_batch_size, 10);
        assert_eq!(settings.pipeline.top_k, 12);
        assert_eq!(settings.rate_limit.max_requests, 15);
        assert_eq!(settings.llm.resolved_model(), "gpt-4o-mini");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_pipeline_validation() {
        let mut settings = Settings::default();
        settings.pipeline.relaxed_threshold = 50;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "pipeline.relaxed_threshold"
        ));

        let mut settings = Settings::default();
        settings.pipeline.score_batch_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.pipeline.max_queries = 12;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_llm_validation() {
        let mut settings = Settings::default();
        settings.llm.temperature = 3.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.llm.synthesis_tokens = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rate_limit_validation() {
        let mut settings = Settings::default();
        settings.rate_limit.max_requests = 0;
        assert!(settings.validate().is_err());

        settings.rate_limit.enabled = false;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_resolved_endpoint() {
        let mut llm = LlmSettings::default();
        assert_eq!(llm.resolved_endpoint(), endpoints::OPENAI_DEFAULT);

        llm.provider = "claude".to_string();
        assert_eq!(llm.resolved_endpoint(), endpoints::ANTHROPIC_DEFAULT);

        llm.endpoint = Some("http://localhost:9000/v1".to_string());
        assert_eq!(llm.resolved_endpoint(), "http://localhost:9000/v1");
    }

    #[test]
    fn test_model_defaults_follow_provider() {
        let mut llm = LlmSettings::default();
        assert_eq!(llm.resolved_model(), models::OPENAI_DEFAULT);

        llm.provider = "claude".to_string();
        assert_eq!(llm.resolved_model(), models::ANTHROPIC_DEFAULT);

        llm.provider = "ollama".to_string();
        assert_eq!(llm.resolved_model(), models::LOCAL_DEFAULT);

        llm.model = Some("sonnet".to_string());
        assert_eq!(llm.resolved_model(), "sonnet");
    }

    #[test]
    fn test_azure_key_var_for_both_spellings() {
        let mut llm = LlmSettings {
            provider: "azure".to_string(),
            ..Default::default()
        };
        assert_eq!(llm.api_key_env_var(), Some("AZURE_OPENAI_API_KEY"));

        llm.provider = "Azure-OpenAI".to_string();
        assert_eq!(llm.api_key_env_var(), Some("AZURE_OPENAI_API_KEY"));

        llm.provider = "local".to_string();
        assert_eq!(llm.api_key_env_var(), None);
    }

    #[test]
    fn test_search_budget_sums_linear_backoff() {
        let search = SearchSettings::default();
        // 30s request + 1s + 2s + 3s of backoff
        assert_eq!(search.query_budget(), Duration::from_secs(36));

        let no_retries = SearchSettings {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(no_retries.query_budget(), Duration::from_secs(30));
    }

    #[test]
    fn test_request_timeout_covers_research_budget() {
        let settings = Settings::default();
        // 2 + 4 scoring batches of 60s, 36s search, 5s slack
        assert_eq!(settings.research_budget(), Duration::from_secs(401));
        assert_eq!(settings.request_timeout(), settings.research_budget());

        let mut generous = Settings::default();
        generous.server.timeout_seconds = 900;
        assert_eq!(generous.request_timeout(), Duration::from_secs(900));

        let mut small = Settings::default();
        small.llm.timeout_secs = 5;
        small.pipeline.candidate_cap = 10;
        assert_eq!(small.research_budget(), Duration::from_secs(5 * 3 + 36 + 5));
        assert_eq!(small.request_timeout(), Duration::from_secs(180));
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let llm = LlmSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(llm.resolved_api_key().as_deref(), Some("sk-test"));

        let local = LlmSettings {
            provider: "local".to_string(),
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(local.api_key_env_var().is_none());
        assert!(local.resolved_api_key().is_none());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9001

[pipeline]
relevance_threshold = 40
relaxed_threshold = 30

[rate_limit]
max_requests = 5
window_secs = 10
"#
        )
        .unwrap();

        let settings = load_settings_from_file(file.path()).unwrap();
        assert_eq!(settings.server.port, 9001);
        assert_eq!(settings.pipeline.relevance_threshold, 40);
        assert_eq!(settings.pipeline.top_k, 12);
        assert_eq!(settings.rate_limit.max_requests, 5);
    }

    #[test]
    fn test_load_invalid_file_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "pipeline:\n  score_batch_size: 0\n").unwrap();

        assert!(load_settings_from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = load_settings_from_file(Path::new("/nonexistent/research.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
