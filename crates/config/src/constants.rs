//! Centralized constants for the research agent
//!
//! Single source of truth for default values. Settings defaults, prompt
//! budgets and tests all read from here.

/// External service endpoints
pub mod endpoints {
    /// OpenAI chat completions base URL
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// Anthropic messages base URL
    pub const ANTHROPIC_DEFAULT: &str = "https://api.anthropic.com";

    /// Local OpenAI-compatible server (Ollama)
    pub const LOCAL_DEFAULT: &str = "http://localhost:11434/v1";

    /// Semantic Scholar Graph API
    pub const SEMANTIC_SCHOLAR_DEFAULT: &str = "https://api.semanticscholar.org/graph/v1";
}

/// Default model per completion provider
pub mod models {
    pub const OPENAI_DEFAULT: &str = "gpt-4o-mini";

    /// Resolved to a full Anthropic model id by the Claude backend
    pub const ANTHROPIC_DEFAULT: &str = "haiku";

    pub const LOCAL_DEFAULT: &str = "llama3";
}

/// Timeouts for outbound calls
pub mod timeouts {
    /// Completion call timeout (seconds)
    pub const LLM_SECS: u64 = 60;

    /// Single search query timeout (seconds)
    pub const SEARCH_SECS: u64 = 30;

    /// HTTP request timeout for the whole research request (seconds);
    /// raised to the research budget when that is longer
    pub const REQUEST_SECS: u64 = 180;

    /// Headroom over the summed stage budgets for local work (seconds)
    pub const RESEARCH_SLACK_SECS: u64 = 5;
}

/// Completion token budgets per pipeline stage
pub mod budgets {
    pub const EXPANSION_TOKENS: u32 = 400;
    pub const SCORING_TOKENS: u32 = 150;
    pub const SYNTHESIS_TOKENS: u32 = 2000;
    pub const ANALYSIS_TOKENS: u32 = 1500;
}

/// Pipeline thresholds
pub mod pipeline {
    /// Minimum relevance kept by the ranker
    pub const RELEVANCE_THRESHOLD: u8 = 35;

    /// Threshold used once when the strict filter leaves nothing
    pub const RELAXED_THRESHOLD: u8 = 25;

    /// Candidates per scoring batch
    pub const SCORE_BATCH_SIZE: usize = 10;

    /// Papers passed to the synthesizer
    pub const SYNTHESIS_TOP_K: usize = 12;

    /// Post-dedup candidate cap
    pub const CANDIDATE_CAP: usize = 40;

    /// Upper bound on expanded queries
    pub const MAX_QUERIES: usize = 8;

    /// Abstracts shorter than this are not sent for scoring
    pub const MIN_ABSTRACT_CHARS: usize = 50;

    /// Score given to candidates without a usable abstract
    pub const SHORT_ABSTRACT_SCORE: u8 = 15;

    /// Publications older than this get no recency bonus
    pub const RECENCY_CUTOFF_YEARS: i32 = 10;

    /// Question length bounds (characters)
    pub const QUESTION_MIN_CHARS: usize = 10;
    pub const QUESTION_MAX_CHARS: usize = 500;

    /// Longest abstract accepted for single-paper analysis (characters)
    pub const ABSTRACT_MAX_CHARS: usize = 10_000;
}

/// Cache and admission control
pub mod limits {
    pub const CACHE_TTL_HOURS: u64 = 24;
    pub const CACHE_MAX_ENTRIES: usize = 1000;
    pub const RATE_LIMIT_MAX_REQUESTS: usize = 15;
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;
}
