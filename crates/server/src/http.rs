//! HTTP Endpoints
//!
//! REST API for the research agent.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Json, State},
    http::{HeaderMap, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use research_agent_config::ServerConfig;
use research_agent_core::{
    CandidatePaper, Category, DisplayPaper, ExplanationLevel, PaperAnalysis, ResearchResult,
    SynthesisResult,
};

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.settings.server;
    let cors_layer = build_cors_layer(server);
    let timeout = state.settings.request_timeout();
    if timeout > Duration::from_secs(server.timeout_seconds) {
        tracing::info!(
            configured_secs = server.timeout_seconds,
            effective_secs = timeout.as_secs(),
            "Request timeout raised to cover the research stage budgets"
        );
    }

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/research", post(research))
        .route("/api/paper/analyze", post(analyze_paper))
        .route("/metrics", get(metrics_handler))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    let router = match cors_layer {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.with_state(state)
}

/// CORS from configured origins; any origin when the list is empty
fn build_cors_layer(server: &ServerConfig) -> Option<CorsLayer> {
    if !server.cors_enabled {
        return None;
    }

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if server.cors_origins.is_empty() {
        return Some(base.allow_origin(Any));
    }

    let parsed_origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin = %origin, "Invalid CORS origin");
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::error!("All configured CORS origins are invalid, CORS requests will be refused");
    } else {
        tracing::info!("CORS configured with {} origins", parsed_origins.len());
    }
    Some(base.allow_origin(parsed_origins))
}

/// Rate-limit key: first `X-Forwarded-For` hop, else the peer address
fn client_key(headers: &HeaderMap, remote: Option<SocketAddr>, trust_forwarded: bool) -> String {
    let forwarded = trust_forwarded
        .then(|| headers.get("x-forwarded-for"))
        .flatten()
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    match forwarded {
        Some(hop) => hop.to_string(),
        None => remote
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "llm_available": state.pipeline.llm_available().await,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct ResearchRequest {
    question: String,
    #[serde(default)]
    level: Option<String>,
}

/// Research answer as returned to clients
#[derive(Debug, Serialize)]
struct ResearchResponse {
    question: String,
    question_hash: String,
    level: ExplanationLevel,
    category: Category,
    category_label: &'static str,
    #[serde(flatten)]
    synthesis: SynthesisResult,
    papers: Vec<DisplayPaper>,
    paper_count: usize,
    cache_hit: bool,
    fallbacks: Vec<String>,
}

impl From<ResearchResult> for ResearchResponse {
    fn from(result: ResearchResult) -> Self {
        Self {
            papers: result.papers.iter().map(DisplayPaper::from).collect(),
            question: result.question,
            question_hash: result.question_hash,
            level: result.level,
            category: result.category,
            category_label: result.category.label(),
            synthesis: result.synthesis,
            paper_count: result.paper_count,
            cache_hit: result.cache_hit,
            fallbacks: result.fallbacks,
        }
    }
}

async fn research(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Json<ResearchResponse>, ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let level = match request.level.as_deref() {
        None => ExplanationLevel::default(),
        Some(raw) => raw
            .parse::<ExplanationLevel>()
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?,
    };

    let client = client_key(
        &headers,
        connect.map(|ConnectInfo(addr)| addr),
        state.settings.server.trust_forwarded_for,
    );

    let result = state
        .pipeline
        .run_for_client(&client, &request.question, level)
        .await?;
    Ok(Json(ResearchResponse::from(result)))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    paper_id: String,
    paper_title: String,
    #[serde(default)]
    paper_abstract: Option<String>,
    question: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    success: bool,
    paper_id: String,
    analysis: PaperAnalysis,
}

async fn analyze_paper(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;

    let client = client_key(
        &headers,
        connect.map(|ConnectInfo(addr)| addr),
        state.settings.server.trust_forwarded_for,
    );

    let id = (!request.paper_id.trim().is_empty()).then(|| request.paper_id.clone());
    let paper = CandidatePaper::new(id, request.paper_title.trim())
        .with_abstract(request.paper_abstract.unwrap_or_default());

    let analysis = state
        .pipeline
        .analyze_paper_for_client(&client, &paper, &request.question)
        .await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        paper_id: request.paper_id,
        analysis,
    }))
}
