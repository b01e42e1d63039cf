//! Semantic Scholar Graph API client
//!
//! `GET {endpoint}/paper/search?query=..&limit=..&fields=..`
//!
//! HTTP 429 responses are retried a bounded number of times with linear
//! backoff (attempt n waits n * step). Any other failure is returned at once.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use research_agent_config::SearchSettings;
use research_agent_core::{CandidatePaper, PaperSearch, Result};

use crate::SearchError;

/// Fields requested for every search hit
const SEARCH_FIELDS: &str = "paperId,title,abstract,year,citationCount,authors,url,venue,openAccessPdf";

/// Client configuration
#[derive(Debug, Clone)]
pub struct SemanticScholarConfig {
    pub endpoint: String,
    /// Partner API key, sent as `x-api-key`
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Retries after an HTTP 429
    pub max_retries: u32,
    /// Linear backoff step
    pub retry_backoff: Duration,
}

impl Default for SemanticScholarConfig {
    fn default() -> Self {
        Self::from(&SearchSettings::default())
    }
}

impl From<&SearchSettings> for SemanticScholarConfig {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }
}

/// Semantic Scholar search client
pub struct SemanticScholarClient {
    client: Client,
    config: SemanticScholarConfig,
}

impl SemanticScholarClient {
    pub fn new(config: SemanticScholarConfig) -> std::result::Result<Self, SearchError> {
        if config.endpoint.trim().is_empty() {
            return Err(SearchError::Configuration("search endpoint is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn search_url(&self) -> String {
        format!("{}/paper/search", self.config.endpoint.trim_end_matches('/'))
    }

    /// Execute a single request (used by retry logic)
    async fn execute_search(
        &self,
        query: &str,
        limit: usize,
    ) -> std::result::Result<SearchResponse, SearchError> {
        let limit = limit.to_string();
        let mut request = self.client.get(self.search_url()).query(&[
            ("query", query),
            ("limit", limit.as_str()),
            ("fields", SEARCH_FIELDS),
        ]);
        if let Some(ref key) = self.config.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SearchError::Parse(e.to_string()))
    }

    /// Search with bounded retries on rate limiting
    pub async fn search_papers(
        &self,
        query: &str,
        limit: usize,
    ) -> std::result::Result<Vec<CandidatePaper>, SearchError> {
        let response = retry_on_rate_limit(self.config.max_retries, self.config.retry_backoff, || {
            self.execute_search(query, limit)
        })
        .await?;

        let papers: Vec<CandidatePaper> = response
            .data
            .into_iter()
            .filter_map(S2Paper::into_candidate)
            .collect();

        tracing::debug!(query, results = papers.len(), "Semantic Scholar search complete");
        Ok(papers)
    }
}

fn is_rate_limited(error: &SearchError) -> bool {
    matches!(error, SearchError::Http { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS.as_u16())
}

/// Retry `op` while it reports HTTP 429, waiting `attempt * step` between tries
async fn retry_on_rate_limit<T, F, Fut>(
    max_retries: u32,
    step: Duration,
    mut op: F,
) -> std::result::Result<T, SearchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, SearchError>>,
{
    for attempt in 0..=max_retries {
        if attempt > 0 {
            let wait = step * attempt;
            tracing::warn!(
                "Search rate limited, retrying in {:?} (attempt {}/{})",
                wait,
                attempt,
                max_retries
            );
            tokio::time::sleep(wait).await;
        }

        match op().await {
            Err(e) if is_rate_limited(&e) => continue,
            other => return other,
        }
    }

    Err(SearchError::RateLimitExceeded {
        attempts: max_retries + 1,
    })
}

#[async_trait]
impl PaperSearch for SemanticScholarClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CandidatePaper>> {
        self.search_papers(query, limit).await.map_err(Into::into)
    }

    fn name(&self) -> &str {
        "semantic_scholar"
    }
}

// Semantic Scholar API types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    #[serde(default)]
    paper_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    citation_count: Option<u32>,
    #[serde(default)]
    authors: Vec<S2Author>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    open_access_pdf: Option<OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    #[serde(default)]
    url: Option<String>,
}

impl S2Paper {
    /// Convert to a candidate; hits without a title are dropped
    fn into_candidate(self) -> Option<CandidatePaper> {
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;

        Some(CandidatePaper {
            id: self.paper_id.filter(|id| !id.trim().is_empty()),
            title,
            abstract_text: self.abstract_text.filter(|a| !a.trim().is_empty()),
            year: self.year,
            citation_count: self.citation_count.unwrap_or(0),
            venue: self.venue.filter(|v| !v.is_empty()),
            authors: self
                .authors
                .into_iter()
                .filter_map(|a| a.name)
                .filter(|n| !n.trim().is_empty())
                .collect(),
            url: self.url,
            pdf_url: self.open_access_pdf.and_then(|pdf| pdf.url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rate_limited() -> SearchError {
        SearchError::Http {
            status: 429,
            body: "Too Many Requests".to_string(),
        }
    }

    #[test]
    fn test_config_from_settings() {
        let settings = SearchSettings {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        let config = SemanticScholarConfig::from(&settings);
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_search_url() {
        let config = SemanticScholarConfig {
            endpoint: "https://api.semanticscholar.org/graph/v1/".to_string(),
            ..Default::default()
        };
        let client = SemanticScholarClient::new(config).unwrap();
        assert_eq!(
            client.search_url(),
            "https://api.semanticscholar.org/graph/v1/paper/search"
        );
        assert_eq!(client.name(), "semantic_scholar");
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let config = SemanticScholarConfig {
            endpoint: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            SemanticScholarClient::new(config),
            Err(SearchError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "total": 3,
            "offset": 0,
            "data": [
                {
                    "paperId": "abc123",
                    "title": "Coffee consumption and health: umbrella review",
                    "abstract": "Coffee consumption was more often associated with benefit than harm.",
                    "year": 2017,
                    "citationCount": 812,
                    "venue": "BMJ",
                    "url": "https://www.semanticscholar.org/paper/abc123",
                    "authors": [{"authorId": "1", "name": "R. Poole"}, {"authorId": "2", "name": null}],
                    "openAccessPdf": {"url": "https://example.org/poole.pdf", "status": "GREEN"}
                },
                {"paperId": "def456", "title": null},
                {"paperId": "", "title": "Caffeine and sleep", "abstract": "", "citationCount": null, "openAccessPdf": null}
            ]
        }"#;

        let response: SearchResponse = serde_json::from_str(body).unwrap();
        let papers: Vec<CandidatePaper> = response
            .data
            .into_iter()
            .filter_map(S2Paper::into_candidate)
            .collect();

        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].id.as_deref(), Some("abc123"));
        assert_eq!(papers[0].citation_count, 812);
        assert_eq!(papers[0].authors, vec!["R. Poole".to_string()]);
        assert_eq!(papers[0].pdf_url.as_deref(), Some("https://example.org/poole.pdf"));

        assert!(papers[1].id.is_none());
        assert!(papers[1].abstract_text.is_none());
        assert_eq!(papers[1].citation_count, 0);
    }

    #[tokio::test]
    async fn test_retry_on_rate_limit_recovers() {
        let calls = AtomicU32::new(0);
        let result = retry_on_rate_limit(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(rate_limited())
                } else {
                    Ok("papers")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "papers");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_on_rate_limit_gives_up() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), SearchError> =
            retry_on_rate_limit(2, Duration::from_millis(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limited()) }
            })
            .await;

        assert!(matches!(result, Err(SearchError::RateLimitExceeded { attempts: 3 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let err: research_agent_core::Error = result.unwrap_err().into();
        assert!(matches!(err, research_agent_core::Error::UpstreamRateLimited(_)));
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), SearchError> =
            retry_on_rate_limit(3, Duration::from_millis(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(SearchError::Http {
                        status: 500,
                        body: String::new(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(SearchError::Http { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
