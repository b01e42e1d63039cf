//! Bibliographic search traits

use async_trait::async_trait;

use crate::{CandidatePaper, Result};

/// Bibliographic search interface
///
/// Implementations:
/// - `SemanticScholarClient` - Semantic Scholar Graph API
///
/// # Example
///
/// ```ignore
/// let search: Arc<dyn PaperSearch> = Arc::new(SemanticScholarClient::new(config)?);
/// for paper in search.search("caffeine cardiovascular risk", 10).await? {
///     println!("{} ({:?})", paper.title, paper.year);
/// }
/// ```
#[async_trait]
pub trait PaperSearch: Send + Sync + 'static {
    /// Execute one query
    ///
    /// # Arguments
    /// * `query` - Search-engine query text
    /// * `limit` - Maximum records to return
    ///
    /// # Returns
    /// Candidate papers in the service's relevance order
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CandidatePaper>>;

    /// Get search backend name for logging
    fn name(&self) -> &str;
}
