//! Shared store traits
//!
//! The result cache and the rate limiter are the only state shared across
//! requests. Both sit behind these traits: an in-memory map for single-instance
//! deployments, an external key-value store for multi-instance ones. Entries are
//! independent per key, so implementations need atomic per-key operations only.

use async_trait::async_trait;

use crate::ResearchResult;

/// TTL-bounded cache of research results
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Look up a live entry; expired entries are never returned
    async fn get(&self, key: &str) -> Option<ResearchResult>;

    /// Store a result under `key` with the store's TTL
    async fn set(&self, key: &str, payload: ResearchResult);

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> usize {
        0
    }
}

/// Per-client admission control
#[async_trait]
pub trait RateLimitStore: Send + Sync + 'static {
    /// Record a request for `client_key` if admitted
    ///
    /// Returns false when the client has exhausted its window.
    async fn admit(&self, client_key: &str) -> bool;

    /// Forget clients with nothing left in their window, returning how many
    async fn sweep_idle(&self) -> usize {
        0
    }
}
