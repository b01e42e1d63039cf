//! In-memory result cache
//!
//! `DashMap` keyed by `"{question_hash}:{level}"`. Expired entries are
//! dropped on read; when the map is full, expired entries are purged first and
//! then the oldest entry is evicted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use research_agent_config::CacheSettings;
use research_agent_core::{CacheEntry, CacheStore, ResearchResult};

pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(Duration::from_secs(settings.ttl_hours * 3600), settings.max_entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    fn remove_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.created_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Option<ResearchResult> {
        let cached = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired()).then(|| entry.payload.clone()));

        match cached {
            Some(Some(payload)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload)
            }
            Some(None) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired());
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn set(&self, key: &str, payload: ResearchResult) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            let purged = self.remove_expired();
            if self.entries.len() >= self.max_entries {
                self.evict_oldest();
            }
            tracing::debug!(purged, "Result cache full");
        }
        self.entries
            .insert(key.to_string(), CacheEntry::new(key, payload, self.ttl));
    }

    async fn purge_expired(&self) -> usize {
        self.remove_expired()
    }
}
