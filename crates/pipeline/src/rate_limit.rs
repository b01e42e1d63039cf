//! Per-client sliding-window rate limiter
//!
//! Each client key owns a queue of admission timestamps. On every call the
//! queue is pruned to the current window; the request is admitted while the
//! window holds fewer than `max_requests` timestamps.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use research_agent_config::RateLimitConfig;
use research_agent_core::RateLimitStore;

pub struct SlidingWindowLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_settings(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Admit or deny at a given instant
    pub fn admit_at(&self, client_key: &str, now: Instant) -> bool {
        let mut timestamps = self.windows.entry(client_key.to_string()).or_default();
        prune(&mut timestamps, now, self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Requests still counted against a client
    pub fn in_window(&self, client_key: &str) -> usize {
        let now = Instant::now();
        self.windows
            .get_mut(client_key)
            .map(|mut timestamps| {
                prune(&mut timestamps, now, self.window);
                timestamps.len()
            })
            .unwrap_or(0)
    }

    /// Drop clients with no requests left in their window
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            prune(timestamps, now, self.window);
            !timestamps.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = timestamps.front() {
        if now.saturating_duration_since(oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

#[async_trait]
impl RateLimitStore for SlidingWindowLimiter {
    async fn admit(&self, client_key: &str) -> bool {
        self.admit_at(client_key, Instant::now())
    }

    async fn sweep_idle(&self) -> usize {
        self.sweep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denies_after_max_in_window() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();

        for i in 0..3 {
            assert!(limiter.admit_at("1.2.3.4", start + Duration::from_secs(i)));
        }
        assert!(!limiter.admit_at("1.2.3.4", start + Duration::from_secs(10)));
        // Other clients are independent
        assert!(limiter.admit_at("5.6.7.8", start + Duration::from_secs(10)));
    }

    #[test]
    fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.admit_at("c", start));
        assert!(limiter.admit_at("c", start + Duration::from_secs(30)));
        assert!(!limiter.admit_at("c", start + Duration::from_secs(59)));
        // First timestamp has left the window
        assert!(limiter.admit_at("c", start + Duration::from_secs(60)));
        assert!(!limiter.admit_at("c", start + Duration::from_secs(61)));
    }

    #[test]
    fn test_denied_requests_not_recorded() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.admit_at("c", start));
        for s in 1..9 {
            assert!(!limiter.admit_at("c", start + Duration::from_secs(s)));
        }
        assert!(limiter.admit_at("c", start + Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_admission_resumes_after_window() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_millis(50));
        assert!(limiter.admit("c").await);
        assert!(limiter.admit("c").await);
        assert!(!limiter.admit("c").await);
        assert_eq!(limiter.in_window("c"), 2);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.admit("c").await);
        assert_eq!(limiter.sweep(), 0);
    }
}
