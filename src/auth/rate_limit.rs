//! Per-site-key sliding window rate limiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::error::RateLimitError;

/// Remaining-quota metadata returned on every accepted request, surfaced
/// to the manager as `X-RateLimit-*` headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Maximum requests per window.
    pub limit: usize,
    /// Requests left in the current window.
    pub remaining: usize,
    /// Unix timestamp when the oldest counted request leaves the window.
    pub reset_at: u64,
}

/// Store of per-site-key request timestamps.
pub trait RateStore: Send + Sync {
    /// Evict entries older than the window, then record the request if it
    /// fits the budget. Atomic per site key.
    fn consume(
        &self,
        site_key_id: Uuid,
        now: u64,
        window_seconds: u64,
        max_requests: usize,
    ) -> Result<RateLimitStatus, RateLimitError>;

    /// Report the current quota without recording a request.
    fn peek(
        &self,
        site_key_id: Uuid,
        now: u64,
        window_seconds: u64,
        max_requests: usize,
    ) -> RateLimitStatus;

    /// Drop entries outside the window across all site keys.
    fn evict_expired(&self, now: u64, window_seconds: u64);

    /// Drop all entries for one site key (used on disconnect).
    fn purge(&self, site_key_id: Uuid);
}

/// In-memory rate store for single-process deployments.
pub struct InMemoryRateStore {
    requests: Mutex<HashMap<Uuid, Vec<u64>>>,
}

impl InMemoryRateStore {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RateStore for InMemoryRateStore {
    fn consume(
        &self,
        site_key_id: Uuid,
        now: u64,
        window_seconds: u64,
        max_requests: usize,
    ) -> Result<RateLimitStatus, RateLimitError> {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        let entry = requests.entry(site_key_id).or_default();

        // An entry recorded at `t` leaves the window at `t + window`.
        entry.retain(|&t| t + window_seconds > now);

        if entry.len() >= max_requests {
            let oldest = entry.iter().min().copied().unwrap_or(now);
            return Err(RateLimitError::Exceeded {
                retry_after: (oldest + window_seconds).saturating_sub(now),
            });
        }

        entry.push(now);
        let oldest = entry.iter().min().copied().unwrap_or(now);

        Ok(RateLimitStatus {
            limit: max_requests,
            remaining: max_requests - entry.len(),
            reset_at: oldest + window_seconds,
        })
    }

    fn peek(
        &self,
        site_key_id: Uuid,
        now: u64,
        window_seconds: u64,
        max_requests: usize,
    ) -> RateLimitStatus {
        let requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        let in_window: Vec<u64> = requests
            .get(&site_key_id)
            .map(|times| {
                times
                    .iter()
                    .copied()
                    .filter(|&t| t + window_seconds > now)
                    .collect()
            })
            .unwrap_or_default();

        RateLimitStatus {
            limit: max_requests,
            remaining: max_requests.saturating_sub(in_window.len()),
            reset_at: in_window
                .iter()
                .min()
                .map_or(now, |oldest| oldest + window_seconds),
        }
    }

    fn evict_expired(&self, now: u64, window_seconds: u64) {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.retain(|_, times| {
            times.retain(|&t| t + window_seconds > now);
            !times.is_empty()
        });
    }

    fn purge(&self, site_key_id: Uuid) {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.remove(&site_key_id);
    }
}

/// Bounds request throughput per site key.
///
/// Runs before the permission gate so that requests for disallowed
/// actions still consume quota; probing the permission surface is never
/// free.
pub struct RateLimiter {
    store: Arc<dyn RateStore>,
    max_requests: usize,
    window_seconds: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateStore>, max_requests: usize, window_seconds: u64) -> Self {
        Self {
            store,
            max_requests,
            window_seconds,
        }
    }

    /// Check the budget and record the request in one step.
    pub fn check_and_consume(
        &self,
        site_key_id: Uuid,
        now: u64,
    ) -> Result<RateLimitStatus, RateLimitError> {
        self.store
            .consume(site_key_id, now, self.window_seconds, self.max_requests)
    }

    /// Report the current quota for a site key without consuming it.
    ///
    /// Rejected requests need `X-RateLimit-*` headers too; this is the
    /// source for them once `check_and_consume` has already decided.
    pub fn status(&self, site_key_id: Uuid, now: u64) -> RateLimitStatus {
        self.store
            .peek(site_key_id, now, self.window_seconds, self.max_requests)
    }

    /// Drop all counters for a site key.
    pub fn purge(&self, site_key_id: Uuid) {
        self.store.purge(site_key_id);
    }

    /// Spawn a periodic eviction sweep for counters of idle site keys.
    pub fn start_cleanup_task(&self, interval: Duration) {
        let store = Arc::clone(&self.store);
        let window = self.window_seconds;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.evict_expired(crate::unix_now(), window);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: usize, window_seconds: u64) -> RateLimiter {
        RateLimiter::new(
            Arc::new(InMemoryRateStore::new()),
            max_requests,
            window_seconds,
        )
    }

    #[test]
    fn test_exactly_n_requests_fit_the_window() {
        let limiter = limiter(60, 60);
        let key = Uuid::new_v4();

        for i in 0..60 {
            assert!(limiter.check_and_consume(key, 1000 + i % 10).is_ok());
        }

        match limiter.check_and_consume(key, 1009) {
            Err(RateLimitError::Exceeded { retry_after }) => assert!(retry_after > 0),
            other => panic!("61st request should be throttled, got {other:?}"),
        }
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = limiter(3, 60);
        let key = Uuid::new_v4();

        assert_eq!(limiter.check_and_consume(key, 100).unwrap().remaining, 2);
        assert_eq!(limiter.check_and_consume(key, 101).unwrap().remaining, 1);
        let status = limiter.check_and_consume(key, 102).unwrap();
        assert_eq!(status.remaining, 0);
        assert_eq!(status.limit, 3);
        assert_eq!(status.reset_at, 160);
    }

    #[test]
    fn test_retry_after_tracks_oldest_entry() {
        let limiter = limiter(3, 60);
        let key = Uuid::new_v4();

        limiter.check_and_consume(key, 0).unwrap();
        limiter.check_and_consume(key, 10).unwrap();
        limiter.check_and_consume(key, 20).unwrap();

        // Oldest entry (t=0) leaves the window at t=60.
        assert_eq!(
            limiter.check_and_consume(key, 30),
            Err(RateLimitError::Exceeded { retry_after: 30 })
        );
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(3, 60);
        let key = Uuid::new_v4();

        limiter.check_and_consume(key, 0).unwrap();
        limiter.check_and_consume(key, 10).unwrap();
        limiter.check_and_consume(key, 20).unwrap();
        assert!(limiter.check_and_consume(key, 59).is_err());

        // t=0 entry has left the trailing window.
        let status = limiter.check_and_consume(key, 61).unwrap();
        assert_eq!(status.remaining, 0);
        assert_eq!(status.reset_at, 70);
    }

    #[test]
    fn test_status_reports_without_consuming() {
        let limiter = limiter(3, 60);
        let key = Uuid::new_v4();

        // Untouched key: full budget, nothing to wait for.
        let fresh = limiter.status(key, 100);
        assert_eq!(fresh.remaining, 3);
        assert_eq!(fresh.reset_at, 100);

        limiter.check_and_consume(key, 100).unwrap();
        limiter.check_and_consume(key, 110).unwrap();

        let status = limiter.status(key, 120);
        assert_eq!(
            status,
            RateLimitStatus {
                limit: 3,
                remaining: 1,
                reset_at: 160,
            }
        );
        // Peeking again reports the same picture.
        assert_eq!(limiter.status(key, 120), status);
        // The t=100 entry has left the trailing window.
        assert_eq!(limiter.status(key, 161).remaining, 2);
    }

    #[test]
    fn test_status_reports_exhausted_budget() {
        let limiter = limiter(2, 60);
        let key = Uuid::new_v4();

        limiter.check_and_consume(key, 100).unwrap();
        limiter.check_and_consume(key, 100).unwrap();
        assert!(limiter.check_and_consume(key, 100).is_err());

        // The throttled attempt was not recorded, so the picture matches
        // the two accepted requests.
        let status = limiter.status(key, 100);
        assert_eq!(status.remaining, 0);
        assert_eq!(status.reset_at, 160);
    }

    #[test]
    fn test_site_keys_are_throttled_independently() {
        let limiter = limiter(2, 60);
        let key_a = Uuid::new_v4();
        let key_b = Uuid::new_v4();

        limiter.check_and_consume(key_a, 100).unwrap();
        limiter.check_and_consume(key_a, 100).unwrap();
        assert!(limiter.check_and_consume(key_a, 100).is_err());

        assert!(limiter.check_and_consume(key_b, 100).is_ok());
    }

    #[test]
    fn test_purge_resets_the_counter() {
        let limiter = limiter(1, 60);
        let key = Uuid::new_v4();

        limiter.check_and_consume(key, 100).unwrap();
        assert!(limiter.check_and_consume(key, 100).is_err());

        limiter.purge(key);
        assert!(limiter.check_and_consume(key, 100).is_ok());
    }

    #[test]
    fn test_evict_expired_drops_idle_keys() {
        let store = Arc::new(InMemoryRateStore::new());
        let limiter = RateLimiter::new(Arc::clone(&store) as Arc<dyn RateStore>, 5, 60);
        let key = Uuid::new_v4();

        limiter.check_and_consume(key, 100).unwrap();
        store.evict_expired(200, 60);

        // Counter was dropped entirely, fresh budget applies.
        let status = limiter.check_and_consume(key, 200).unwrap();
        assert_eq!(status.remaining, 4);
    }
}
