//! Replay protection: nonce tracking within an acceptance window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::error::ReplayError;

/// Store of accepted nonces, scoped per site key.
///
/// The check-and-insert must be atomic: two concurrent requests carrying
/// the same nonce must result in exactly one acceptance. Implementations
/// backed by an external store must provide the same guarantee.
pub trait ReplayStore: Send + Sync {
    /// Record the nonce if it has not been seen. Returns `false` when the
    /// nonce is already present and unexpired.
    fn check_and_store(&self, site_key_id: Uuid, nonce: &str, expires_at: u64, now: u64) -> bool;

    /// Drop entries whose window has passed.
    fn evict_expired(&self, now: u64);

    /// Drop all entries for one site key (used on disconnect).
    fn purge(&self, site_key_id: Uuid);

    /// Number of tracked nonces (for monitoring).
    fn len(&self) -> usize;

    /// Whether no nonces are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory replay store for single-process deployments.
pub struct InMemoryReplayStore {
    nonces: Mutex<HashMap<(Uuid, String), u64>>,
}

impl InMemoryReplayStore {
    pub fn new() -> Self {
        Self {
            nonces: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryReplayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayStore for InMemoryReplayStore {
    fn check_and_store(&self, site_key_id: Uuid, nonce: &str, expires_at: u64, now: u64) -> bool {
        let mut nonces = self.nonces.lock().unwrap_or_else(|e| e.into_inner());

        // Lazy eviction keeps the map bounded by the acceptance window.
        nonces.retain(|_, expiry| *expiry > now);

        let entry = (site_key_id, nonce.to_string());
        if nonces.contains_key(&entry) {
            return false;
        }

        nonces.insert(entry, expires_at);
        true
    }

    fn evict_expired(&self, now: u64) {
        let mut nonces = self.nonces.lock().unwrap_or_else(|e| e.into_inner());
        nonces.retain(|_, expiry| *expiry > now);
    }

    fn purge(&self, site_key_id: Uuid) {
        let mut nonces = self.nonces.lock().unwrap_or_else(|e| e.into_inner());
        nonces.retain(|(key_id, _), _| *key_id != site_key_id);
    }

    fn len(&self) -> usize {
        self.nonces.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Rejects expired and re-submitted envelopes.
///
/// The acceptance window is symmetric around `now`, so clock skew between
/// manager and site is tolerated in both directions. The window is
/// deliberately generous rather than tight: operational robustness over a
/// slightly larger replay surface.
pub struct ReplayGuard {
    store: Arc<dyn ReplayStore>,
    window_seconds: u64,
}

impl ReplayGuard {
    pub fn new(store: Arc<dyn ReplayStore>, window_seconds: u64) -> Self {
        Self {
            store,
            window_seconds,
        }
    }

    /// Accept a nonce, recording it for the remainder of its window.
    pub fn accept(
        &self,
        site_key_id: Uuid,
        nonce: &str,
        timestamp: u64,
        now: u64,
    ) -> Result<(), ReplayError> {
        let skew = now.abs_diff(timestamp);
        if skew > self.window_seconds {
            return Err(ReplayError::Expired { skew_seconds: skew });
        }

        let expires_at = timestamp + self.window_seconds;
        if !self.store.check_and_store(site_key_id, nonce, expires_at, now) {
            return Err(ReplayError::Duplicate);
        }

        Ok(())
    }

    /// Drop all tracked nonces for a site key.
    pub fn purge(&self, site_key_id: Uuid) {
        self.store.purge(site_key_id);
    }

    /// Spawn a periodic eviction sweep so idle deployments do not keep
    /// expired nonces until the next request triggers lazy cleanup.
    pub fn start_cleanup_task(&self, interval: Duration) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.evict_expired(crate::unix_now());
            }
        });
    }
}
