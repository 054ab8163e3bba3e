//! Key store provider interface and the in-memory backing.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::info;

use crate::error::ConnectorError;

use super::key::{KeyStatus, SiteKey};

/// Provider of per-site key material.
///
/// Implementations must uphold the single-active-key invariant: rotation
/// revokes the previous key and activates the new one in one step, so no
/// interleaved lookup can observe two active keys for the same site.
pub trait KeyStore: Send + Sync {
    /// Return the active key for a site, if any.
    fn get_active_key(&self, site_id: &str) -> Option<SiteKey>;

    /// Atomically revoke the current key (if any) and activate a new one.
    fn rotate_key(&self, site_id: &str, now: u64) -> Result<SiteKey, ConnectorError>;

    /// Revoke the active key. Returns `true` if a key was revoked.
    fn revoke_key(&self, site_id: &str) -> bool;
}

/// In-memory key store for single-process deployments.
pub struct InMemoryKeyStore {
    keys: Mutex<HashMap<String, SiteKey>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a site with a specific key (for tests and imports).
    pub fn insert(&self, site_id: &str, key: SiteKey) {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.insert(site_id.to_string(), key);
    }
}

impl Default for InMemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for InMemoryKeyStore {
    fn get_active_key(&self, site_id: &str) -> Option<SiteKey> {
        let keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.get(site_id).filter(|k| k.is_active()).cloned()
    }

    fn rotate_key(&self, site_id: &str, now: u64) -> Result<SiteKey, ConnectorError> {
        let replacement = SiteKey::generate(now)?;

        // Single lock scope: the old key is never observable alongside
        // the new one.
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        let previous = keys.insert(site_id.to_string(), replacement.clone());

        info!(
            site_id = %site_id,
            key_id = %replacement.id,
            rotated = previous.is_some(),
            "Site key activated"
        );

        Ok(replacement)
    }

    fn revoke_key(&self, site_id: &str) -> bool {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        match keys.get_mut(site_id) {
            Some(key) if key.is_active() => {
                key.status = KeyStatus::Revoked;
                info!(site_id = %site_id, key_id = %key.id, "Site key revoked");
                true
            }
            _ => false,
        }
    }
}
