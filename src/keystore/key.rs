//! Site key material and lifecycle state.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConnectorError;

/// Number of random bytes in a generated key.
const KEY_BYTES: usize = 32;

/// Lifecycle state of a site key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    Active,
    Revoked,
}

/// The shared secret identifying one site to its manager.
///
/// Exactly one key per site may be `Active` at any time. The value is
/// established out-of-band by copying it into the manager once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteKey {
    /// Stable identifier for this key, used to scope nonces and rate
    /// counters.
    pub id: Uuid,
    /// Hex-encoded key material (32 random bytes).
    pub value: String,
    /// Unix timestamp when the key was created.
    pub created_at: u64,
    /// Lifecycle state.
    pub status: KeyStatus,
}

impl SiteKey {
    /// Generate a fresh active key from the system CSPRNG.
    pub fn generate(created_at: u64) -> Result<Self, ConnectorError> {
        let rng = SystemRandom::new();
        let mut material = [0u8; KEY_BYTES];
        rng.fill(&mut material)
            .map_err(|_| ConnectorError::KeyStore {
                message: "system random generator unavailable".to_string(),
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            value: hex::encode(material),
            created_at,
            status: KeyStatus::Active,
        })
    }

    /// Whether this key may sign requests.
    pub fn is_active(&self) -> bool {
        self.status == KeyStatus::Active
    }
}
