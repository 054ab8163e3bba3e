//! Request envelope sent by the manager.

use ring::hmac;
use serde::{Deserialize, Serialize};

/// A signed request envelope.
///
/// Every inbound request carries an HMAC-SHA256 signature over the
/// canonical representation of its fields. The nonce makes each envelope
/// single-use within the replay window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRequest {
    /// The requested operation (e.g. "health_check", "perform_updates").
    pub action: String,

    /// Unix timestamp (seconds) when the manager created the request.
    pub timestamp: u64,

    /// Opaque random string, unique per site key within the replay window.
    pub nonce: String,

    /// HMAC-SHA256 over the canonical message, hex-encoded.
    pub signature: String,

    /// Action-specific payload.
    pub payload: serde_json::Value,
}

impl SignedRequest {
    /// Create an unsigned envelope with a fresh nonce.
    pub fn new(action: impl Into<String>, payload: serde_json::Value, timestamp: u64) -> Self {
        Self {
            action: action.into(),
            timestamp,
            nonce: uuid::Uuid::new_v4().to_string(),
            signature: String::new(),
            payload,
        }
    }

    /// Canonical byte string the signature covers.
    ///
    /// Format: `{action}|{timestamp}|{nonce}|{payload_json}`. The payload
    /// is serialized with `serde_json`, which preserves object key order,
    /// so signer and verifier never diverge on serialization.
    pub fn canonical_message(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.action,
            self.timestamp,
            self.nonce,
            serde_json::to_string(&self.payload).unwrap_or_default()
        )
    }

    /// Sign the envelope with a site key. This is the manager-side half of
    /// the protocol, exercised here by tests and the connector's own
    /// key-verification round trips.
    pub fn sign(&mut self, key_value: &str) {
        let key = hmac::Key::new(hmac::HMAC_SHA256, key_value.as_bytes());
        let tag = hmac::sign(&key, self.canonical_message().as_bytes());
        self.signature = hex::encode(tag.as_ref());
    }
}
