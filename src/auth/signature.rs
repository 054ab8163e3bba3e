//! HMAC-SHA256 signature verification.

use ring::hmac;

use crate::error::SignatureError;
use crate::keystore::SiteKey;
use crate::protocol::SignedRequest;

/// Expected digest length for HMAC-SHA256.
const DIGEST_BYTES: usize = 32;

/// Verify a request signature against the site's active key.
///
/// The canonical message is recomputed locally and compared with the
/// supplied digest via `ring::hmac::verify`, which is constant-time. A
/// short-circuiting string comparison here would be a timing side channel,
/// not an optimization.
pub fn verify_signature(key: &SiteKey, request: &SignedRequest) -> Result<(), SignatureError> {
    if request.action.is_empty() {
        return Err(SignatureError::MalformedInput { field: "action" });
    }
    if request.nonce.is_empty() {
        return Err(SignatureError::MalformedInput { field: "nonce" });
    }

    let digest = hex::decode(&request.signature)
        .map_err(|_| SignatureError::MalformedInput { field: "signature" })?;
    if digest.len() != DIGEST_BYTES {
        return Err(SignatureError::MalformedInput { field: "signature" });
    }

    if !key.is_active() {
        return Err(SignatureError::NoActiveKey);
    }

    let hmac_key = hmac::Key::new(hmac::HMAC_SHA256, key.value.as_bytes());
    hmac::verify(&hmac_key, request.canonical_message().as_bytes(), &digest)
        .map_err(|_| SignatureError::Mismatch)
}
