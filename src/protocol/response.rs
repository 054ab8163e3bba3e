//! Rejection responses and rate-limit observability headers.

use serde::{Deserialize, Serialize};

use crate::auth::RateLimitStatus;
use crate::error::AuthError;

/// Structured rejection returned to the manager when a stage fails.
///
/// The route layer serializes this as the response body and uses
/// `status` as the HTTP status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    /// Machine-readable error code (e.g. "NONCE_REUSED").
    pub code: String,

    /// Human-readable explanation.
    pub message: String,

    /// HTTP status for the route layer: 401 for signature/replay
    /// failures, 429 for throttling, 403 for a disabled capability.
    pub status: u16,

    /// Seconds until a throttled manager may retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl From<&AuthError> for Rejection {
    fn from(error: &AuthError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            status: error.status(),
            retry_after: error.retry_after(),
        }
    }
}

impl Rejection {
    /// Headers to attach to the rejection response.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        match self.retry_after {
            Some(seconds) => vec![("Retry-After", seconds.to_string())],
            None => Vec::new(),
        }
    }
}

/// `X-RateLimit-*` headers attached to every response, success or not.
pub fn rate_limit_headers(status: &RateLimitStatus) -> Vec<(&'static str, String)> {
    vec![
        ("X-RateLimit-Limit", status.limit.to_string()),
        ("X-RateLimit-Remaining", status.remaining.to_string()),
        ("X-RateLimit-Reset", status.reset_at.to_string()),
    ]
}
