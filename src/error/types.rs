//! Error types for the SiteLink connector.

use thiserror::Error;

/// Top-level error type for the connector.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Key store errors (generation, rotation).
    #[error("Key store error: {message}")]
    KeyStore { message: String },

    /// Authentication errors.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Rejection produced by one of the authentication stages.
///
/// Wraps the first failing stage's error so the caller and the audit log
/// can distinguish a bad signature from a throttled client from a
/// capability that must be enabled in settings.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Signature rejected: {0}")]
    Signature(#[from] SignatureError),

    #[error("Replay rejected: {0}")]
    Replay(#[from] ReplayError),

    #[error("Rate limit rejected: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("Permission rejected: {0}")]
    Permission(#[from] PermissionError),
}

impl AuthError {
    /// Name of the stage that produced this rejection.
    pub fn stage(&self) -> &'static str {
        match self {
            AuthError::Signature(_) => "signature",
            AuthError::Replay(_) => "replay",
            AuthError::RateLimit(_) => "rate_limit",
            AuthError::Permission(_) => "permission",
        }
    }

    /// Machine-readable error code sent to the manager.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Signature(SignatureError::Mismatch) => "SIGNATURE_MISMATCH",
            AuthError::Signature(SignatureError::NoActiveKey) => "NO_ACTIVE_KEY",
            AuthError::Signature(SignatureError::MalformedInput { .. }) => "MALFORMED_REQUEST",
            AuthError::Replay(ReplayError::Expired { .. }) => "REQUEST_EXPIRED",
            AuthError::Replay(ReplayError::Duplicate) => "NONCE_REUSED",
            AuthError::RateLimit(RateLimitError::Exceeded { .. }) => "RATE_LIMITED",
            AuthError::Permission(PermissionError::Denied { .. }) => "PERMISSION_DENIED",
        }
    }

    /// HTTP status the route layer should answer with.
    ///
    /// Signature and replay failures map to 401, throttling to 429, and
    /// a disabled capability to 403.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::Signature(_) | AuthError::Replay(_) => 401,
            AuthError::RateLimit(_) => 429,
            AuthError::Permission(_) => 403,
        }
    }

    /// Seconds the manager should wait before retrying. Only set for
    /// throttled requests; retry policy for everything else belongs to
    /// the manager.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AuthError::RateLimit(RateLimitError::Exceeded { retry_after }) => Some(*retry_after),
            _ => None,
        }
    }
}

/// Signature verification failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not match the request")]
    Mismatch,

    #[error("site has no active key")]
    NoActiveKey,

    #[error("malformed request field: {field}")]
    MalformedInput { field: &'static str },
}

/// Replay protection failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplayError {
    #[error("request timestamp outside acceptance window ({skew_seconds}s of skew)")]
    Expired { skew_seconds: u64 },

    #[error("nonce already used")]
    Duplicate,
}

/// Rate limiting failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit exceeded, retry after {retry_after}s")]
    Exceeded { retry_after: u64 },
}

/// Permission gate failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PermissionError {
    #[error("action '{action}' is not permitted for this site")]
    Denied { action: String },
}

/// Result type alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::Signature(SignatureError::Mismatch).status(), 401);
        assert_eq!(AuthError::Replay(ReplayError::Duplicate).status(), 401);
        assert_eq!(
            AuthError::RateLimit(RateLimitError::Exceeded { retry_after: 5 }).status(),
            429
        );
        assert_eq!(
            AuthError::Permission(PermissionError::Denied {
                action: "perform_updates".to_string()
            })
            .status(),
            403
        );
    }

    #[test]
    fn test_retry_after_only_for_rate_limit() {
        let throttled = AuthError::RateLimit(RateLimitError::Exceeded { retry_after: 12 });
        assert_eq!(throttled.retry_after(), Some(12));

        let mismatch = AuthError::Signature(SignatureError::Mismatch);
        assert_eq!(mismatch.retry_after(), None);
    }

    #[test]
    fn test_distinct_codes_per_failure_kind() {
        let codes = [
            AuthError::Signature(SignatureError::Mismatch).code(),
            AuthError::Signature(SignatureError::NoActiveKey).code(),
            AuthError::Replay(ReplayError::Expired { skew_seconds: 400 }).code(),
            AuthError::Replay(ReplayError::Duplicate).code(),
            AuthError::RateLimit(RateLimitError::Exceeded { retry_after: 1 }).code(),
            AuthError::Permission(PermissionError::Denied {
                action: "access_analytics".to_string(),
            })
            .code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
