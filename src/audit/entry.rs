//! Audit event types.

use serde::Serialize;
use uuid::Uuid;

use crate::auth::Capability;
use crate::error::AuthError;
use crate::protocol::SignedRequest;

use super::sanitize::sanitize_payload;

/// One audit event per authentication outcome.
///
/// Carries site identity, action, and outcome, never the site key or the
/// request signature.
#[derive(Debug, Clone, Serialize)]
pub struct AuthEvent {
    /// ISO 8601 timestamp when the decision was made.
    pub timestamp: String,
    /// Unique identifier for the request.
    pub request_id: Uuid,
    /// Site the request addressed.
    pub site_id: String,
    /// Requested action.
    pub action: String,
    /// Sanitized request payload.
    pub payload: serde_json::Value,
    /// Decision and its reason.
    pub outcome: AuthOutcome,
    /// Time spent in the authentication pipeline, in milliseconds.
    pub duration_ms: u64,
}

/// Decision recorded in an audit event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "decision")]
pub enum AuthOutcome {
    #[serde(rename = "authorized")]
    Authorized {
        /// Capabilities granted to the request.
        capabilities: Vec<Capability>,
    },
    #[serde(rename = "rejected")]
    Rejected {
        /// Stage that produced the rejection.
        stage: String,
        /// Machine-readable error code.
        code: String,
        /// Human-readable reason.
        error_message: String,
    },
}

impl AuthEvent {
    /// Event for an accepted request.
    pub fn authorized(
        request_id: Uuid,
        site_id: &str,
        request: &SignedRequest,
        capabilities: Vec<Capability>,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
            site_id: site_id.to_string(),
            action: request.action.clone(),
            payload: sanitize_payload(&request.payload),
            outcome: AuthOutcome::Authorized { capabilities },
            duration_ms,
        }
    }

    /// Event for a rejected request.
    pub fn rejected(
        request_id: Uuid,
        site_id: &str,
        request: &SignedRequest,
        error: &AuthError,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
            site_id: site_id.to_string(),
            action: request.action.clone(),
            payload: sanitize_payload(&request.payload),
            outcome: AuthOutcome::Rejected {
                stage: error.stage().to_string(),
                code: error.code().to_string(),
                error_message: error.to_string(),
            },
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReplayError;

    fn request() -> SignedRequest {
        SignedRequest::new("health_check", serde_json::json!({"probe": "ssl"}), 1000)
    }

    #[test]
    fn test_authorized_event_serialization() {
        let event = AuthEvent::authorized(
            Uuid::nil(),
            "site-1",
            &request(),
            vec![Capability::HealthCheck, Capability::ListUpdates],
            7,
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"decision\":\"authorized\""));
        assert!(json.contains("\"site_id\":\"site-1\""));
        assert!(json.contains("\"capabilities\":[\"health_check\",\"list_updates\"]"));
        assert!(json.contains("\"duration_ms\":7"));
    }

    #[test]
    fn test_rejected_event_records_stage_and_code() {
        let error = AuthError::Replay(ReplayError::Duplicate);
        let event = AuthEvent::rejected(Uuid::nil(), "site-1", &request(), &error, 2);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"decision\":\"rejected\""));
        assert!(json.contains("\"stage\":\"replay\""));
        assert!(json.contains("\"code\":\"NONCE_REUSED\""));
    }

    #[test]
    fn test_event_payload_is_sanitized() {
        let mut request = request();
        request.payload = serde_json::json!({"probe": "ssl", "api_token": "t0ps3cret"});

        let event = AuthEvent::authorized(Uuid::nil(), "site-1", &request, vec![], 1);
        assert_eq!(event.payload["probe"], "ssl");
        assert_eq!(event.payload["api_token"], "[REDACTED]");
    }
}
