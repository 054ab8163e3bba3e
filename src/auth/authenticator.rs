//! Request authentication pipeline.
//!
//! Stages run strictly in order: signature, replay, rate limit,
//! permission. The signature must hold before anything else in the
//! envelope is trusted; replay and rate checks precede the permission
//! gate so throttled or replayed traffic cannot probe the permission
//! surface; the permission lookup runs last because it is the cheapest,
//! most business-specific check.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditSink, AuthEvent};
use crate::config::SecurityConfig;
use crate::error::{AuthError, SignatureError};
use crate::keystore::KeyStore;
use crate::protocol::SignedRequest;

use super::permissions::{authorize_action, Capability, MatrixProvider};
use super::rate_limit::{InMemoryRateStore, RateLimitStatus, RateLimiter, RateStore};
use super::replay::{InMemoryReplayStore, ReplayGuard, ReplayStore};
use super::signature::verify_signature;

/// Output of a successful authentication.
///
/// Created per request, handed to the route layer, never persisted.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    /// Identifier of the key that signed the request.
    pub site_key_id: Uuid,
    /// Capabilities granted by the site's permission matrix.
    pub granted_capabilities: Vec<Capability>,
    /// Timestamp the manager put in the envelope.
    pub request_timestamp: u64,
    /// Quota metadata for response headers.
    pub rate: RateLimitStatus,
}

impl AuthorizationContext {
    /// Whether a capability was granted.
    pub fn grants(&self, capability: Capability) -> bool {
        self.granted_capabilities.contains(&capability)
    }
}

/// Composes the verification stages into one accept/reject decision.
pub struct Authenticator {
    keys: Arc<dyn KeyStore>,
    matrices: Arc<dyn MatrixProvider>,
    replay: ReplayGuard,
    rate: RateLimiter,
    audit: Arc<dyn AuditSink>,
}

impl Authenticator {
    /// Build an authenticator with in-memory replay and rate stores.
    pub fn new(
        keys: Arc<dyn KeyStore>,
        matrices: Arc<dyn MatrixProvider>,
        audit: Arc<dyn AuditSink>,
        security: &SecurityConfig,
    ) -> Self {
        Self::with_stores(
            keys,
            matrices,
            audit,
            Arc::new(InMemoryReplayStore::new()),
            Arc::new(InMemoryRateStore::new()),
            security,
        )
    }

    /// Build an authenticator over externally provided stores, for
    /// multi-instance deployments backed by a shared fast store.
    pub fn with_stores(
        keys: Arc<dyn KeyStore>,
        matrices: Arc<dyn MatrixProvider>,
        audit: Arc<dyn AuditSink>,
        replay_store: Arc<dyn ReplayStore>,
        rate_store: Arc<dyn RateStore>,
        security: &SecurityConfig,
    ) -> Self {
        Self {
            keys,
            matrices,
            replay: ReplayGuard::new(replay_store, security.replay_window_seconds),
            rate: RateLimiter::new(
                rate_store,
                security.rate_limit_requests,
                security.rate_limit_window_seconds,
            ),
            audit,
        }
    }

    /// Authenticate one inbound envelope.
    ///
    /// Returns the authorization context on success, or the first failing
    /// stage's error. Exactly one audit event is emitted per call; the
    /// raw site key never appears in it.
    pub async fn authenticate(
        &self,
        site_id: &str,
        request: &SignedRequest,
        now: u64,
    ) -> Result<AuthorizationContext, AuthError> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();

        let result = self.run_stages(site_id, request, now);
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(context) => {
                info!(
                    request_id = %request_id,
                    site_id = %site_id,
                    action = %request.action,
                    "Request authorized"
                );
                self.audit.record(&AuthEvent::authorized(
                    request_id,
                    site_id,
                    request,
                    context.granted_capabilities.clone(),
                    duration_ms,
                ));
            }
            Err(error) => {
                warn!(
                    request_id = %request_id,
                    site_id = %site_id,
                    action = %request.action,
                    stage = error.stage(),
                    error = %error,
                    "Request rejected"
                );
                self.audit.record(&AuthEvent::rejected(
                    request_id, site_id, request, error, duration_ms,
                ));
            }
        }

        result
    }

    fn run_stages(
        &self,
        site_id: &str,
        request: &SignedRequest,
        now: u64,
    ) -> Result<AuthorizationContext, AuthError> {
        let key = self
            .keys
            .get_active_key(site_id)
            .ok_or(SignatureError::NoActiveKey)?;

        verify_signature(&key, request)?;
        self.replay
            .accept(key.id, &request.nonce, request.timestamp, now)?;
        let rate = self.rate.check_and_consume(key.id, now)?;

        let matrix = self.matrices.get_matrix(site_id);
        authorize_action(&request.action, &matrix)?;

        Ok(AuthorizationContext {
            site_key_id: key.id,
            granted_capabilities: matrix.granted(),
            request_timestamp: request.timestamp,
            rate,
        })
    }

    /// Current quota for a site, without consuming it.
    ///
    /// Every response carries `X-RateLimit-*` headers, including
    /// rejections, where no [`AuthorizationContext`] exists to read them
    /// from. Returns `None` when the site has no active key to attribute
    /// quota to.
    pub fn rate_status(&self, site_id: &str, now: u64) -> Option<RateLimitStatus> {
        let key = self.keys.get_active_key(site_id)?;
        Some(self.rate.status(key.id, now))
    }

    /// Disconnect a site: revoke its key and drop the replay and rate
    /// state scoped to it. Returns `false` if the site had no active key.
    pub fn disconnect(&self, site_id: &str) -> bool {
        let Some(key) = self.keys.get_active_key(site_id) else {
            return false;
        };

        self.keys.revoke_key(site_id);
        self.replay.purge(key.id);
        self.rate.purge(key.id);

        info!(site_id = %site_id, key_id = %key.id, "Site disconnected");
        true
    }

    /// Spawn the periodic eviction sweeps for both in-flight stores.
    pub fn start_cleanup_tasks(&self, interval: Duration) {
        self.replay.start_cleanup_task(interval);
        self.rate.start_cleanup_task(interval);
    }
}
