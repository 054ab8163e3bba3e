//! Authentication trust boundary.
//!
//! Signature verification, replay protection, rate limiting, and
//! capability gating, composed by the [`Authenticator`].

mod authenticator;
mod permissions;
mod rate_limit;
mod replay;
mod signature;

pub use authenticator::{Authenticator, AuthorizationContext};
pub use permissions::{
    authorize_action, Capability, InMemoryMatrixProvider, MatrixProvider, PermissionMatrix,
};
pub use rate_limit::{InMemoryRateStore, RateLimitStatus, RateLimiter, RateStore};
pub use replay::{InMemoryReplayStore, ReplayGuard, ReplayStore};
pub use signature::verify_signature;
