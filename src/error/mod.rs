//! Error taxonomy for the connector trust boundary.

mod types;

pub use types::{
    AuthError, ConnectorError, ConnectorResult, PermissionError, RateLimitError, ReplayError,
    SignatureError,
};
