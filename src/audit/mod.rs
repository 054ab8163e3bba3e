//! Audit logging for authentication decisions.
//!
//! One structured event per outcome, written as JSON lines. Sinks are
//! fire-and-forget: logging fails open, authentication fails closed.

mod entry;
mod logger;
mod sanitize;

pub use entry::{AuthEvent, AuthOutcome};
pub use logger::{AuditLogger, AuditSink, NullAuditSink};
pub use sanitize::sanitize_payload;
