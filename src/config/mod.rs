//! Connector configuration.

mod settings;

pub use settings::{AuditConfig, LoggingConfig, SecurityConfig, Settings};
