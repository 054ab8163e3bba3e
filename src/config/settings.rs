//! Configuration settings for the connector.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audit::{AuditLogger, AuditSink, NullAuditSink};
use crate::error::ConnectorError;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Trust boundary tuning.
///
/// The replay window and rate-limit parameters are deployment knobs, not
/// protocol constants. The defaults trade a slightly larger replay
/// surface for tolerance of manager/site clock skew.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Acceptance window for request timestamps, in seconds.
    #[serde(default = "default_replay_window")]
    pub replay_window_seconds: u64,
    /// Maximum requests per site key per window.
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: usize,
    /// Rate limit window in seconds.
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_seconds: u64,
}

/// Logging configuration for the embedding process.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Path to the audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

fn default_replay_window() -> u64 {
    300
}

fn default_rate_limit_requests() -> usize {
    60
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/sitelink/audit.log")
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            replay_window_seconds: default_replay_window(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_seconds: default_rate_limit_window(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
        }
    }
}

impl AuditConfig {
    /// Build the audit sink this configuration asks for: the JSON-lines
    /// file logger at `log_path` when enabled, the discarding sink
    /// otherwise.
    pub fn build_sink(&self) -> Result<Arc<dyn AuditSink>, ConnectorError> {
        if self.enabled {
            Ok(Arc::new(AuditLogger::new(&self.log_path)?))
        } else {
            Ok(Arc::new(NullAuditSink))
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConnectorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConnectorError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| ConnectorError::Config {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), ConnectorError> {
        if self.security.replay_window_seconds == 0 {
            return Err(ConnectorError::Config {
                message: "replay_window_seconds must be positive".to_string(),
            });
        }

        if self.security.rate_limit_requests == 0 || self.security.rate_limit_window_seconds == 0 {
            return Err(ConnectorError::Config {
                message: "rate limit parameters must be positive".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConnectorError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ConnectorError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        Ok(())
    }
}
