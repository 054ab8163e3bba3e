//! Audit sinks: JSON-lines file logger and the no-op sink.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::ConnectorError;

use super::entry::AuthEvent;

/// Destination for audit events.
///
/// Recording is fire-and-forget: a sink failure must never block or
/// change the authentication verdict. Implementations report their own
/// failures through `tracing` and return nothing to the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuthEvent);
}

/// File-backed sink writing one JSON object per line.
pub struct AuditLogger {
    file: Mutex<File>,
    path: PathBuf,
}

impl AuditLogger {
    /// Open (or create) the audit log in append mode, creating parent
    /// directories as needed.
    pub fn new(path: &Path) -> Result<Self, ConnectorError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                debug!(path = %parent.display(), "Creating audit log directory");
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        debug!(path = %path.display(), "Audit logger initialized");

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Path to the audit log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, event: &AuthEvent) -> Result<(), ConnectorError> {
        let json = serde_json::to_string(event)?;

        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(file, "{}", json)?;

        if let Err(e) = file.sync_data() {
            warn!(error = %e, "Failed to sync audit log");
        }

        Ok(())
    }
}

impl AuditSink for AuditLogger {
    fn record(&self, event: &AuthEvent) {
        if let Err(e) = self.write(event) {
            warn!(
                error = %e,
                request_id = %event.request_id,
                "Failed to write audit event"
            );
        }
    }
}

/// Sink that drops every event, for tests or disabled audit logging.
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &AuthEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SignedRequest;
    use std::io::Read;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn event() -> AuthEvent {
        let request = SignedRequest::new("health_check", serde_json::json!({}), 1000);
        AuthEvent::authorized(Uuid::nil(), "site-1", &request, vec![], 3)
    }

    #[test]
    fn test_logger_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("nested/audit.log");

        let logger = AuditLogger::new(&log_path).unwrap();
        assert!(log_path.parent().unwrap().exists());
        assert_eq!(logger.path(), log_path);
    }

    #[test]
    fn test_logger_appends_json_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");

        let logger = AuditLogger::new(&log_path).unwrap();
        logger.record(&event());
        logger.record(&event());

        let mut content = String::new();
        File::open(&log_path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(parsed["site_id"], "site-1");
            assert_eq!(parsed["outcome"]["decision"], "authorized");
        }
    }

    #[test]
    fn test_null_sink_accepts_events() {
        NullAuditSink.record(&event());
    }
}
