//! Append-only audit trail capped at the most recent entries

use std::path::{Path, PathBuf};

use tierguard_codec::AtomicWriter;
use tokio::fs;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::lock::{DirectoryLocks, LockScope};
use crate::models::{AuditAction, AuditDetails, AuditEntry, AuditLog, AuditResult};
use crate::{AUDIT_LOG_FILE, BACKUP_DIR_NAME};

/// Entries kept in the audit log; older ones are dropped silently
pub const AUDIT_LOG_CAPACITY: usize = 100;

/// Default number of entries returned by [`AuditLogger::recent_entries`]
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// Records operations on one config directory
///
/// Recording never fails the caller: a broken audit log is reported through
/// `tracing` and otherwise ignored.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    config_dir: PathBuf,
    writer: AtomicWriter,
}

impl AuditLogger {
    /// Creates a logger for `config_dir`
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        AuditLogger {
            config_dir: config_dir.into(),
            writer: AtomicWriter::new(),
        }
    }

    /// Path of the audit log file
    pub fn log_path(&self) -> PathBuf {
        self.config_dir.join(BACKUP_DIR_NAME).join(AUDIT_LOG_FILE)
    }

    /// Appends an entry stamped with the current time
    pub async fn record(
        &self,
        action: AuditAction,
        details: AuditDetails,
        result: AuditResult,
        errors: Vec<String>,
    ) {
        self.append(AuditEntry::new(action, details, result).with_errors(errors))
            .await;
    }

    /// Appends an entry, truncating the log to [`AUDIT_LOG_CAPACITY`]
    pub async fn append(&self, entry: AuditEntry) {
        let action = entry.action;
        if let Err(e) = self.try_append(entry).await {
            error!(action = %action, error = %e, "Failed to write audit entry");
        }
    }

    async fn try_append(&self, entry: AuditEntry) -> Result<()> {
        let _guard = DirectoryLocks::acquire(&self.config_dir, LockScope::AuditLog).await;

        let mut log = load_log(&self.log_path()).await;
        log.entries.push(entry);
        if log.entries.len() > AUDIT_LOG_CAPACITY {
            let overflow = log.entries.len() - AUDIT_LOG_CAPACITY;
            log.entries.drain(..overflow);
        }

        let json = serde_json::to_string_pretty(&log)?;
        self.writer.write(&self.log_path(), json).await?;

        debug!(entries = log.entries.len(), "Audit entry recorded");
        Ok(())
    }

    /// Up to `limit` most recent entries, newest first
    pub async fn recent_entries(&self, limit: usize) -> Vec<AuditEntry> {
        let log = load_log(&self.log_path()).await;
        log.entries.into_iter().rev().take(limit).collect()
    }
}

/// Loads the log, treating a missing or unreadable file as empty
async fn load_log(path: &Path) -> AuditLog {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(_) => return AuditLog::default(),
    };
    match serde_json::from_str(&content) {
        Ok(log) => log,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Audit log unreadable, starting a new one");
            AuditLog::default()
        }
    }
}
