//! Backup and audit store for managed config directories
//!
//! Everything lives under `<config_dir>/.launcher-backups/`:
//!
//! ```text
//! backup-manifest.json   versioned list of snapshots
//! audit-log.json         last 100 audit entries
//! <backup-id>/<file>     snapshot copies
//! ```
//!
//! Read-modify-write cycles on the manifest and audit log are serialized per
//! directory through [`DirectoryLocks`].

pub mod audit;
pub mod error;
pub mod lock;
pub mod models;
pub mod recovery;
pub mod store;

pub use audit::{AuditLogger, AUDIT_LOG_CAPACITY};
pub use error::{BackupError, Result};
pub use lock::{DirectoryGuard, DirectoryLocks, LockScope};
pub use models::{
    AuditAction, AuditDetails, AuditEntry, AuditLog, AuditResult, BackupEntry, BackupManifest,
    BackupReason, BackupTags, RetentionPolicy, RollbackResult, SafeBootResult,
};
pub use store::BackupStore;

/// Directory inside the config directory holding all backup state
pub const BACKUP_DIR_NAME: &str = ".launcher-backups";
/// Manifest file name
pub const MANIFEST_FILE: &str = "backup-manifest.json";
/// Audit log file name
pub const AUDIT_LOG_FILE: &str = "audit-log.json";
/// File extensions copied into snapshots
pub const CONFIG_EXTENSIONS: [&str; 3] = ["json", "properties", "toml"];
