//! Persisted backup and audit records

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of snapshots kept
pub const DEFAULT_MAX_BACKUPS: usize = 10;
/// Default snapshot lifetime in days
pub const DEFAULT_MAX_AGE_DAYS: u32 = 7;
/// Manifest schema version
pub const MANIFEST_VERSION: &str = "1.0";

/// Why a snapshot was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupReason {
    /// Before a preset is applied
    PrePresetApply,
    /// Before a config schema migration
    PreMigration,
    /// Before a rollback or safe boot overwrites files
    PreRollback,
    /// Requested by the user
    Manual,
    /// Scheduled
    Auto,
}

impl fmt::Display for BackupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackupReason::PrePresetApply => "pre-preset-apply",
            BackupReason::PreMigration => "pre-migration",
            BackupReason::PreRollback => "pre-rollback",
            BackupReason::Manual => "manual",
            BackupReason::Auto => "auto",
        })
    }
}

/// One snapshot; immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    /// Sortable id derived from the timestamp, also the snapshot directory name
    pub id: String,
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Why it was taken
    pub reason: BackupReason,
    /// Files actually copied
    pub files: Vec<String>,
    /// Tier being applied when the snapshot was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_applied: Option<String>,
    /// Hardware score at the time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_score: Option<u8>,
    /// True when at least one file was copied
    pub can_restore: bool,
    /// Free-form context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Optional labels recorded on a new snapshot
#[derive(Debug, Clone, Default)]
pub struct BackupTags {
    /// Tier being applied
    pub preset_applied: Option<String>,
    /// Hardware score
    pub hardware_score: Option<u8>,
    /// Free-form context
    pub metadata: Option<Value>,
}

impl BackupTags {
    /// Tags carrying only a metadata bag
    pub fn metadata(metadata: Value) -> Self {
        BackupTags {
            metadata: Some(metadata),
            ..Default::default()
        }
    }
}

/// Limits applied when pruning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Snapshots kept, newest first
    pub max_backups: usize,
    /// Snapshots older than this are dropped
    pub max_age_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy {
            max_backups: DEFAULT_MAX_BACKUPS,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

/// Versioned list of snapshots for one config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    /// Schema version, always `1.0`
    pub version: String,
    /// Snapshots, in no particular order on disk
    pub backups: Vec<BackupEntry>,
    /// Retention count
    pub max_backups: usize,
    /// Retention age
    pub max_age_days: u32,
}

impl Default for BackupManifest {
    fn default() -> Self {
        let policy = RetentionPolicy::default();
        BackupManifest {
            version: MANIFEST_VERSION.to_string(),
            backups: Vec::new(),
            max_backups: policy.max_backups,
            max_age_days: policy.max_age_days,
        }
    }
}

impl BackupManifest {
    /// Retention limits stored in the manifest
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_backups: self.max_backups,
            max_age_days: self.max_age_days,
        }
    }

    /// Overwrites the stored retention limits
    pub fn set_policy(&mut self, policy: RetentionPolicy) {
        self.max_backups = policy.max_backups;
        self.max_age_days = policy.max_age_days;
    }

    /// Drops expired and overflow entries, returning the dropped ones
    ///
    /// Entries older than `max_age_days` are expired. The remaining entries are
    /// sorted newest first and trimmed to `max_backups`. Afterwards `backups`
    /// holds the survivors, newest first.
    pub fn prune(&mut self, now: DateTime<Utc>) -> Vec<BackupEntry> {
        let max_age = Duration::days(i64::from(self.max_age_days));

        let (mut valid, mut dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.backups)
            .into_iter()
            .partition(|entry| now.signed_duration_since(entry.timestamp) <= max_age);

        sort_newest_first(&mut valid);
        if valid.len() > self.max_backups {
            dropped.extend(valid.split_off(self.max_backups));
        }

        self.backups = valid;
        dropped
    }

    /// Entries newest first
    pub fn sorted(&self) -> Vec<BackupEntry> {
        let mut entries = self.backups.clone();
        sort_newest_first(&mut entries);
        entries
    }

    /// Entry with the given id
    pub fn find(&self, id: &str) -> Option<&BackupEntry> {
        self.backups.iter().find(|entry| entry.id == id)
    }

    /// Timestamp of the newest entry
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.backups.iter().map(|entry| entry.timestamp).max()
    }
}

fn sort_newest_first(entries: &mut [BackupEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
}

/// Formats a timestamp as a backup id
///
/// ISO-8601 with millisecond precision, `:` and `.` replaced by `-`, so ids
/// sort lexicographically in chronological order.
pub fn backup_id_for(timestamp: DateTime<Utc>) -> String {
    timestamp
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-")
}

/// Kind of audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    /// A preset was applied
    PresetApplied,
    /// A config schema migration ran
    Migration,
    /// A snapshot was restored
    Rollback,
    /// Safe boot settings were written
    SafeBoot,
    /// The user handed management back to tierguard
    UserReset,
    /// A snapshot was taken
    BackupCreated,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuditAction::PresetApplied => "preset-applied",
            AuditAction::Migration => "migration",
            AuditAction::Rollback => "rollback",
            AuditAction::SafeBoot => "safe-boot",
            AuditAction::UserReset => "user-reset",
            AuditAction::BackupCreated => "backup-created",
        })
    }
}

/// Outcome of an audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditResult {
    /// Everything succeeded
    Success,
    /// Some files failed
    Partial,
    /// Nothing succeeded
    Failed,
}

impl AuditResult {
    /// `Success` with no errors, `Partial` otherwise
    pub fn from_error_count(errors: usize) -> Self {
        if errors == 0 {
            AuditResult::Success
        } else {
            AuditResult::Partial
        }
    }
}

impl fmt::Display for AuditResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuditResult::Success => "success",
            AuditResult::Partial => "partial",
            AuditResult::Failed => "failed",
        })
    }
}

/// Action-specific audit payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDetails {
    /// Tier involved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Schema migrated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_schema: Option<String>,
    /// Schema migrated to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_schema: Option<String>,
    /// Files written, copied or restored
    #[serde(default)]
    pub files_modified: Vec<String>,
    /// Snapshot involved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
    /// Hardware score at the time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_score: Option<u8>,
    /// Whether this was a preview only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

impl AuditDetails {
    /// Details listing only the touched files
    pub fn files(files: Vec<String>) -> Self {
        AuditDetails {
            files_modified: files,
            ..Default::default()
        }
    }

    /// Sets the snapshot id
    pub fn with_backup_id(mut self, backup_id: impl Into<String>) -> Self {
        self.backup_id = Some(backup_id.into());
        self
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// What happened
    pub action: AuditAction,
    /// Action-specific payload
    pub details: AuditDetails,
    /// Outcome
    pub result: AuditResult,
    /// Error messages, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl AuditEntry {
    /// Creates an entry stamped with the current time
    pub fn new(action: AuditAction, details: AuditDetails, result: AuditResult) -> Self {
        AuditEntry {
            timestamp: Utc::now(),
            action,
            details,
            result,
            errors: Vec::new(),
        }
    }

    /// Attaches error messages
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

/// Persisted audit trail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    /// Entries, oldest first
    pub entries: Vec<AuditEntry>,
}

/// Outcome of restoring a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResult {
    /// True only if every file was restored
    pub success: bool,
    /// Files copied back
    pub restored: Vec<String>,
    /// Files that could not be copied back
    pub failed: Vec<String>,
    /// Snapshot restored from
    pub backup_id: String,
    /// Snapshot of the state the restore overwrote
    pub pre_rollback_backup_id: Option<String>,
}

/// Outcome of writing safe boot settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeBootResult {
    /// Snapshot taken before overwriting
    pub backup_id: String,
    /// Files overwritten
    pub modified: Vec<String>,
    /// Files that could not be written
    pub failed: Vec<String>,
}
