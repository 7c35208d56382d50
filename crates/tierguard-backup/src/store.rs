//! Versioned snapshot store with retention and restore

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tierguard_codec::AtomicWriter;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::audit::AuditLogger;
use crate::error::{BackupError, Result};
use crate::lock::{DirectoryLocks, LockScope};
use crate::models::{
    backup_id_for, AuditAction, AuditDetails, AuditEntry, AuditResult, BackupEntry,
    BackupManifest, BackupReason, BackupTags, RetentionPolicy, RollbackResult,
};
use crate::{BACKUP_DIR_NAME, CONFIG_EXTENSIONS, MANIFEST_FILE};

/// Snapshot store for one config directory
///
/// Every snapshot copies the directory's `json`, `properties` and `toml`
/// files. The manifest is the source of truth; snapshot directories missing
/// from it are ignored.
#[derive(Debug, Clone)]
pub struct BackupStore {
    config_dir: PathBuf,
    retention: Option<RetentionPolicy>,
    writer: AtomicWriter,
    audit: AuditLogger,
}

impl BackupStore {
    /// Creates a store for `config_dir` using the limits stored in its manifest
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        BackupStore {
            audit: AuditLogger::new(config_dir.clone()),
            config_dir,
            retention: None,
            writer: AtomicWriter::new(),
        }
    }

    /// Writes `policy` into the manifest on every backup
    ///
    /// Lowered limits take effect at the next [`BackupStore::create_backup`].
    pub fn with_retention(mut self, policy: RetentionPolicy) -> Self {
        self.retention = Some(policy);
        self
    }

    /// The managed config directory
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Directory holding the manifest, audit log and snapshots
    pub fn backup_dir(&self) -> PathBuf {
        self.config_dir.join(BACKUP_DIR_NAME)
    }

    /// Directory holding one snapshot
    pub fn snapshot_dir(&self, backup_id: &str) -> PathBuf {
        self.backup_dir().join(backup_id)
    }

    /// Path of the manifest file
    pub fn manifest_path(&self) -> PathBuf {
        self.backup_dir().join(MANIFEST_FILE)
    }

    /// The audit logger sharing this directory
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub(crate) fn writer(&self) -> &AtomicWriter {
        &self.writer
    }

    /// Loads the manifest, falling back to an empty default
    pub async fn load_manifest(&self) -> BackupManifest {
        let path = self.manifest_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(_) => return BackupManifest::default(),
        };
        match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Backup manifest unreadable, starting a new one");
                BackupManifest::default()
            }
        }
    }

    async fn save_manifest(&self, manifest: &BackupManifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        self.writer.write(&self.manifest_path(), json).await?;
        Ok(())
    }

    /// Snapshots every config file and records the snapshot in the manifest
    ///
    /// Individual copy failures are logged and skipped; the entry is only
    /// restorable when at least one file was copied. Pruning runs right after
    /// the new entry is added. Fails only when the snapshot directory cannot
    /// be created.
    ///
    /// # Returns
    ///
    /// The new backup id
    pub async fn create_backup(&self, reason: BackupReason, tags: BackupTags) -> Result<String> {
        let guard = DirectoryLocks::acquire(&self.config_dir, LockScope::Manifest).await;

        let mut manifest = self.load_manifest().await;
        if let Some(policy) = self.retention {
            manifest.set_policy(policy);
        }

        let timestamp = next_timestamp(&manifest);
        let backup_id = backup_id_for(timestamp);
        let snapshot = self.snapshot_dir(&backup_id);

        fs::create_dir_all(&snapshot)
            .await
            .map_err(|source| BackupError::SnapshotFailed {
                path: snapshot.clone(),
                source,
            })?;

        let mut copied = Vec::new();
        for file in config_files(&self.config_dir).await {
            match fs::copy(self.config_dir.join(&file), snapshot.join(&file)).await {
                Ok(_) => copied.push(file),
                Err(e) => warn!(file = %file, error = %e, "Failed to copy file into snapshot"),
            }
        }

        manifest.backups.push(BackupEntry {
            id: backup_id.clone(),
            timestamp,
            reason,
            can_restore: !copied.is_empty(),
            files: copied.clone(),
            preset_applied: tags.preset_applied,
            hardware_score: tags.hardware_score,
            metadata: tags.metadata,
        });

        for dropped in manifest.prune(Utc::now()) {
            let dir = self.snapshot_dir(&dropped.id);
            match fs::remove_dir_all(&dir).await {
                Ok(()) => debug!(backup_id = %dropped.id, "Pruned backup"),
                Err(e) => debug!(backup_id = %dropped.id, error = %e, "Could not delete pruned snapshot"),
            }
        }

        if let Err(e) = self.save_manifest(&manifest).await {
            error!(backup_id = %backup_id, error = %e, "Failed to save backup manifest");
        }
        drop(guard);

        info!(
            backup_id = %backup_id,
            reason = %reason,
            files = copied.len(),
            "Backup created"
        );

        self.audit
            .record(
                AuditAction::BackupCreated,
                AuditDetails::files(copied).with_backup_id(&backup_id),
                AuditResult::Success,
                Vec::new(),
            )
            .await;

        Ok(backup_id)
    }

    /// Every snapshot, newest first
    pub async fn list_backups(&self) -> Vec<BackupEntry> {
        self.load_manifest().await.sorted()
    }

    /// The newest snapshot of any reason
    pub async fn most_recent_backup(&self) -> Option<BackupEntry> {
        self.list_backups().await.into_iter().next()
    }

    /// Copies a snapshot back over the live files
    ///
    /// The current state is snapshotted first with reason `pre-rollback`, so
    /// a restore can itself be undone. Snapshot contents are read before that
    /// backup is taken because its pruning may delete the snapshot being
    /// restored. Files that fail to copy are reported in `failed` and make
    /// the result unsuccessful without stopping the others.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `NotRestorable` for an entry without
    /// files, `SnapshotFailed` when the pre-rollback backup cannot be taken.
    pub async fn restore_backup(&self, backup_id: &str) -> Result<RollbackResult> {
        let entry = {
            let _guard = DirectoryLocks::acquire(&self.config_dir, LockScope::Manifest).await;
            self.load_manifest().await.find(backup_id).cloned()
        }
        .ok_or_else(|| BackupError::NotFound(backup_id.to_string()))?;

        if !entry.can_restore {
            return Err(BackupError::NotRestorable(backup_id.to_string()));
        }

        info!(backup_id = %backup_id, files = entry.files.len(), "Restoring backup");

        let snapshot = self.snapshot_dir(backup_id);
        let mut contents = Vec::new();
        let mut failed = Vec::new();
        for file in &entry.files {
            if !is_plain_file_name(file) {
                warn!(file = %file, "Refusing to restore path outside the config directory");
                failed.push(file.clone());
                continue;
            }
            match fs::read(snapshot.join(file)).await {
                Ok(bytes) => contents.push((file.clone(), bytes)),
                Err(e) => {
                    error!(file = %file, error = %e, "Snapshot file unreadable");
                    failed.push(file.clone());
                }
            }
        }

        let pre_rollback_id = self
            .create_backup(BackupReason::PreRollback, BackupTags::default())
            .await?;

        let mut restored = Vec::new();
        for (file, bytes) in contents {
            match self.writer.write(&self.config_dir.join(&file), &bytes).await {
                Ok(()) => restored.push(file),
                Err(e) => {
                    error!(file = %file, error = %e, "Failed to restore file");
                    failed.push(file);
                }
            }
        }

        let result = RollbackResult {
            success: failed.is_empty(),
            restored: restored.clone(),
            failed: failed.clone(),
            backup_id: backup_id.to_string(),
            pre_rollback_backup_id: Some(pre_rollback_id),
        };

        self.audit
            .record(
                AuditAction::Rollback,
                AuditDetails::files(restored).with_backup_id(backup_id),
                AuditResult::from_error_count(failed.len()),
                failed.iter().map(|f| format!("Failed to restore: {}", f)).collect(),
            )
            .await;

        info!(
            backup_id = %backup_id,
            restored = result.restored.len(),
            failed = result.failed.len(),
            "Restore complete"
        );

        Ok(result)
    }

    /// Up to `limit` most recent audit entries, newest first
    pub async fn recent_audit_entries(&self, limit: usize) -> Vec<AuditEntry> {
        self.audit.recent_entries(limit).await
    }
}

/// Millisecond timestamp strictly after every entry already in the manifest
fn next_timestamp(manifest: &BackupManifest) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(3);
    match manifest.latest_timestamp() {
        Some(latest) if now <= latest => latest.trunc_subsecs(3) + Duration::milliseconds(1),
        _ => now,
    }
}

/// Names of the snapshot-eligible files directly inside `dir`, sorted
async fn config_files(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list config directory");
            return files;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let path = entry.path();
        let eligible = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| CONFIG_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if let (true, Some(name)) = (eligible, entry.file_name().to_str()) {
            files.push(name.to_string());
        }
    }

    files.sort();
    files
}

fn is_plain_file_name(name: &str) -> bool {
    Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sodium-options.json"), r#"{"a": 1}"#)
            .await
            .unwrap();
        fs::write(dir.path().join("lithium.properties"), "mixin.ai.pathing=true")
            .await
            .unwrap();
        fs::write(dir.path().join("options.txt"), "ignored").await.unwrap();
        dir
    }

    #[tokio::test]
    async fn test_create_backup_copies_config_files_only() {
        let dir = seeded_dir().await;
        let store = BackupStore::new(dir.path());

        let id = store
            .create_backup(BackupReason::Manual, BackupTags::default())
            .await
            .unwrap();

        let entry = store.most_recent_backup().await.unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.files, vec!["lithium.properties", "sodium-options.json"]);
        assert!(entry.can_restore);
        assert!(store.snapshot_dir(&id).join("sodium-options.json").exists());
        assert!(!store.snapshot_dir(&id).join("options.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_directory_backup_is_not_restorable() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path());

        let id = store
            .create_backup(BackupReason::Auto, BackupTags::default())
            .await
            .unwrap();

        let entry = store.most_recent_backup().await.unwrap();
        assert!(!entry.can_restore);
        assert!(matches!(
            store.restore_backup(&id).await,
            Err(BackupError::NotRestorable(_))
        ));
    }

    #[tokio::test]
    async fn test_restore_unknown_id() {
        let dir = seeded_dir().await;
        let store = BackupStore::new(dir.path());
        assert!(matches!(
            store.restore_backup("nope").await,
            Err(BackupError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_backup_ids_are_unique_and_sorted() {
        let dir = seeded_dir().await;
        let store = BackupStore::new(dir.path());

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(
                store
                    .create_backup(BackupReason::Manual, BackupTags::default())
                    .await
                    .unwrap(),
            );
        }

        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, ids);

        let listed: Vec<String> = store.list_backups().await.into_iter().map(|e| e.id).collect();
        let mut newest_first = ids.clone();
        newest_first.reverse();
        assert_eq!(listed, newest_first);
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let dir = seeded_dir().await;
        let store = BackupStore::new(dir.path());
        let file = dir.path().join("sodium-options.json");

        let id = store
            .create_backup(BackupReason::Manual, BackupTags::default())
            .await
            .unwrap();
        fs::write(&file, r#"{"a": 2}"#).await.unwrap();

        let result = store.restore_backup(&id).await.unwrap();

        assert!(result.success);
        assert_eq!(fs::read_to_string(&file).await.unwrap(), r#"{"a": 1}"#);
        let pre = result.pre_rollback_backup_id.unwrap();
        assert_eq!(
            fs::read_to_string(store.snapshot_dir(&pre).join("sodium-options.json"))
                .await
                .unwrap(),
            r#"{"a": 2}"#
        );
    }

    #[tokio::test]
    async fn test_restore_reports_missing_snapshot_files() {
        let dir = seeded_dir().await;
        let store = BackupStore::new(dir.path());
        let id = store
            .create_backup(BackupReason::Manual, BackupTags::default())
            .await
            .unwrap();
        fs::remove_file(store.snapshot_dir(&id).join("lithium.properties"))
            .await
            .unwrap();

        let result = store.restore_backup(&id).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.restored, vec!["sodium-options.json"]);
        assert_eq!(result.failed, vec!["lithium.properties"]);

        let audit = store.recent_audit_entries(1).await;
        assert_eq!(audit[0].action, AuditAction::Rollback);
        assert_eq!(audit[0].result, AuditResult::Partial);
        assert_eq!(audit[0].errors, vec!["Failed to restore: lithium.properties"]);
    }

    #[tokio::test]
    async fn test_restoring_oldest_backup_survives_pruning() {
        let dir = seeded_dir().await;
        let store = BackupStore::new(dir.path()).with_retention(RetentionPolicy {
            max_backups: 2,
            max_age_days: 7,
        });
        let file = dir.path().join("sodium-options.json");

        let oldest = store
            .create_backup(BackupReason::Manual, BackupTags::default())
            .await
            .unwrap();
        fs::write(&file, r#"{"a": 2}"#).await.unwrap();
        store
            .create_backup(BackupReason::Manual, BackupTags::default())
            .await
            .unwrap();

        let result = store.restore_backup(&oldest).await.unwrap();

        assert!(result.success);
        assert_eq!(fs::read_to_string(&file).await.unwrap(), r#"{"a": 1}"#);
        assert_eq!(store.list_backups().await.len(), 2);
    }

    #[tokio::test]
    async fn test_lowered_retention_applies_on_next_create() {
        let dir = seeded_dir().await;
        let store = BackupStore::new(dir.path());
        for _ in 0..5 {
            store
                .create_backup(BackupReason::Manual, BackupTags::default())
                .await
                .unwrap();
        }

        let strict = BackupStore::new(dir.path()).with_retention(RetentionPolicy {
            max_backups: 3,
            max_age_days: 7,
        });
        strict
            .create_backup(BackupReason::Manual, BackupTags::default())
            .await
            .unwrap();

        let manifest = strict.load_manifest().await;
        assert_eq!(manifest.backups.len(), 3);
        assert_eq!(manifest.max_backups, 3);
    }

    #[tokio::test]
    async fn test_expired_entries_are_pruned_with_their_snapshots() {
        let dir = seeded_dir().await;
        let store = BackupStore::new(dir.path());
        let old_id = store
            .create_backup(BackupReason::Manual, BackupTags::default())
            .await
            .unwrap();

        // Age the entry past the retention window
        let mut manifest = store.load_manifest().await;
        manifest.backups[0].timestamp = Utc::now() - Duration::days(30);
        fs::write(store.manifest_path(), serde_json::to_string(&manifest).unwrap())
            .await
            .unwrap();

        store
            .create_backup(BackupReason::Manual, BackupTags::default())
            .await
            .unwrap();

        let ids: Vec<String> = store.list_backups().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 1);
        assert!(!ids.contains(&old_id));
        assert!(!store.snapshot_dir(&old_id).exists());
    }

    #[tokio::test]
    async fn test_backup_records_audit_entry() {
        let dir = seeded_dir().await;
        let store = BackupStore::new(dir.path());
        let id = store
            .create_backup(BackupReason::PrePresetApply, BackupTags::default())
            .await
            .unwrap();

        let entries = store.recent_audit_entries(20).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::BackupCreated);
        assert_eq!(entries[0].details.backup_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("sodium-options.json"));
        assert!(!is_plain_file_name("../escape.json"));
        assert!(!is_plain_file_name("nested/file.json"));
    }
}
