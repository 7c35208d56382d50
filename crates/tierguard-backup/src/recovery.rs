//! Safe boot: last-resort overwrite with conservative settings

use serde_json::json;
use tierguard_catalog::safe_boot_configs;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::models::{AuditAction, AuditDetails, AuditResult, BackupReason, BackupTags, SafeBootResult};
use crate::store::BackupStore;

impl BackupStore {
    /// Overwrites the safe boot subset of managed files with minimal-risk settings
    ///
    /// A `pre-rollback` snapshot tagged `safe-boot` is taken first; if it
    /// cannot be taken nothing is overwritten. Files are replaced whole, not
    /// merged, and each is round-trip checked before its atomic write.
    pub async fn apply_safe_boot_mode(&self) -> Result<SafeBootResult> {
        warn!(dir = %self.config_dir().display(), "Applying safe boot mode");

        let backup_id = self
            .create_backup(
                BackupReason::PreRollback,
                BackupTags::metadata(json!({ "reason": "safe-boot" })),
            )
            .await?;

        let mut modified = Vec::new();
        let mut failed = Vec::new();
        let mut errors = Vec::new();

        for (file, tree) in safe_boot_configs() {
            let path = file.path_in(self.config_dir());
            let written = match file.format.serialize_validated(tree, file.section, file.filename) {
                Ok(content) => self.writer().write(&path, content).await,
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => modified.push(file.filename.to_string()),
                Err(e) => {
                    error!(file = file.filename, error = %e, "Failed to write safe boot config");
                    errors.push(format!("{}: {}", file.filename, e));
                    failed.push(file.filename.to_string());
                }
            }
        }

        self.audit()
            .record(
                AuditAction::SafeBoot,
                AuditDetails::files(modified.clone()).with_backup_id(&backup_id),
                AuditResult::from_error_count(failed.len()),
                errors,
            )
            .await;

        info!(backup_id = %backup_id, files = modified.len(), "Safe boot mode applied");

        Ok(SafeBootResult {
            backup_id,
            modified,
            failed,
        })
    }
}
