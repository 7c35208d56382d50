//! Preset orchestrator
//!
//! Drives a full preset apply against one game directory:
//!
//! 1. create `<game_dir>/config` if needed and take the directory's operation lock
//! 2. stop early when the user manages the files themselves
//! 3. resolve the tier (hardware recommendation for `auto`)
//! 4. fold incompatibility workarounds into the per-file sources
//! 5. flag files whose hash no longer matches what was last written
//! 6. return a simulation instead when a dry run is requested
//! 7. snapshot the directory
//! 8. merge, validate and atomically write each managed file
//! 9. record hashes and tier in the config metadata
//! 10. append a `preset-applied` audit entry
//!
//! Anything escaping those steps triggers one safe boot attempt before the
//! error is returned as [`PresetError::ApplyFailed`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tierguard_backup::{
    AuditAction, AuditDetails, AuditResult, BackupReason, BackupStore, BackupTags,
    DirectoryLocks, LockScope, RetentionPolicy, RollbackResult, SafeBootResult,
};
use tierguard_catalog::{evaluate, preset_for, safe_boot_configs, ManagedFile, MANAGED_FILES};
use tierguard_codec::{content_hash, deep_merge, AtomicWriter, CodecError, ConfigTree};
use tierguard_hardware::{HardwareInfo, HardwareProfiler, PresetChoice, Tier};
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::dry_run::{load_tree, simulate, DryRunOptions, DryRunResult, UserModifications};
use crate::error::{PresetError, Result};
use crate::metadata::{ConfigMetadata, MetadataStore, APPLIED_METADATA_VERSION};
use crate::mods::{ModEnumerator, ModsDirectory};

/// Name of the config folder inside a game directory
pub const CONFIG_DIR_NAME: &str = "config";

/// Observer for coarse progress milestones: `(label, percent)`
pub type ProgressSink = Arc<dyn Fn(&str, u8) + Send + Sync>;

/// Switches for one apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyOptions {
    /// Simulate only
    pub dry_run: bool,
    /// Apply even when the user manages the files
    pub force_overwrite: bool,
    /// Keep existing keys of files the user edited
    pub preserve_user_modifications: bool,
    /// Run the incompatibility catalog
    pub check_incompatibilities: bool,
    /// Snapshot the directory before writing
    pub create_backup: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        ApplyOptions {
            dry_run: false,
            force_overwrite: false,
            preserve_user_modifications: true,
            check_incompatibilities: true,
            create_backup: true,
        }
    }
}

/// Outcome of [`PresetOrchestrator::apply_preset`]
///
/// `success` is true only when no file failed; partial success is reported
/// through `applied_files` and `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetApplicationResult {
    /// True when no error occurred
    pub success: bool,
    /// Tier applied, or the requested choice when nothing was resolved
    pub preset: String,
    /// Files written
    pub applied_files: Vec<String>,
    /// Files left alone
    pub skipped_files: Vec<String>,
    /// Non-fatal notes
    pub warnings: Vec<String>,
    /// Per-file failures, `"<file>: <error>"`
    pub errors: Vec<String>,
    /// Snapshot taken before writing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
    /// Ids of matched incompatibility rules
    pub incompatibilities_detected: Vec<String>,
    /// Ids of rules whose workaround was folded in
    pub workarounds_applied: Vec<String>,
    /// Simulation, when the apply was a dry run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<DryRunResult>,
}

/// Applies, rolls back and recovers tier presets for game directories
#[derive(Clone)]
pub struct PresetOrchestrator {
    profiler: HardwareProfiler,
    mods: Arc<dyn ModEnumerator>,
    retention: Option<RetentionPolicy>,
    progress: Option<ProgressSink>,
    writer: AtomicWriter,
}

impl PresetOrchestrator {
    /// Creates an orchestrator reading mods from `<game_dir>/mods`
    pub fn new(profiler: HardwareProfiler) -> Self {
        PresetOrchestrator {
            profiler,
            mods: Arc::new(ModsDirectory),
            retention: None,
            progress: None,
            writer: AtomicWriter::new(),
        }
    }

    /// Replaces the installed-mod enumerator
    pub fn with_mod_enumerator(mut self, mods: Arc<dyn ModEnumerator>) -> Self {
        self.mods = mods;
        self
    }

    /// Retention limits written into the manifest on every snapshot
    pub fn with_retention(mut self, policy: RetentionPolicy) -> Self {
        self.retention = Some(policy);
        self
    }

    /// Registers a progress observer
    pub fn with_progress<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str, u8) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// The hardware profiler used for `auto`
    pub fn profiler(&self) -> &HardwareProfiler {
        &self.profiler
    }

    /// `<game_dir>/config`
    pub fn config_dir(game_dir: &Path) -> PathBuf {
        game_dir.join(CONFIG_DIR_NAME)
    }

    /// Snapshot store for a game directory's config folder
    pub fn backup_store(&self, game_dir: &Path) -> BackupStore {
        let store = BackupStore::new(Self::config_dir(game_dir));
        match self.retention {
            Some(policy) => store.with_retention(policy),
            None => store,
        }
    }

    fn report(&self, label: &str, percent: u8) {
        if let Some(sink) = &self.progress {
            sink(label, percent);
        }
    }

    /// Applies a tier preset to every managed file of `game_dir`
    ///
    /// Per-file failures are collected in the result. Only a failure outside
    /// the per-file steps is returned as an error, after one safe boot attempt.
    pub async fn apply_preset(
        &self,
        game_dir: &Path,
        choice: PresetChoice,
        options: &ApplyOptions,
    ) -> Result<PresetApplicationResult> {
        info!(game_dir = %game_dir.display(), preset = %choice, "Starting preset application");
        self.report("Configuring optimizations", 90);

        match self.run_apply(game_dir, choice, options).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(error = %e, "Critical error during preset application");
                let recovered = self.recover(game_dir).await;
                Err(PresetError::ApplyFailed {
                    message: e.to_string(),
                    recovered,
                })
            }
        }
    }

    async fn run_apply(
        &self,
        game_dir: &Path,
        choice: PresetChoice,
        options: &ApplyOptions,
    ) -> Result<PresetApplicationResult> {
        let config_dir = Self::config_dir(game_dir);
        fs::create_dir_all(&config_dir).await?;
        let _operation = DirectoryLocks::acquire(&config_dir, LockScope::Operation).await;

        let metadata_store = MetadataStore::new(&config_dir);
        let metadata = metadata_store.load().await;

        let mut result = PresetApplicationResult {
            success: true,
            preset: choice.to_string(),
            ..Default::default()
        };

        if metadata.user_managed && !options.force_overwrite {
            info!("User-managed mode enabled, skipping preset application");
            result.skipped_files = MANAGED_FILES.iter().map(|f| f.filename.to_string()).collect();
            return Ok(result);
        }

        let hardware = self.profiler.detect().await;
        let tier = match choice {
            PresetChoice::Auto => {
                info!(
                    tier = %hardware.recommended_preset,
                    score = hardware.score,
                    ram_gb = hardware.total_ram_gb,
                    cores = hardware.cpu_cores,
                    gpu = %hardware.gpu_name,
                    "Auto-detected preset"
                );
                hardware.recommended_preset
            }
            PresetChoice::Fixed(tier) => {
                info!(tier = %tier, score = hardware.score, "Using selected preset");
                tier
            }
        };
        result.preset = tier.to_string();

        let mut sources: Vec<(ManagedFile, ConfigTree)> = MANAGED_FILES
            .iter()
            .map(|file| (*file, preset_for(file.filename, tier).cloned().unwrap_or_default()))
            .collect();

        if options.check_incompatibilities {
            self.report("Checking incompatibilities", 91);
            self.fold_workarounds(game_dir, &config_dir, &hardware, &mut sources, &mut result)
                .await;
        }

        self.report("Checking modifications", 92);
        let mut user_modified = HashMap::new();
        for file in MANAGED_FILES.iter() {
            if metadata_store.is_user_modified(&metadata, file).await {
                info!(file = file.filename, "User modifications detected");
                if options.preserve_user_modifications && holds_safe_boot(&config_dir, file).await {
                    warn!(file = file.filename, "Safe boot settings will be preserved");
                    result.warnings.push(format!(
                        "{}: still holds safe boot settings; apply without preserving user modifications to replace them",
                        file.filename
                    ));
                }
                user_modified.insert(file.filename.to_string(), UserModifications::WholeFile);
            }
        }

        if options.dry_run {
            info!(tier = %tier, "Running in dry run mode");
            let dry_options = DryRunOptions {
                preserve_user_modifications: options.preserve_user_modifications,
                ..Default::default()
            };
            let mut simulation = simulate(&config_dir, &sources, &user_modified, &dry_options).await;
            simulation.summary.preset = tier.to_string();
            debug!("\n{}", simulation);

            result.success = simulation.success;
            result.warnings.extend(simulation.warnings.iter().cloned());
            result.errors.extend(simulation.errors.iter().cloned());
            result.dry_run = Some(simulation);
            return Ok(result);
        }

        if options.create_backup {
            self.report("Creating backup", 93);
            let store = self.backup_store(game_dir);
            let tags = BackupTags {
                preset_applied: Some(tier.to_string()),
                hardware_score: Some(hardware.score),
                metadata: serde_json::to_value(&hardware).ok(),
            };
            match store.create_backup(BackupReason::PrePresetApply, tags).await {
                Ok(id) => {
                    info!(backup_id = %id, "Backup created");
                    result.backup_id = Some(id);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to create backup");
                    result.warnings.push("Failed to create backup".to_string());
                }
            }
        }

        self.report("Applying optimizations", 94);
        let mut hashes = BTreeMap::new();
        for (file, source) in &sources {
            let preserve = options.preserve_user_modifications
                && user_modified.contains_key(file.filename);

            match self.apply_file(&config_dir, file, source, preserve).await {
                Ok(hash) => {
                    debug!(file = file.filename, tier = %tier, preserve, "Applied config");
                    hashes.insert(file.filename.to_string(), hash);
                    result.applied_files.push(file.filename.to_string());
                }
                Err(e) => {
                    error!(file = file.filename, error = %e, "Failed to apply config");
                    result.errors.push(format!("{}: {}", file.filename, e));
                    result.success = false;
                }
            }
        }

        let updated = metadata_store
            .update(|m| {
                m.version = APPLIED_METADATA_VERSION.to_string();
                m.last_applied_preset = Some(tier);
                m.hashes.extend(hashes);
            })
            .await;
        if let Err(e) = updated {
            error!(error = %e, "Failed to update config metadata");
            result
                .warnings
                .push("Failed to update config metadata; hand edits may not be detected next time".to_string());
        }

        let details = AuditDetails {
            preset: Some(tier.to_string()),
            files_modified: result.applied_files.clone(),
            backup_id: result.backup_id.clone(),
            hardware_score: Some(hardware.score),
            ..Default::default()
        };
        self.backup_store(game_dir)
            .audit()
            .record(
                AuditAction::PresetApplied,
                details,
                AuditResult::from_error_count(result.errors.len()),
                result.errors.clone(),
            )
            .await;

        info!(
            applied = result.applied_files.len(),
            errors = result.errors.len(),
            "Preset application complete"
        );
        self.report("Optimizations applied", 95);

        Ok(result)
    }

    /// Runs the incompatibility catalog and merges its patches into `sources`
    async fn fold_workarounds(
        &self,
        game_dir: &Path,
        config_dir: &Path,
        hardware: &HardwareInfo,
        sources: &mut [(ManagedFile, ConfigTree)],
        result: &mut PresetApplicationResult,
    ) {
        let installed_mods = self.mods.list_installed_mods(game_dir).await;

        let mut current = BTreeMap::new();
        for (file, preset) in sources.iter() {
            let loaded = load_tree(&file.path_in(config_dir), file.format).await;
            current.insert(file.filename.to_string(), deep_merge(&loaded, preset, true));
        }

        let report = evaluate(hardware, &installed_mods, &current);

        for (file, source) in sources.iter_mut() {
            if let Some(patch) = report.patches.get(file.filename) {
                info!(file = file.filename, "Applied workaround");
                *source = deep_merge(source, patch, false);
            }
        }

        if !report.detected.is_empty() {
            info!(detected = %report.detected.join(", "), "Detected incompatibilities");
        }
        result.incompatibilities_detected = report.detected;
        result.workarounds_applied = report.applied_workarounds;
        result.warnings.extend(report.warnings);
    }

    /// Merges `source` into one file and writes it atomically
    ///
    /// # Returns
    ///
    /// The hash of the written content
    async fn apply_file(
        &self,
        config_dir: &Path,
        file: &ManagedFile,
        source: &ConfigTree,
        preserve: bool,
    ) -> std::result::Result<String, CodecError> {
        let path = file.path_in(config_dir);
        let existing = load_tree(&path, file.format).await;
        let merged = deep_merge(&existing, source, preserve);

        let content = file
            .format
            .serialize_validated(&merged, file.section, file.filename)?;
        self.writer.write(&path, &content).await?;

        Ok(content_hash(content))
    }

    async fn recover(&self, game_dir: &Path) -> bool {
        warn!("Attempting safe boot mode recovery");
        match self.apply_safe_boot(game_dir).await {
            Ok(outcome) => {
                warn!(backup_id = %outcome.backup_id, "Applied safe boot mode due to critical error");
                true
            }
            Err(e) => {
                error!(error = %e, "Safe boot recovery also failed");
                false
            }
        }
    }

    /// Restores the most recent snapshot of any reason
    ///
    /// # Errors
    ///
    /// [`PresetError::NoBackup`] when the directory has no snapshots.
    pub async fn rollback_preset(&self, game_dir: &Path) -> Result<RollbackResult> {
        let config_dir = Self::config_dir(game_dir);
        let _operation = DirectoryLocks::acquire(&config_dir, LockScope::Operation).await;

        info!(dir = %config_dir.display(), "Rolling back to previous configuration");
        let store = self.backup_store(game_dir);
        let latest = store.most_recent_backup().await.ok_or(PresetError::NoBackup)?;

        let outcome = store.restore_backup(&latest.id).await?;
        info!(backup_id = %latest.id, "Rollback complete");
        Ok(outcome)
    }

    /// Restores a specific snapshot
    pub async fn restore_backup(&self, game_dir: &Path, backup_id: &str) -> Result<RollbackResult> {
        let config_dir = Self::config_dir(game_dir);
        let _operation = DirectoryLocks::acquire(&config_dir, LockScope::Operation).await;
        Ok(self.backup_store(game_dir).restore_backup(backup_id).await?)
    }

    /// Takes a manual snapshot
    pub async fn create_manual_backup(&self, game_dir: &Path) -> Result<String> {
        let config_dir = Self::config_dir(game_dir);
        fs::create_dir_all(&config_dir).await?;
        let _operation = DirectoryLocks::acquire(&config_dir, LockScope::Operation).await;
        Ok(self
            .backup_store(game_dir)
            .create_backup(BackupReason::Manual, BackupTags::default())
            .await?)
    }

    /// Overwrites the safe boot subset with conservative settings
    pub async fn apply_safe_boot(&self, game_dir: &Path) -> Result<SafeBootResult> {
        let config_dir = Self::config_dir(game_dir);
        let _operation = DirectoryLocks::acquire(&config_dir, LockScope::Operation).await;
        Ok(self.backup_store(game_dir).apply_safe_boot_mode().await?)
    }

    /// Opts the directory out of (or back into) automatic management
    ///
    /// Handing management back to tierguard records a `user-reset` audit entry.
    pub async fn set_user_managed(&self, game_dir: &Path, user_managed: bool) -> Result<ConfigMetadata> {
        let config_dir = Self::config_dir(game_dir);
        fs::create_dir_all(&config_dir).await?;
        let _operation = DirectoryLocks::acquire(&config_dir, LockScope::Operation).await;

        let mut was_user_managed = false;
        let metadata = MetadataStore::new(&config_dir)
            .update(|m| {
                was_user_managed = m.user_managed;
                m.user_managed = user_managed;
            })
            .await?;

        if was_user_managed && !user_managed {
            self.backup_store(game_dir)
                .audit()
                .record(
                    AuditAction::UserReset,
                    AuditDetails::default(),
                    AuditResult::Success,
                    Vec::new(),
                )
                .await;
        }

        info!(user_managed, "Management mode updated");
        Ok(metadata)
    }

    /// Tier that `choice` resolves to on this host
    pub async fn resolve_tier(&self, choice: PresetChoice) -> Tier {
        match choice {
            PresetChoice::Auto => self.profiler.detect().await.recommended_preset,
            PresetChoice::Fixed(tier) => tier,
        }
    }
}

/// Whether `file` still holds exactly what safe boot wrote
///
/// Safe boot leaves the stored hashes alone, so such a file looks hand-edited.
async fn holds_safe_boot(config_dir: &Path, file: &ManagedFile) -> bool {
    let Some((_, safe)) = safe_boot_configs().iter().find(|(f, _)| f.filename == file.filename) else {
        return false;
    };
    load_tree(&file.path_in(config_dir), file.format).await == *safe
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tierguard_backup::AuditEntry;
    use tierguard_codec::{ConfigFormat, KeyPath};
    use tierguard_hardware::{FixedProbe, GpuType};

    use crate::metadata::METADATA_FILE;
    use crate::mods::StaticMods;

    fn orchestrator() -> PresetOrchestrator {
        PresetOrchestrator::new(HardwareProfiler::new(Arc::new(FixedProbe::desktop())))
            .with_mod_enumerator(Arc::new(StaticMods::default()))
    }

    async fn audit(game_dir: &Path) -> Vec<AuditEntry> {
        orchestrator()
            .backup_store(game_dir)
            .recent_audit_entries(100)
            .await
    }

    #[tokio::test]
    async fn test_apply_writes_every_managed_file() {
        let game = tempfile::tempdir().unwrap();
        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::Balanced), &ApplyOptions::default())
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.preset, "balanced");
        assert_eq!(result.applied_files.len(), MANAGED_FILES.len());

        let config_dir = PresetOrchestrator::config_dir(game.path());
        for file in MANAGED_FILES.iter() {
            let written = fs::read_to_string(file.path_in(&config_dir)).await.unwrap();
            let tree = file.format.parse(&written).unwrap();
            let preset = preset_for(file.filename, Tier::Balanced).unwrap();
            assert_eq!(deep_merge(&tree, preset, false), tree, "{}", file.filename);
        }
    }

    #[tokio::test]
    async fn test_auto_uses_hardware_recommendation() {
        let game = tempfile::tempdir().unwrap();
        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Auto, &ApplyOptions::default())
            .await
            .unwrap();

        let expected = orchestrator().profiler().detect().await.recommended_preset;
        assert_eq!(result.preset, expected.to_string());
    }

    #[tokio::test]
    async fn test_apply_records_metadata_and_audit() {
        let game = tempfile::tempdir().unwrap();
        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::HighEnd), &ApplyOptions::default())
            .await
            .unwrap();

        let config_dir = PresetOrchestrator::config_dir(game.path());
        let metadata = MetadataStore::new(&config_dir).load().await;
        assert_eq!(metadata.version, APPLIED_METADATA_VERSION);
        assert_eq!(metadata.last_applied_preset, Some(Tier::HighEnd));
        assert_eq!(metadata.hashes.len(), MANAGED_FILES.len());

        let entries = audit(game.path()).await;
        let applied = entries
            .iter()
            .find(|e| e.action == AuditAction::PresetApplied)
            .unwrap();
        assert_eq!(applied.result, AuditResult::Success);
        assert_eq!(applied.details.backup_id, result.backup_id);
        assert_eq!(applied.details.files_modified.len(), MANAGED_FILES.len());
    }

    #[tokio::test]
    async fn test_apply_takes_pre_apply_backup() {
        let game = tempfile::tempdir().unwrap();
        let config_dir = PresetOrchestrator::config_dir(game.path());
        fs::create_dir_all(&config_dir).await.unwrap();
        fs::write(config_dir.join("sodium-options.json"), "{\"custom\": 1}")
            .await
            .unwrap();

        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::LowEnd), &ApplyOptions::default())
            .await
            .unwrap();

        let backup_id = result.backup_id.unwrap();
        let entry = orchestrator()
            .backup_store(game.path())
            .most_recent_backup()
            .await
            .unwrap();
        assert_eq!(entry.id, backup_id);
        assert_eq!(entry.reason, BackupReason::PrePresetApply);
        assert_eq!(entry.preset_applied.as_deref(), Some("low-end"));
        assert_eq!(entry.files, vec!["sodium-options.json"]);
    }

    #[tokio::test]
    async fn test_no_backup_option_skips_snapshot() {
        let game = tempfile::tempdir().unwrap();
        let options = ApplyOptions {
            create_backup: false,
            ..Default::default()
        };

        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::Balanced), &options)
            .await
            .unwrap();

        assert!(result.backup_id.is_none());
        assert!(orchestrator().backup_store(game.path()).list_backups().await.is_empty());
    }

    #[tokio::test]
    async fn test_user_managed_short_circuits() {
        let game = tempfile::tempdir().unwrap();
        orchestrator().set_user_managed(game.path(), true).await.unwrap();

        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::Balanced), &ApplyOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.applied_files.is_empty());
        assert_eq!(result.skipped_files.len(), MANAGED_FILES.len());
        let config_dir = PresetOrchestrator::config_dir(game.path());
        assert!(!config_dir.join("sodium-options.json").exists());
    }

    #[tokio::test]
    async fn test_force_overrides_user_managed() {
        let game = tempfile::tempdir().unwrap();
        orchestrator().set_user_managed(game.path(), true).await.unwrap();

        let options = ApplyOptions {
            force_overwrite: true,
            ..Default::default()
        };
        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::Balanced), &options)
            .await
            .unwrap();

        assert_eq!(result.applied_files.len(), MANAGED_FILES.len());
    }

    #[tokio::test]
    async fn test_returning_to_auto_is_audited() {
        let game = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator();

        orchestrator.set_user_managed(game.path(), true).await.unwrap();
        assert!(audit(game.path()).await.is_empty());

        let metadata = orchestrator.set_user_managed(game.path(), false).await.unwrap();
        assert!(!metadata.user_managed);
        let entries = audit(game.path()).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::UserReset);
    }

    #[tokio::test]
    async fn test_user_edits_are_preserved_on_reapply() {
        let game = tempfile::tempdir().unwrap();
        let config_dir = PresetOrchestrator::config_dir(game.path());
        let orchestrator = orchestrator();

        orchestrator
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::HighEnd), &ApplyOptions::default())
            .await
            .unwrap();

        let path = config_dir.join("entityculling.json");
        fs::write(&path, "{\"tracingDistance\": 999}").await.unwrap();

        orchestrator
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::LowEnd), &ApplyOptions::default())
            .await
            .unwrap();

        let tree = ConfigFormat::Json
            .parse(&fs::read_to_string(&path).await.unwrap())
            .unwrap();
        assert_eq!(tree.get("tracingDistance"), Some(&serde_json::json!(999)));
        assert!(tree.len() > 1);
    }

    #[tokio::test]
    async fn test_user_edits_overwritten_without_preserve() {
        let game = tempfile::tempdir().unwrap();
        let config_dir = PresetOrchestrator::config_dir(game.path());
        let orchestrator = orchestrator();

        orchestrator
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::HighEnd), &ApplyOptions::default())
            .await
            .unwrap();

        let path = config_dir.join("entityculling.json");
        fs::write(&path, "{\"tracingDistance\": 999}").await.unwrap();

        let options = ApplyOptions {
            preserve_user_modifications: false,
            ..Default::default()
        };
        orchestrator
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::LowEnd), &options)
            .await
            .unwrap();

        let tree = ConfigFormat::Json
            .parse(&fs::read_to_string(&path).await.unwrap())
            .unwrap();
        let preset = preset_for("entityculling.json", Tier::LowEnd).unwrap();
        assert_eq!(tree.get("tracingDistance"), preset.get("tracingDistance"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let game = tempfile::tempdir().unwrap();
        let options = ApplyOptions {
            dry_run: true,
            ..Default::default()
        };

        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::Balanced), &options)
            .await
            .unwrap();

        let simulation = result.dry_run.unwrap();
        assert_eq!(simulation.summary.preset, "balanced");
        assert_eq!(simulation.changes.len(), MANAGED_FILES.len());
        assert!(result.applied_files.is_empty());
        assert!(result.backup_id.is_none());

        let config_dir = PresetOrchestrator::config_dir(game.path());
        let mut entries = fs::read_dir(&config_dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
        assert!(!config_dir.join(METADATA_FILE).exists());
    }

    #[tokio::test]
    async fn test_workarounds_are_written() {
        let game = tempfile::tempdir().unwrap();
        let probe = FixedProbe::desktop().with_gpu(GpuType::Integrated, "Intel(R) UHD Graphics 620");
        let orchestrator = PresetOrchestrator::new(HardwareProfiler::new(Arc::new(probe)))
            .with_mod_enumerator(Arc::new(StaticMods::default()));

        let result = orchestrator
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::HighEnd), &ApplyOptions::default())
            .await
            .unwrap();

        assert!(!result.workarounds_applied.is_empty());

        let config_dir = PresetOrchestrator::config_dir(game.path());
        let sodium = ConfigFormat::Json
            .parse(
                &fs::read_to_string(config_dir.join("sodium-options.json"))
                    .await
                    .unwrap(),
            )
            .unwrap();
        let v_sync = sodium.get_path(&KeyPath::new(["rendering", "v_sync"]));
        assert_eq!(v_sync, Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn test_progress_milestones() {
        let game = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        orchestrator()
            .with_progress(move |_, percent| sink.lock().unwrap().push(percent))
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::Balanced), &ApplyOptions::default())
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![90, 91, 92, 93, 94, 95]);
    }

    #[tokio::test]
    async fn test_unusable_config_dir_fails_with_recovery_attempt() {
        let game = tempfile::tempdir().unwrap();
        fs::write(game.path().join(CONFIG_DIR_NAME), "not a directory")
            .await
            .unwrap();

        let err = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::Balanced), &ApplyOptions::default())
            .await
            .unwrap_err();

        match err {
            PresetError::ApplyFailed { recovered, .. } => assert!(!recovered),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_rollback_without_backup_fails() {
        let game = tempfile::tempdir().unwrap();
        let err = orchestrator().rollback_preset(game.path()).await.unwrap_err();
        assert!(matches!(err, PresetError::NoBackup));
    }

    #[tokio::test]
    async fn test_rollback_restores_pre_apply_state() {
        let game = tempfile::tempdir().unwrap();
        let config_dir = PresetOrchestrator::config_dir(game.path());
        fs::create_dir_all(&config_dir).await.unwrap();
        let path = config_dir.join("lithium.properties");
        fs::write(&path, "mixin.ai=false\n").await.unwrap();

        let orchestrator = orchestrator();
        orchestrator
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::HighEnd), &ApplyOptions::default())
            .await
            .unwrap();
        assert_ne!(fs::read_to_string(&path).await.unwrap(), "mixin.ai=false\n");

        let outcome = orchestrator.rollback_preset(game.path()).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.pre_rollback_backup_id.is_some());
        assert_eq!(fs::read_to_string(&path).await.unwrap(), "mixin.ai=false\n");
    }

    #[tokio::test]
    async fn test_restore_unknown_backup_surfaces_not_found() {
        let game = tempfile::tempdir().unwrap();
        let err = orchestrator()
            .restore_backup(game.path(), "2020-01-01T00-00-00-000Z")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PresetError::Backup(tierguard_backup::BackupError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_applies_are_serialized() {
        let game = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator();

        let options = ApplyOptions::default();
        let (a, b) = tokio::join!(
            orchestrator.apply_preset(game.path(), PresetChoice::Fixed(Tier::LowEnd), &options),
            orchestrator.apply_preset(game.path(), PresetChoice::Fixed(Tier::HighEnd), &options),
        );
        assert!(a.unwrap().success);
        assert!(b.unwrap().success);

        let backups = orchestrator.backup_store(game.path()).list_backups().await;
        assert_eq!(backups.len(), 2);
        let applied = audit(game.path())
            .await
            .into_iter()
            .filter(|e| e.action == AuditAction::PresetApplied)
            .count();
        assert_eq!(applied, 2);
    }

    #[tokio::test]
    async fn test_failed_file_does_not_stop_siblings() {
        let game = tempfile::tempdir().unwrap();
        let config_dir = PresetOrchestrator::config_dir(game.path());
        let blocked = config_dir.join("sodium-options.json");
        fs::create_dir_all(&blocked).await.unwrap();
        fs::write(blocked.join("keep"), "x").await.unwrap();

        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::Balanced), &ApplyOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("sodium-options.json: "));
        let expected: Vec<String> = MANAGED_FILES
            .iter()
            .filter(|f| f.filename != "sodium-options.json")
            .map(|f| f.filename.to_string())
            .collect();
        assert_eq!(result.applied_files, expected);

        let metadata = MetadataStore::new(&config_dir).load().await;
        let hashed: Vec<String> = metadata.hashes.keys().cloned().collect();
        let mut sorted = expected.clone();
        sorted.sort();
        assert_eq!(hashed, sorted);

        let entries = audit(game.path()).await;
        let applied = entries
            .iter()
            .find(|e| e.action == AuditAction::PresetApplied)
            .unwrap();
        assert_eq!(applied.result, AuditResult::Partial);
    }

    #[tokio::test]
    async fn test_metadata_failure_is_reported_as_warning() {
        let game = tempfile::tempdir().unwrap();
        let config_dir = PresetOrchestrator::config_dir(game.path());
        let blocked = config_dir.join(METADATA_FILE);
        fs::create_dir_all(&blocked).await.unwrap();
        fs::write(blocked.join("keep"), "x").await.unwrap();

        let result = orchestrator()
            .apply_preset(game.path(), PresetChoice::Fixed(Tier::Balanced), &ApplyOptions::default())
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.applied_files.len(), MANAGED_FILES.len());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.starts_with("Failed to update config metadata")));
    }

    #[tokio::test]
    async fn test_preserved_safe_boot_settings_are_flagged() {
        let game = tempfile::tempdir().unwrap();
        let config_dir = PresetOrchestrator::config_dir(game.path());
        let orchestrator = orchestrator();
        let high_end = PresetChoice::Fixed(Tier::HighEnd);

        orchestrator
            .apply_preset(game.path(), high_end, &ApplyOptions::default())
            .await
            .unwrap();
        orchestrator.apply_safe_boot(game.path()).await.unwrap();

        let result = orchestrator
            .apply_preset(game.path(), high_end, &ApplyOptions::default())
            .await
            .unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.starts_with("sodium-options.json: still holds safe boot settings")));
        let sodium = ConfigFormat::Json
            .parse(&fs::read_to_string(config_dir.join("sodium-options.json")).await.unwrap())
            .unwrap();
        assert_eq!(
            sodium.get_path(&KeyPath::new(["rendering", "render_distance"])),
            Some(&serde_json::json!(4))
        );

        let replaced = orchestrator
            .apply_preset(
                game.path(),
                high_end,
                &ApplyOptions {
                    preserve_user_modifications: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(replaced.warnings.iter().all(|w| !w.contains("safe boot")));
        let sodium = ConfigFormat::Json
            .parse(&fs::read_to_string(config_dir.join("sodium-options.json")).await.unwrap())
            .unwrap();
        assert_eq!(
            sodium.get_path(&KeyPath::new(["rendering", "render_distance"])),
            Some(&serde_json::json!(12))
        );
    }
}
