//! Dry-run simulation of a preset apply
//!
//! Computes, per file, exactly what [`crate::PresetOrchestrator`] would
//! write, without writing anything. Only leaf keys produce diff entries;
//! nested trees are walked, never diffed as a whole.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tierguard_catalog::ManagedFile;
use tierguard_codec::{ConfigFormat, ConfigTree, KeyPath};
use tokio::fs;
use tracing::{debug, warn};

/// Reason attached to files that would not change
pub const NO_CHANGES_REASON: &str = "No changes needed";

/// How a file would be touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// The file does not exist yet
    Create,
    /// At least one key would change
    Modify,
    /// Nothing would change
    Skip,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeType::Create => "create",
            ChangeType::Modify => "modify",
            ChangeType::Skip => "skip",
        })
    }
}

/// What would happen to one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    /// Key is missing and would be added
    Add,
    /// Key exists with a different value
    Modify,
    /// Key would be removed (merges only add or replace, so never produced today)
    Remove,
    /// Key differs or is missing but belongs to the user and is kept
    Preserve,
}

/// One key-level difference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    /// Dotted key path
    pub key: String,
    /// Current value, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// Preset value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    /// What would happen
    pub action: DiffAction,
}

/// Simulated outcome for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// File name inside the config directory
    pub file: String,
    /// How the file would be touched
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Why, for skipped files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Keys that would be added or modified
    pub changed_keys: Vec<String>,
    /// Keys kept because the user owns them
    pub preserved_keys: Vec<String>,
    /// Key-level diff, unless disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<Vec<DiffEntry>>,
}

/// Totals across all files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunSummary {
    /// Tier being simulated; `unknown` until the caller sets it
    pub preset: String,
    /// Files that would be created or modified
    pub affected_files: usize,
    /// Files that would not change
    pub skipped_files: usize,
    /// Changed keys over all files
    pub total_changed_keys: usize,
}

/// Result of a simulation; never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResult {
    /// True when no file produced an error
    pub success: bool,
    /// One entry per simulated file
    pub changes: Vec<FileChange>,
    /// Non-fatal notes, such as preserved keys
    pub warnings: Vec<String>,
    /// Per-file failures
    pub errors: Vec<String>,
    /// Totals
    pub summary: DryRunSummary,
}

/// Simulation switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DryRunOptions {
    /// Honor user modifications
    pub preserve_user_modifications: bool,
    /// Serialize and reparse the would-be content, reporting failures
    pub validate_before_apply: bool,
    /// Include key-level diffs
    pub show_diff: bool,
}

impl Default for DryRunOptions {
    fn default() -> Self {
        DryRunOptions {
            preserve_user_modifications: true,
            validate_before_apply: true,
            show_diff: true,
        }
    }
}

/// Which parts of a file the user has edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserModifications {
    /// The file hash changed; every top-level key already in the file is kept
    WholeFile,
    /// Only these keys (and everything below them) are kept
    Keys(Vec<KeyPath>),
}

impl UserModifications {
    fn preserves(&self, current: &ConfigTree, path: &KeyPath) -> bool {
        match self {
            UserModifications::WholeFile => path.root().map_or(false, |root| current.contains_key(root)),
            UserModifications::Keys(keys) => keys.iter().any(|key| key.is_prefix_of(path)),
        }
    }
}

/// Per-file merge plan computed by the simulation
///
/// Mirrors `deep_merge` leaf by leaf. Apply goes through `deep_merge` itself, so
/// the two only differ for empty objects in the preset, which have no leaves to
/// plan and are therefore never previewed.
#[derive(Debug, Clone)]
pub(crate) struct FilePlan {
    pub merged: ConfigTree,
    pub diff: Vec<DiffEntry>,
    pub changed_keys: Vec<String>,
    pub preserved_keys: Vec<String>,
}

/// Walks every leaf of `preset` against `current`
pub(crate) fn plan_file(
    current: &ConfigTree,
    preset: &ConfigTree,
    modifications: Option<&UserModifications>,
) -> FilePlan {
    let mut plan = FilePlan {
        merged: current.clone(),
        diff: Vec::new(),
        changed_keys: Vec::new(),
        preserved_keys: Vec::new(),
    };

    for path in preset.leaf_paths() {
        let new_value = preset.get_path(&path).cloned();
        let old_value = current.get_path(&path).cloned();
        let key = path.to_string();

        if modifications.map_or(false, |m| m.preserves(current, &path)) {
            plan.preserved_keys.push(key.clone());
            plan.diff.push(DiffEntry {
                key,
                old_value,
                new_value,
                action: DiffAction::Preserve,
            });
            continue;
        }

        let action = match &old_value {
            None => DiffAction::Add,
            Some(old) if Some(old) != new_value.as_ref() => DiffAction::Modify,
            Some(_) => continue,
        };

        if let Some(value) = &new_value {
            plan.merged.set_path(&path, value.clone());
        }
        plan.changed_keys.push(key.clone());
        plan.diff.push(DiffEntry {
            key,
            old_value,
            new_value,
            action,
        });
    }

    plan
}

/// Reads a config file into a tree, empty when absent or unparseable
pub(crate) async fn load_tree(path: &Path, format: ConfigFormat) -> ConfigTree {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(_) => return ConfigTree::new(),
    };
    match format.parse(&content) {
        Ok(tree) => tree,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid config, using empty config");
            ConfigTree::new()
        }
    }
}

/// Simulates writing `presets` into `config_dir`
///
/// # Arguments
///
/// * `config_dir` - Directory holding the live files
/// * `presets` - Target files paired with the trees that would be merged in
/// * `user_modified` - User-owned parts of each file, keyed by file name
/// * `options` - Simulation switches
///
/// Reads files only; never creates, writes or touches anything on disk.
pub async fn simulate(
    config_dir: &Path,
    presets: &[(ManagedFile, ConfigTree)],
    user_modified: &HashMap<String, UserModifications>,
    options: &DryRunOptions,
) -> DryRunResult {
    let mut changes = Vec::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    let mut total_changed_keys = 0;

    for (file, preset) in presets {
        let path = file.path_in(config_dir);
        let exists = fs::metadata(&path).await.is_ok();
        let current = if exists {
            load_tree(&path, file.format).await
        } else {
            ConfigTree::new()
        };

        let modifications = if options.preserve_user_modifications {
            user_modified.get(file.filename)
        } else {
            None
        };

        let plan = plan_file(&current, preset, modifications);

        if options.validate_before_apply {
            if let Err(e) = file
                .format
                .serialize_validated(&plan.merged, file.section, file.filename)
            {
                errors.push(format!("{}: {}", file.filename, e));
            }
        }

        if !plan.preserved_keys.is_empty() {
            warnings.push(format!(
                "{}: {} user-modified keys preserved",
                file.filename,
                plan.preserved_keys.len()
            ));
        }

        let (change_type, reason) = if plan.changed_keys.is_empty() {
            (ChangeType::Skip, Some(NO_CHANGES_REASON.to_string()))
        } else if exists {
            (ChangeType::Modify, None)
        } else {
            (ChangeType::Create, None)
        };
        total_changed_keys += plan.changed_keys.len();

        debug!(
            file = file.filename,
            change = %change_type,
            changed = plan.changed_keys.len(),
            preserved = plan.preserved_keys.len(),
            "Simulated file"
        );

        changes.push(FileChange {
            file: file.filename.to_string(),
            change_type,
            reason,
            changed_keys: plan.changed_keys,
            preserved_keys: plan.preserved_keys,
            diff: options.show_diff.then_some(plan.diff),
        });
    }

    let skipped_files = changes
        .iter()
        .filter(|c| c.change_type == ChangeType::Skip)
        .count();

    DryRunResult {
        success: errors.is_empty(),
        summary: DryRunSummary {
            preset: "unknown".to_string(),
            affected_files: changes.len() - skipped_files,
            skipped_files,
            total_changed_keys,
        },
        changes,
        warnings,
        errors,
    }
}

impl fmt::Display for DryRunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== DRY RUN: {} ===", self.summary.preset)?;
        writeln!(f, "Status: {}", if self.success { "SUCCESS" } else { "FAILED" })?;
        writeln!(f, "Files affected: {}", self.summary.affected_files)?;
        writeln!(f, "Files skipped: {}", self.summary.skipped_files)?;
        writeln!(f, "Total keys changed: {}", self.summary.total_changed_keys)?;

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "  ! {}", warning)?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Errors:")?;
            for error in &self.errors {
                writeln!(f, "  x {}", error)?;
            }
        }

        writeln!(f)?;
        write!(f, "Changes:")?;
        for change in &self.changes {
            let marker = match change.change_type {
                ChangeType::Create => '+',
                ChangeType::Modify => '~',
                ChangeType::Skip => '-',
            };
            write!(f, "\n  {} {} ({})", marker, change.file, change.change_type)?;
            if !change.changed_keys.is_empty() {
                write!(f, "\n      Changed: {}", change.changed_keys.join(", "))?;
            }
            if !change.preserved_keys.is_empty() {
                write!(f, "\n      Preserved: {}", change.preserved_keys.join(", "))?;
            }
        }
        Ok(())
    }
}
