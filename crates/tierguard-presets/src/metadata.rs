//! Per-directory record of what tierguard last wrote
//!
//! Stored as `launcher_config_metadata.json` next to the managed files. The
//! content hashes recorded after an apply are what user edits are detected
//! against.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tierguard_backup::{DirectoryLocks, LockScope};
use tierguard_catalog::ManagedFile;
use tierguard_codec::{file_hash, AtomicWriter};
use tierguard_hardware::Tier;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::Result;

/// Metadata file name inside the config directory
pub const METADATA_FILE: &str = "launcher_config_metadata.json";
/// Version written into fresh metadata
pub const INITIAL_METADATA_VERSION: &str = "1.0";
/// Version written once a preset has been applied
pub const APPLIED_METADATA_VERSION: &str = "2.0.0";

/// Persisted state of a managed config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMetadata {
    /// Metadata schema version
    pub version: String,
    /// Tier written by the last successful apply
    pub last_applied_preset: Option<Tier>,
    /// When this record last changed
    pub last_modified: DateTime<Utc>,
    /// SHA-256 of each file's content as tierguard last wrote it
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
    /// The user opted out of automatic management
    #[serde(default)]
    pub user_managed: bool,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        ConfigMetadata {
            version: INITIAL_METADATA_VERSION.to_string(),
            last_applied_preset: None,
            last_modified: Utc::now(),
            hashes: BTreeMap::new(),
            user_managed: false,
        }
    }
}

impl ConfigMetadata {
    /// Whether a file whose current hash is `current_hash` was edited since the last apply
    ///
    /// A file never written by tierguard (no stored hash) or absent from
    /// disk counts as unmodified.
    pub fn is_modified(&self, filename: &str, current_hash: Option<&str>) -> bool {
        match (self.hashes.get(filename), current_hash) {
            (Some(stored), Some(current)) => stored != current,
            _ => false,
        }
    }
}

/// Loads and saves [`ConfigMetadata`] for one config directory
#[derive(Debug, Clone)]
pub struct MetadataStore {
    config_dir: PathBuf,
    writer: AtomicWriter,
}

impl MetadataStore {
    /// Creates a store for `config_dir`
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        MetadataStore {
            config_dir: config_dir.into(),
            writer: AtomicWriter::new(),
        }
    }

    /// Path of the metadata file
    pub fn path(&self) -> PathBuf {
        self.config_dir.join(METADATA_FILE)
    }

    /// Loads the metadata, falling back to defaults when missing or unreadable
    pub async fn load(&self) -> ConfigMetadata {
        let path = self.path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(_) => return ConfigMetadata::default(),
        };
        match serde_json::from_str(&content) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config metadata unreadable, using defaults");
                ConfigMetadata::default()
            }
        }
    }

    /// Atomically writes `metadata`
    pub async fn save(&self, metadata: &ConfigMetadata) -> Result<()> {
        let json = serde_json::to_string_pretty(metadata)?;
        self.writer.write(&self.path(), json).await?;
        debug!(path = %self.path().display(), "Config metadata saved");
        Ok(())
    }

    /// Load, mutate and save under the directory's metadata lock
    ///
    /// `last_modified` is bumped after `f` runs.
    pub async fn update<F>(&self, f: F) -> Result<ConfigMetadata>
    where
        F: FnOnce(&mut ConfigMetadata),
    {
        let _guard = DirectoryLocks::acquire(&self.config_dir, LockScope::Metadata).await;

        let mut metadata = self.load().await;
        f(&mut metadata);
        metadata.last_modified = Utc::now();
        self.save(&metadata).await?;
        Ok(metadata)
    }

    /// Whether `file` changed on disk since tierguard last wrote it
    pub async fn is_user_modified(&self, metadata: &ConfigMetadata, file: &ManagedFile) -> bool {
        let current = file_hash(&file.path_in(&self.config_dir)).await;
        metadata.is_modified(file.filename, current.as_deref())
    }

    /// The config directory this store belongs to
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}
