//! Error types for backup operations

use std::path::PathBuf;

use tierguard_codec::CodecError;

/// Result type for backup operations
pub type Result<T> = std::result::Result<T, BackupError>;

/// Errors that can occur during backup, restore and safe boot
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// No manifest entry with this id
    #[error("Backup not found: {0}")]
    NotFound(String),

    /// The entry holds no files
    #[error("Backup {0} is not restorable")]
    NotRestorable(String),

    /// The snapshot directory could not be created
    #[error("Failed to create snapshot directory {path}: {source}")]
    SnapshotFailed {
        /// Snapshot directory
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest or audit log (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config encoding or atomic write failed
    #[error(transparent)]
    Codec(#[from] CodecError),
}
