//! Error types for preset application

use tierguard_backup::BackupError;
use tierguard_codec::CodecError;

/// Result type for preset operations
pub type Result<T> = std::result::Result<T, PresetError>;

/// Errors surfaced by the preset orchestrator
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    /// Rollback was requested but no snapshot exists
    #[error("No backup available for rollback")]
    NoBackup,

    /// Snapshot store failure (unknown or unrestorable backup included)
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config encoding or atomic write failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Preset application hit an unrecoverable error
    ///
    /// `recovered` tells whether safe boot mode was applied afterwards.
    #[error("Failed to apply performance presets: {message}")]
    ApplyFailed {
        /// The underlying failure
        message: String,
        /// Whether the safe boot fallback succeeded
        recovered: bool,
    },
}
