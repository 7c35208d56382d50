//! Error types for codec operations

use std::path::PathBuf;

use crate::format::ConfigFormat;

/// Codec result type
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors that can occur while parsing, serializing or writing config files
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Content could not be parsed in the given format
    #[error("Failed to parse {format} content: {message}")]
    Parse {
        /// Format that was being parsed
        format: ConfigFormat,
        /// Parser message
        message: String,
    },

    /// A tree did not survive serialize -> parse unchanged
    #[error("Round-trip validation failed for {file}")]
    RoundTrip {
        /// File the tree was destined for
        file: String,
    },

    /// Serialization failed
    #[error("Serialization failed: {0}")]
    Serialize(String),

    /// Content read back after an atomic write differs from what was written
    #[error("Content verification failed for {0}")]
    VerificationFailed(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Create a parse error for the given format
    pub fn parse(format: ConfigFormat, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }
}
