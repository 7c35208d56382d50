//! Error types for hardware probes

use std::time::Duration;

/// Errors raised by individual probes
///
/// The profiler never surfaces these; they are logged and replaced by defaults.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// A probe command failed or produced unusable output
    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    /// A probe did not answer in time
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    /// The probe is not available on this platform
    #[error("Probe not supported: {0}")]
    Unsupported(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Unrecognized tier or preset name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown preset '{0}', expected one of: auto, low-end, balanced, high-end")]
pub struct UnknownPresetError(pub String);
