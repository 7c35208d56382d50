#![warn(missing_docs)]

//! Hardware profiling for tierguard
//!
//! Turns raw probe readings (RAM, CPU cores, GPU class, screen resolution)
//! into a deterministic 0-100 suitability score and a recommended [`Tier`].
//! Probes are pluggable through [`HardwareProbe`]; a failing probe degrades to
//! a documented default instead of failing detection.

pub mod error;
pub mod info;
pub mod probe;
pub mod profiler;
pub mod score;
pub mod tier;

pub use error::{HardwareError, UnknownPresetError};
pub use info::{GpuInfo, GpuType, HardwareInfo, ScreenResolution};
pub use probe::{classify_gpu, FixedProbe, HardwareProbe, SystemProbe, DEFAULT_PROBE_TIMEOUT, GIB};
pub use profiler::{HardwareProfiler, DEFAULT_CPU_CORES, DEFAULT_RAM_GB};
pub use score::{calculate_score, recommend_tier};
pub use tier::{PresetChoice, Tier};
