//! Hardware fingerprint types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tier::Tier;

/// Coarse GPU class used by the scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuType {
    /// GPU shares memory with the CPU
    Integrated,
    /// Discrete graphics card
    Dedicated,
    /// Detection failed or was inconclusive
    #[default]
    Unknown,
}

impl fmt::Display for GpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GpuType::Integrated => "integrated",
            GpuType::Dedicated => "dedicated",
            GpuType::Unknown => "unknown",
        })
    }
}

/// Raw output of the GPU probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    /// GPU class
    #[serde(rename = "type")]
    pub gpu_type: GpuType,
    /// Human readable adapter name
    pub name: String,
}

impl GpuInfo {
    /// Placeholder used when the GPU probe fails
    pub fn unknown() -> Self {
        GpuInfo {
            gpu_type: GpuType::Unknown,
            name: "Unknown GPU".to_string(),
        }
    }

    /// Vendor token: the first word of the adapter name
    pub fn vendor(&self) -> String {
        vendor_of(&self.name)
    }
}

pub(crate) fn vendor_of(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or("Unknown")
        .to_string()
}

/// Primary display resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenResolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ScreenResolution {
    /// Creates a resolution
    pub fn new(width: u32, height: u32) -> Self {
        ScreenResolution { width, height }
    }

    /// Total pixel count
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl Default for ScreenResolution {
    fn default() -> Self {
        ScreenResolution::new(1920, 1080)
    }
}

impl fmt::Display for ScreenResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Everything the profiler learned about the host
///
/// Derived on every apply, never persisted (a copy is stored in backup
/// metadata for diagnostics only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareInfo {
    /// Total RAM rounded to whole GiB
    #[serde(rename = "totalRamGB")]
    pub total_ram_gb: u64,
    /// Logical CPU count
    pub cpu_cores: usize,
    /// CPU brand string
    pub cpu_model: String,
    /// CPU architecture (`x86_64`, `aarch64`, ...)
    pub cpu_arch: String,
    /// GPU class
    pub gpu_type: GpuType,
    /// GPU adapter name
    pub gpu_name: String,
    /// GPU vendor token
    pub gpu_vendor: String,
    /// Operating system (`linux`, `macos`, `windows`)
    pub os: String,
    /// Primary display resolution
    pub screen_resolution: ScreenResolution,
    /// Suitability score, 0..=100
    pub score: u8,
    /// Tier recommended for this score
    pub recommended_preset: Tier,
}
