//! Deterministic hardware scoring

use tracing::debug;

use crate::info::{GpuType, ScreenResolution};
use crate::tier::Tier;

const UHD_PIXELS: u64 = 3840 * 2160;
const QHD_PIXELS: u64 = 2560 * 1440;

/// Scores the host from 0 to 100; higher means more capable
///
/// RAM contributes up to 35 points, CPU cores up to 25 and the GPU up to 30.
/// An unknown GPU scores as mid-range. High resolutions cost points because
/// they raise rendering cost for the same hardware.
pub fn calculate_score(
    total_ram_gb: u64,
    cpu_cores: usize,
    gpu_type: GpuType,
    resolution: ScreenResolution,
) -> u8 {
    let ram_points: i32 = match total_ram_gb {
        16.. => 35,
        12..=15 => 28,
        8..=11 => 20,
        6..=7 => 12,
        _ => 5,
    };

    let cpu_points: i32 = match cpu_cores {
        8.. => 25,
        6..=7 => 20,
        4..=5 => 12,
        _ => 5,
    };

    let gpu_points: i32 = match gpu_type {
        GpuType::Dedicated => 30,
        GpuType::Integrated => 10,
        GpuType::Unknown => 15,
    };

    let pixels = resolution.pixel_count();
    let penalty: i32 = if pixels >= UHD_PIXELS {
        10
    } else if pixels >= QHD_PIXELS {
        5
    } else {
        0
    };

    let total = (ram_points + cpu_points + gpu_points - penalty).clamp(0, 100);

    debug!(
        ram_gb = total_ram_gb,
        cores = cpu_cores,
        gpu = %gpu_type,
        resolution = %resolution,
        base = ram_points + cpu_points + gpu_points,
        penalty,
        total,
        "Hardware score calculated"
    );

    total as u8
}

/// Maps a score onto a tier: below 40 is low-end, below 70 balanced
pub fn recommend_tier(score: u8) -> Tier {
    match score {
        70.. => Tier::HighEnd,
        40..=69 => Tier::Balanced,
        _ => Tier::LowEnd,
    }
}
