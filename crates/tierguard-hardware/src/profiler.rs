//! Hardware profiler: raw probes in, scored fingerprint out

use std::sync::Arc;

use tracing::{info, warn};

use crate::info::{vendor_of, GpuInfo, HardwareInfo, ScreenResolution};
use crate::probe::{HardwareProbe, SystemProbe, GIB};
use crate::score::{calculate_score, recommend_tier};

/// RAM assumed when the memory probe fails
pub const DEFAULT_RAM_GB: u64 = 8;
/// Core count assumed when the CPU probe fails
pub const DEFAULT_CPU_CORES: usize = 4;

/// Combines probe readings into a [`HardwareInfo`]
///
/// Detection itself never fails: every probe error is logged and replaced by
/// a mid-range default so a broken probe cannot push the host into the
/// lowest tier.
#[derive(Clone)]
pub struct HardwareProfiler {
    probe: Arc<dyn HardwareProbe>,
}

impl HardwareProfiler {
    /// Creates a profiler over the given probe
    pub fn new(probe: Arc<dyn HardwareProbe>) -> Self {
        HardwareProfiler { probe }
    }

    /// Creates a profiler over the running machine
    pub fn system() -> Self {
        Self::new(Arc::new(SystemProbe::new()))
    }

    /// Probes the host, scores it and recommends a tier
    pub async fn detect(&self) -> HardwareInfo {
        let total_ram_gb = match self.probe.raw_ram().await {
            Ok(bytes) => round_to_gib(bytes),
            Err(e) => {
                warn!(error = %e, default = DEFAULT_RAM_GB, "RAM probe failed");
                DEFAULT_RAM_GB
            }
        };

        let cpu_cores = match self.probe.raw_cpu_core_count().await {
            Ok(cores) => cores,
            Err(e) => {
                warn!(error = %e, default = DEFAULT_CPU_CORES, "CPU probe failed");
                DEFAULT_CPU_CORES
            }
        };

        let cpu_model = self
            .probe
            .raw_cpu_model()
            .await
            .unwrap_or_else(|_| "Unknown CPU".to_string());

        let gpu = self.probe.raw_gpu_classify().await.unwrap_or_else(|e| {
            warn!(error = %e, "GPU probe failed");
            GpuInfo::unknown()
        });

        let screen_resolution = self.probe.raw_screen_resolution().await.unwrap_or_else(|e| {
            warn!(error = %e, "Screen probe failed, assuming 1920x1080");
            ScreenResolution::default()
        });

        let score = calculate_score(total_ram_gb, cpu_cores, gpu.gpu_type, screen_resolution);
        let recommended_preset = recommend_tier(score);

        let hardware = HardwareInfo {
            total_ram_gb,
            cpu_cores,
            cpu_model,
            cpu_arch: self.probe.cpu_arch(),
            gpu_type: gpu.gpu_type,
            gpu_vendor: vendor_of(&gpu.name),
            gpu_name: gpu.name,
            os: self.probe.os(),
            screen_resolution,
            score,
            recommended_preset,
        };

        info!(
            ram_gb = hardware.total_ram_gb,
            cores = hardware.cpu_cores,
            gpu = %hardware.gpu_name,
            gpu_type = %hardware.gpu_type,
            resolution = %hardware.screen_resolution,
            score = hardware.score,
            recommended = %hardware.recommended_preset,
            "Hardware detected"
        );

        hardware
    }
}

fn round_to_gib(bytes: u64) -> u64 {
    (bytes + GIB / 2) / GIB
}
