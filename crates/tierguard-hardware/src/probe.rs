//! Raw hardware probes
//!
//! Probes only report what the platform says. Interpretation (scoring,
//! defaults on failure) belongs to [`crate::HardwareProfiler`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::HardwareError;
use crate::info::{GpuInfo, GpuType, ScreenResolution};

/// Default time allowed for an external probe command
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of raw hardware readings
#[async_trait]
pub trait HardwareProbe: Send + Sync {
    /// Total physical memory in bytes
    async fn raw_ram(&self) -> Result<u64, HardwareError>;

    /// Logical CPU count
    async fn raw_cpu_core_count(&self) -> Result<usize, HardwareError>;

    /// GPU classification
    async fn raw_gpu_classify(&self) -> Result<GpuInfo, HardwareError>;

    /// Primary display resolution
    async fn raw_screen_resolution(&self) -> Result<ScreenResolution, HardwareError>;

    /// CPU brand string
    async fn raw_cpu_model(&self) -> Result<String, HardwareError> {
        Err(HardwareError::Unsupported("cpu model".to_string()))
    }

    /// CPU architecture name
    fn cpu_arch(&self) -> String {
        std::env::consts::ARCH.to_string()
    }

    /// Operating system name
    fn os(&self) -> String {
        std::env::consts::OS.to_string()
    }
}

/// Probes the running machine through `sysinfo` and platform GPU tools
///
/// The GPU is classified from `lspci` (Linux), `wmic` (Windows) or
/// `system_profiler` (macOS). A headless process has no display to query, so
/// the screen resolution comes from an override or is reported unsupported.
///
/// Memory and CPU figures come from a single `sysinfo` refresh taken on first
/// use and shared by clones of the probe.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    timeout: Duration,
    screen_override: Option<ScreenResolution>,
    snapshot: Arc<OnceCell<SystemSnapshot>>,
}

/// Memory and CPU readings from one `sysinfo` refresh
#[derive(Debug, Clone, PartialEq, Eq)]
struct SystemSnapshot {
    total_memory: u64,
    cpu_count: usize,
    cpu_brand: String,
}

impl SystemSnapshot {
    fn read(system: &sysinfo::System) -> Self {
        SystemSnapshot {
            total_memory: system.total_memory(),
            cpu_count: system.cpus().len(),
            cpu_brand: system
                .cpus()
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .unwrap_or_default(),
        }
    }
}

impl SystemProbe {
    /// Creates a probe with the default command timeout
    pub fn new() -> Self {
        SystemProbe {
            timeout: DEFAULT_PROBE_TIMEOUT,
            screen_override: None,
            snapshot: Arc::new(OnceCell::new()),
        }
    }

    /// Sets the time allowed for each external command
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reports this resolution instead of querying the display
    pub fn with_screen_resolution(mut self, resolution: Option<ScreenResolution>) -> Self {
        self.screen_override = resolution;
        self
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<String, HardwareError> {
        debug!(program, ?args, "Running hardware probe");
        let output = tokio::time::timeout(self.timeout, Command::new(program).args(args).output())
            .await
            .map_err(|_| HardwareError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(HardwareError::ProbeFailed(format!(
                "{} exited with {}",
                program, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn system_snapshot(&self) -> Result<&SystemSnapshot, HardwareError> {
        self.snapshot
            .get_or_try_init(|| async {
                debug!("Refreshing memory and CPU readings");
                tokio::task::spawn_blocking(|| {
                    let system = sysinfo::System::new_with_specifics(
                        RefreshKind::new()
                            .with_memory(MemoryRefreshKind::new().with_ram())
                            .with_cpu(CpuRefreshKind::new()),
                    );
                    SystemSnapshot::read(&system)
                })
                .await
                .map_err(|e| HardwareError::ProbeFailed(e.to_string()))
            })
            .await
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HardwareProbe for SystemProbe {
    async fn raw_ram(&self) -> Result<u64, HardwareError> {
        let total = self.system_snapshot().await?.total_memory;
        if total == 0 {
            return Err(HardwareError::ProbeFailed("total memory reported as 0".to_string()));
        }
        Ok(total)
    }

    async fn raw_cpu_core_count(&self) -> Result<usize, HardwareError> {
        let count = self.system_snapshot().await?.cpu_count;
        if count == 0 {
            return Err(HardwareError::ProbeFailed("no CPUs reported".to_string()));
        }
        Ok(count)
    }

    async fn raw_cpu_model(&self) -> Result<String, HardwareError> {
        let brand = self.system_snapshot().await?.cpu_brand.clone();
        if brand.is_empty() {
            return Err(HardwareError::ProbeFailed("empty CPU brand".to_string()));
        }
        Ok(brand)
    }

    async fn raw_gpu_classify(&self) -> Result<GpuInfo, HardwareError> {
        let os = self.os();
        let stdout = match os.as_str() {
            "macos" => self.run("system_profiler", &["SPDisplaysDataType"]).await?,
            "windows" => {
                self.run("wmic", &["path", "win32_VideoController", "get", "name"])
                    .await?
            }
            _ => self.run("lspci", &[]).await?,
        };
        Ok(classify_gpu(&os, &stdout))
    }

    async fn raw_screen_resolution(&self) -> Result<ScreenResolution, HardwareError> {
        self.screen_override
            .ok_or_else(|| HardwareError::Unsupported("no display attached to this process".to_string()))
    }
}

static MACOS_INTEGRATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Intel (HD|UHD|Iris)|Apple (M\d)").expect("Invalid regex"));
static WINDOWS_INTEGRATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Intel (HD|UHD)|AMD Radeon.*Vega|Intel Iris").expect("Invalid regex"));
static LINUX_INTEGRATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Intel.*Integrated|Intel.*HD|Intel.*UHD").expect("Invalid regex"));
static MACOS_CHIPSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Chipset Model:\s*(.+)").expect("Invalid regex"));

/// Classifies raw GPU tool output for the given OS
///
/// Anything not recognized as integrated is reported as dedicated; empty
/// output is unknown.
pub fn classify_gpu(os: &str, stdout: &str) -> GpuInfo {
    let (name, integrated) = match os {
        "macos" => {
            let name = MACOS_CHIPSET
                .captures(stdout)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string());
            (name, MACOS_INTEGRATED.is_match(stdout))
        }
        "windows" => {
            let name = stdout
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && *line != "Name")
                .map(str::to_string);
            let integrated = name
                .as_deref()
                .map(|n| WINDOWS_INTEGRATED.is_match(n))
                .unwrap_or(false);
            (name, integrated)
        }
        _ => {
            let adapters: Vec<&str> = stdout
                .lines()
                .filter(|line| {
                    let lower = line.to_ascii_lowercase();
                    lower.contains("vga") || lower.contains("3d controller")
                })
                .collect();
            let name = adapters
                .first()
                .map(|line| line.splitn(2, ": ").nth(1).unwrap_or(line).trim().to_string());
            let integrated = adapters.iter().any(|line| LINUX_INTEGRATED.is_match(line));
            (name, integrated)
        }
    };

    match name {
        Some(name) if !name.is_empty() => GpuInfo {
            gpu_type: if integrated {
                GpuType::Integrated
            } else {
                GpuType::Dedicated
            },
            name,
        },
        _ => GpuInfo::unknown(),
    }
}

/// Probe returning fixed readings
///
/// Used for explicit hardware overrides and in tests.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    /// Total RAM in bytes
    pub ram_bytes: u64,
    /// Logical CPU count
    pub cpu_cores: usize,
    /// CPU brand string
    pub cpu_model: String,
    /// CPU architecture
    pub cpu_arch: String,
    /// GPU reading, `None` simulates a failed probe
    pub gpu: Option<GpuInfo>,
    /// Screen reading, `None` simulates a failed probe
    pub screen: Option<ScreenResolution>,
    /// Operating system
    pub os: String,
}

impl FixedProbe {
    /// A mid-range Linux desktop: 16 GiB, 8 cores, dedicated GPU, 1080p
    pub fn desktop() -> Self {
        FixedProbe {
            ram_bytes: 16 * GIB,
            cpu_cores: 8,
            cpu_model: "AMD Ryzen 7 5800X 8-Core Processor".to_string(),
            cpu_arch: "x86_64".to_string(),
            gpu: Some(GpuInfo {
                gpu_type: GpuType::Dedicated,
                name: "NVIDIA GeForce RTX 3070".to_string(),
            }),
            screen: Some(ScreenResolution::default()),
            os: "linux".to_string(),
        }
    }

    /// Sets total RAM in whole GiB
    pub fn with_ram_gb(mut self, gb: u64) -> Self {
        self.ram_bytes = gb * GIB;
        self
    }

    /// Sets the core count
    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cpu_cores = cores;
        self
    }

    /// Sets the GPU reading
    pub fn with_gpu(mut self, gpu_type: GpuType, name: &str) -> Self {
        self.gpu = Some(GpuInfo {
            gpu_type,
            name: name.to_string(),
        });
        self
    }

    /// Sets the CPU brand string
    pub fn with_cpu_model(mut self, model: &str) -> Self {
        self.cpu_model = model.to_string();
        self
    }
}

/// Bytes per GiB
pub const GIB: u64 = 1024 * 1024 * 1024;

#[async_trait]
impl HardwareProbe for FixedProbe {
    async fn raw_ram(&self) -> Result<u64, HardwareError> {
        Ok(self.ram_bytes)
    }

    async fn raw_cpu_core_count(&self) -> Result<usize, HardwareError> {
        Ok(self.cpu_cores)
    }

    async fn raw_gpu_classify(&self) -> Result<GpuInfo, HardwareError> {
        self.gpu
            .clone()
            .ok_or_else(|| HardwareError::ProbeFailed("gpu".to_string()))
    }

    async fn raw_screen_resolution(&self) -> Result<ScreenResolution, HardwareError> {
        self.screen
            .ok_or_else(|| HardwareError::ProbeFailed("screen".to_string()))
    }

    async fn raw_cpu_model(&self) -> Result<String, HardwareError> {
        Ok(self.cpu_model.clone())
    }

    fn cpu_arch(&self) -> String {
        self.cpu_arch.clone()
    }

    fn os(&self) -> String {
        self.os.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_lspci_integrated() {
        let stdout = "00:02.0 VGA compatible controller: Intel Corporation UHD Graphics 620 (rev 07)\n\
                      00:1f.3 Audio device: Intel Corporation Sunrise Point-LP HD Audio\n";
        let gpu = classify_gpu("linux", stdout);
        assert_eq!(gpu.gpu_type, GpuType::Integrated);
        assert_eq!(gpu.name, "Intel Corporation UHD Graphics 620 (rev 07)");
    }

    #[test]
    fn test_classify_lspci_dedicated() {
        let stdout = "01:00.0 VGA compatible controller: NVIDIA Corporation GA104 [GeForce RTX 3070] (rev a1)\n";
        let gpu = classify_gpu("linux", stdout);
        assert_eq!(gpu.gpu_type, GpuType::Dedicated);
        assert_eq!(gpu.vendor(), "NVIDIA");
    }

    #[test]
    fn test_classify_lspci_without_adapter_is_unknown() {
        let gpu = classify_gpu("linux", "00:1f.3 Audio device: Intel Corporation HD Audio\n");
        assert_eq!(gpu, GpuInfo::unknown());
    }

    #[test]
    fn test_classify_wmic() {
        let gpu = classify_gpu("windows", "Name\r\nAMD Radeon(TM) Vega 8 Graphics\r\n\r\n");
        assert_eq!(gpu.gpu_type, GpuType::Integrated);
        assert_eq!(gpu.name, "AMD Radeon(TM) Vega 8 Graphics");
    }

    #[test]
    fn test_classify_system_profiler() {
        let stdout = "Graphics/Displays:\n\n    Apple M2:\n\n      Chipset Model: Apple M2\n      Type: GPU\n";
        let gpu = classify_gpu("macos", stdout);
        assert_eq!(gpu.gpu_type, GpuType::Integrated);
        assert_eq!(gpu.name, "Apple M2");
    }

    #[tokio::test]
    async fn test_system_probe_screen_override() {
        let probe = SystemProbe::new();
        assert!(probe.raw_screen_resolution().await.is_err());

        let probe = SystemProbe::new().with_screen_resolution(Some(ScreenResolution::new(2560, 1440)));
        assert_eq!(
            probe.raw_screen_resolution().await.unwrap(),
            ScreenResolution::new(2560, 1440)
        );
    }

    #[tokio::test]
    async fn test_system_snapshot_is_taken_once() {
        let probe = SystemProbe::new();
        let clone = probe.clone();
        assert!(probe.snapshot.get().is_none());

        let first = probe.system_snapshot().await.unwrap().clone();
        let again = clone.system_snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&probe.snapshot, &clone.snapshot));
        assert!(std::ptr::eq(probe.snapshot.get().unwrap(), again));
        assert_eq!(&first, again);
    }

    #[tokio::test]
    async fn test_fixed_probe_failures() {
        let mut probe = FixedProbe::desktop();
        probe.gpu = None;
        assert!(probe.raw_gpu_classify().await.is_err());
        assert_eq!(probe.raw_ram().await.unwrap(), 16 * GIB);
    }
}
