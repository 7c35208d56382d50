//! Known incompatibilities between hardware, operating systems and mods
//!
//! Each rule is a set of optional predicates; a rule matches when every
//! predicate it carries matches. A missing predicate means "don't care".
//! Matching rules contribute their workaround patch to the target file,
//! in catalog order, with later rules overriding earlier ones on shared keys.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tierguard_codec::{deep_merge, ConfigTree};
use tierguard_hardware::HardwareInfo;
use tracing::{debug, info};

/// What goes wrong when a rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Impact {
    /// The game crashes
    Crash,
    /// Rendering artifacts
    VisualGlitch,
    /// Lower frame rate or stutter
    PerformanceDegradation,
    /// Saves or configs can be damaged
    DataCorruption,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Impact::Crash => "crash",
            Impact::VisualGlitch => "visual-glitch",
            Impact::PerformanceDegradation => "performance-degradation",
            Impact::DataCorruption => "data-corruption",
        })
    }
}

/// How urgently a match should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Low,
    /// Worth knowing
    Medium,
    /// Shown to the user
    High,
    /// Shown to the user
    Critical,
}

impl Severity {
    /// Whether matches at this severity become user-visible warnings
    pub fn is_user_visible(self) -> bool {
        self >= Severity::High
    }
}

/// Hardware predicates; every present field must match
#[derive(Debug, Clone, Default)]
pub struct HardwarePattern {
    /// Regex over the CPU brand string
    pub cpu_model: Option<Regex>,
    /// Exact CPU architecture
    pub cpu_arch: Option<&'static str>,
    /// Case-insensitive substring of the GPU vendor or name
    pub gpu_vendor: Option<&'static str>,
    /// Regex over the GPU name
    pub gpu_name: Option<Regex>,
    /// Minimum RAM in GiB, inclusive
    pub min_ram: Option<u64>,
    /// Maximum RAM in GiB, inclusive
    pub max_ram: Option<u64>,
}

impl HardwarePattern {
    /// Whether `hardware` satisfies every present predicate
    pub fn matches(&self, hardware: &HardwareInfo) -> bool {
        if let Some(re) = &self.cpu_model {
            if !re.is_match(&hardware.cpu_model) {
                return false;
            }
        }
        if let Some(arch) = self.cpu_arch {
            if hardware.cpu_arch != arch {
                return false;
            }
        }
        if let Some(vendor) = self.gpu_vendor {
            let vendor = vendor.to_lowercase();
            if !hardware.gpu_vendor.to_lowercase().contains(&vendor)
                && !hardware.gpu_name.to_lowercase().contains(&vendor)
            {
                return false;
            }
        }
        if let Some(re) = &self.gpu_name {
            if !re.is_match(&hardware.gpu_name) {
                return false;
            }
        }
        if self.min_ram.is_some_and(|min| hardware.total_ram_gb < min) {
            return false;
        }
        if self.max_ram.is_some_and(|max| hardware.total_ram_gb > max) {
            return false;
        }
        true
    }
}

/// All predicates of one rule
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    /// Mod-name substrings that must all be installed
    pub mods: Vec<&'static str>,
    /// Hardware predicates
    pub hardware: Option<HardwarePattern>,
    /// Operating systems the rule applies to; empty means any
    pub os: Vec<&'static str>,
}

impl Conditions {
    /// Whether the host and installed mods satisfy every present predicate
    pub fn matches(&self, hardware: &HardwareInfo, installed_mods: &[String]) -> bool {
        if !self.os.is_empty() && !self.os.iter().any(|os| *os == hardware.os) {
            return false;
        }

        let has_all_mods = self.mods.iter().all(|wanted| {
            let wanted = wanted.to_lowercase();
            installed_mods
                .iter()
                .any(|installed| installed.to_lowercase().contains(&wanted))
        });
        if !has_all_mods {
            return false;
        }

        self.hardware
            .as_ref()
            .map_or(true, |pattern| pattern.matches(hardware))
    }
}

/// Config patch targeting one managed file
#[derive(Debug, Clone)]
pub struct Workaround {
    /// Managed file the patch applies to
    pub file: &'static str,
    /// Settings merged over the file's config (patch wins)
    pub patch: ConfigTree,
}

/// One known problem
#[derive(Debug, Clone)]
pub struct Incompatibility {
    /// Stable identifier
    pub id: &'static str,
    /// Human readable description
    pub description: &'static str,
    /// When the rule applies
    pub conditions: Conditions,
    /// What goes wrong
    pub impact: Impact,
    /// How urgent it is
    pub severity: Severity,
    /// Optional config workaround
    pub workaround: Option<Workaround>,
}

impl Incompatibility {
    /// User-facing warning text
    pub fn warning(&self) -> String {
        format!("{} ({})", self.description, self.impact)
    }
}

/// Outcome of evaluating the catalog
#[derive(Debug, Clone, Default)]
pub struct IncompatibilityReport {
    /// Ids of every matching rule, in catalog order
    pub detected: Vec<String>,
    /// Ids of matching rules whose workaround was applied
    pub applied_workarounds: Vec<String>,
    /// Warnings for critical and high severity matches
    pub warnings: Vec<String>,
    /// The given configs with every workaround merged in
    pub patched_configs: BTreeMap<String, ConfigTree>,
    /// Only the accumulated workaround patches, per file
    pub patches: BTreeMap<String, ConfigTree>,
}

static INCOMPATIBILITIES: Lazy<Vec<Incompatibility>> = Lazy::new(|| {
    vec![
        Incompatibility {
            id: "intel-13th-14th-gen-instability",
            description: "Intel 13th/14th gen CPUs may crash with aggressive rendering settings due to known microcode issues",
            conditions: Conditions {
                hardware: Some(HardwarePattern {
                    cpu_model: Some(regex(r"i[579]-(1[34][0-9]{3}|1[34][0-9]{2}[A-Z]?)")),
                    ..Default::default()
                }),
                ..Default::default()
            },
            impact: Impact::Crash,
            severity: Severity::Critical,
            workaround: Some(Workaround {
                file: "sodium-options.json",
                patch: ConfigTree::from_object(json!({
                    "advanced": {
                        "cpu_render_ahead_limit": 2,
                        "allow_direct_memory_access": false
                    },
                    "rendering": {
                        "fps_limit": 120
                    }
                })),
            }),
        },
        Incompatibility {
            id: "apple-silicon-opengl-compat",
            description: "Apple Silicon requires specific OpenGL settings due to Metal translation layer",
            conditions: Conditions {
                hardware: Some(HardwarePattern {
                    cpu_arch: Some("aarch64"),
                    ..Default::default()
                }),
                os: vec!["macos"],
                ..Default::default()
            },
            impact: Impact::VisualGlitch,
            severity: Severity::Medium,
            workaround: Some(Workaround {
                file: "sodium-options.json",
                patch: ConfigTree::from_object(json!({
                    "advanced": {
                        "use_advanced_staging_buffers": false
                    }
                })),
            }),
        },
        Incompatibility {
            id: "low-vram-render-distance",
            description: "Low VRAM systems may crash with high render distances",
            conditions: Conditions {
                hardware: Some(HardwarePattern {
                    max_ram: Some(4),
                    ..Default::default()
                }),
                ..Default::default()
            },
            impact: Impact::Crash,
            severity: Severity::High,
            workaround: Some(Workaround {
                file: "sodium-options.json",
                patch: ConfigTree::from_object(json!({
                    "rendering": {
                        "render_distance": 6,
                        "simulation_distance": 6
                    },
                    "quality": {
                        "clouds_quality": "off",
                        "weather_quality": "fast"
                    }
                })),
            }),
        },
        Incompatibility {
            id: "amd-particle-culling",
            description: "Some AMD drivers have issues with particle culling optimization",
            conditions: Conditions {
                hardware: Some(HardwarePattern {
                    gpu_vendor: Some("AMD"),
                    ..Default::default()
                }),
                ..Default::default()
            },
            impact: Impact::VisualGlitch,
            severity: Severity::Low,
            workaround: Some(Workaround {
                file: "sodium-options.json",
                patch: ConfigTree::from_object(json!({
                    "performance": {
                        "use_particle_culling": false
                    }
                })),
            }),
        },
        Incompatibility {
            id: "integrated-graphics-safety",
            description: "Integrated graphics should use conservative settings",
            conditions: Conditions {
                hardware: Some(HardwarePattern {
                    gpu_name: Some(regex(
                        r"(?i)(Intel.*HD|Intel.*UHD|Intel.*Iris|AMD.*Vega|AMD.*Radeon.*Graphics)",
                    )),
                    ..Default::default()
                }),
                ..Default::default()
            },
            impact: Impact::PerformanceDegradation,
            severity: Severity::Medium,
            workaround: Some(Workaround {
                file: "sodium-options.json",
                patch: ConfigTree::from_object(json!({
                    "rendering": {
                        "render_distance": 8,
                        "v_sync": true
                    },
                    "quality": {
                        "graphics_quality": "fast",
                        "leaves_quality": "fast"
                    }
                })),
            }),
        },
        Incompatibility {
            id: "immediatelyfast-sodium-compat",
            description: "ImmediatelyFast may conflict with some Sodium settings",
            conditions: Conditions {
                mods: vec!["sodium", "immediatelyfast"],
                ..Default::default()
            },
            impact: Impact::VisualGlitch,
            severity: Severity::Low,
            workaround: Some(Workaround {
                file: "immediatelyfast.json",
                patch: ConfigTree::from_object(json!({
                    "experimental_screen_batching": false
                })),
            }),
        },
    ]
});

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid regex")
}

/// The full rule list, in evaluation order
pub fn known_incompatibilities() -> &'static [Incompatibility] {
    &INCOMPATIBILITIES
}

/// Ids of every known rule
pub fn all_incompatibility_ids() -> Vec<&'static str> {
    INCOMPATIBILITIES.iter().map(|i| i.id).collect()
}

/// Looks up a rule by id
pub fn incompatibility_by_id(id: &str) -> Option<&'static Incompatibility> {
    INCOMPATIBILITIES.iter().find(|i| i.id == id)
}

/// Runs every rule against the host, installed mods and current configs
///
/// # Arguments
///
/// * `hardware` - Host fingerprint
/// * `installed_mods` - Installed mod names (without extension)
/// * `current_configs` - Per-file configs the workarounds are merged into
pub fn evaluate(
    hardware: &HardwareInfo,
    installed_mods: &[String],
    current_configs: &BTreeMap<String, ConfigTree>,
) -> IncompatibilityReport {
    let mut report = IncompatibilityReport {
        patched_configs: current_configs.clone(),
        ..Default::default()
    };

    debug!(
        cpu = %hardware.cpu_model,
        gpu = %hardware.gpu_name,
        mods = installed_mods.len(),
        "Checking known incompatibilities"
    );

    for rule in INCOMPATIBILITIES.iter() {
        if !rule.conditions.matches(hardware, installed_mods) {
            continue;
        }

        info!(id = rule.id, severity = ?rule.severity, "Incompatibility detected");
        report.detected.push(rule.id.to_string());

        if let Some(workaround) = &rule.workaround {
            let file = workaround.file.to_string();

            let current = report.patched_configs.remove(&file).unwrap_or_default();
            report
                .patched_configs
                .insert(file.clone(), deep_merge(&current, &workaround.patch, false));

            let patch = report.patches.remove(&file).unwrap_or_default();
            report
                .patches
                .insert(file, deep_merge(&patch, &workaround.patch, false));

            report.applied_workarounds.push(rule.id.to_string());
        }

        if rule.severity.is_user_visible() {
            report.warnings.push(rule.warning());
        }
    }

    info!(
        detected = report.detected.len(),
        workarounds = report.applied_workarounds.len(),
        "Incompatibility check complete"
    );

    report
}
