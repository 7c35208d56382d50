// Hardware profile display

use std::collections::BTreeMap;

use serde::Serialize;
use tierguard_catalog::{evaluate, incompatibility_by_id};
use tierguard_hardware::HardwareInfo;
use tierguard_presets::{ModEnumerator, ModsDirectory};

use super::Command;
use crate::context::CommandContext;
use crate::output::{print_json, OutputStyle};

/// Detect hardware and show the recommended tier
pub struct HardwareCommand;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HardwareReport {
    hardware: HardwareInfo,
    installed_mods: usize,
    incompatibilities: Vec<String>,
    warnings: Vec<String>,
}

impl HardwareCommand {
    pub fn render(style: &OutputStyle, hardware: &HardwareInfo) -> String {
        let resolution = hardware.screen_resolution;
        [
            style.section("Hardware"),
            style.key_value(
                "CPU",
                &format!(
                    "{} ({} cores, {})",
                    hardware.cpu_model, hardware.cpu_cores, hardware.cpu_arch
                ),
            ),
            style.key_value("GPU", &format!("{} ({})", hardware.gpu_name, hardware.gpu_type)),
            style.key_value("RAM", &format!("{} GB", hardware.total_ram_gb)),
            style.key_value("OS", &hardware.os),
            style.key_value("Screen", &format!("{}x{}", resolution.width, resolution.height)),
            style.key_value("Score", &format!("{}/100", hardware.score)),
            style.key_value("Recommended tier", &style.code(hardware.recommended_preset.as_str())),
        ]
        .join("\n")
    }
}

#[async_trait::async_trait]
impl Command for HardwareCommand {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        let hardware = ctx.profiler().detect().await;
        let mods = ModsDirectory.list_installed_mods(ctx.game_dir()).await;
        let report = evaluate(&hardware, &mods, &BTreeMap::new());

        if ctx.json {
            return print_json(&HardwareReport {
                hardware,
                installed_mods: mods.len(),
                incompatibilities: report.detected,
                warnings: report.warnings,
            });
        }

        println!("{}", Self::render(&ctx.style, &hardware));
        if !report.detected.is_empty() {
            println!("{}", ctx.style.section("Known issues"));
            for id in &report.detected {
                let line = match incompatibility_by_id(id) {
                    Some(rule) => format!("{}: {}", ctx.style.code(id), rule.description),
                    None => id.clone(),
                };
                println!("{}", ctx.style.list_item(&line));
            }
        }
        for warning in &report.warnings {
            println!("{}", ctx.style.warning(warning));
        }
        Ok(())
    }
}
