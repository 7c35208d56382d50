// Shared state handed to every command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tierguard_backup::RetentionPolicy;
use tierguard_config::LauncherSettings;
use tierguard_hardware::{HardwareProfiler, SystemProbe};
use tierguard_presets::PresetOrchestrator;

use crate::output::OutputStyle;

/// Resolved global options and settings
pub struct CommandContext {
    pub game_dir: PathBuf,
    pub settings: LauncherSettings,
    pub json: bool,
    pub style: OutputStyle,
}

impl CommandContext {
    pub fn new(game_dir: PathBuf, settings: LauncherSettings, json: bool) -> Self {
        let style = if json {
            OutputStyle::plain()
        } else {
            OutputStyle::default()
        };
        Self {
            game_dir,
            settings,
            json,
            style,
        }
    }

    pub fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    /// Profiler over this machine, honoring the hardware settings
    pub fn profiler(&self) -> HardwareProfiler {
        let probe = SystemProbe::new()
            .with_timeout(self.settings.hardware.probe_timeout())
            .with_screen_resolution(self.settings.hardware.screen_resolution());
        HardwareProfiler::new(Arc::new(probe))
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_backups: self.settings.backups.max_backups,
            max_age_days: self.settings.backups.max_age_days,
        }
    }

    /// Orchestrator wired to this machine and the configured retention
    pub fn orchestrator(&self) -> PresetOrchestrator {
        PresetOrchestrator::new(self.profiler()).with_retention(self.retention())
    }
}
