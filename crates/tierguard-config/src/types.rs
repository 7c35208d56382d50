//! Settings types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tierguard_hardware::{PresetChoice, ScreenResolution};

use crate::error::Result;

/// All tierguard settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LauncherSettings {
    /// Snapshot retention
    pub backups: BackupSettings,
    /// Preset application defaults
    pub presets: PresetSettings,
    /// Hardware probing
    pub hardware: HardwareSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Snapshot retention limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupSettings {
    /// Snapshots kept per config directory
    pub max_backups: usize,
    /// Days a snapshot is kept
    pub max_age_days: u32,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            max_backups: 10,
            max_age_days: 7,
        }
    }
}

/// Defaults for `apply`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PresetSettings {
    /// Keep values in files the user edited by hand
    pub preserve_user_modifications: bool,
    /// Run the incompatibility catalog before applying
    pub check_incompatibilities: bool,
    /// Snapshot before applying
    pub create_backup: bool,
    /// Tier used when none is given
    pub default_tier: PresetChoice,
}

impl Default for PresetSettings {
    fn default() -> Self {
        Self {
            preserve_user_modifications: true,
            check_incompatibilities: true,
            create_backup: true,
            default_tier: PresetChoice::Auto,
        }
    }
}

/// Hardware probe settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HardwareSettings {
    /// Screen width reported instead of probing
    pub screen_width: Option<u32>,
    /// Screen height reported instead of probing
    pub screen_height: Option<u32>,
    /// Seconds allowed for each external probe command
    pub probe_timeout_secs: u64,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            screen_width: None,
            screen_height: None,
            probe_timeout_secs: 5,
        }
    }
}

impl HardwareSettings {
    /// Screen override, only when both dimensions are set
    pub fn screen_resolution(&self) -> Option<ScreenResolution> {
        match (self.screen_width, self.screen_height) {
            (Some(width), Some(height)) => Some(ScreenResolution::new(width, height)),
            _ => None,
        }
    }

    /// Probe timeout as a duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive (`info`, `debug`, `tierguard_presets=trace`, ...)
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Loads, saves and validates settings
pub trait SettingsManager {
    /// Load settings from every source
    fn load_settings(&self) -> Result<LauncherSettings>;
    /// Persist settings as TOML
    fn save_settings(&self, settings: &LauncherSettings) -> Result<()>;
    /// Reject settings that would break retention or probing
    fn validate_settings(&self, settings: &LauncherSettings) -> Result<()>;
}
