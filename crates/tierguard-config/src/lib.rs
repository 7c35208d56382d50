//! Tierguard settings
//!
//! Settings are layered: built-in defaults, then an optional TOML file
//! (`<config dir>/tierguard/config.toml` unless a path is given), then
//! `TIERGUARD_*` environment variables with `__` separating nested keys,
//! e.g. `TIERGUARD_BACKUPS__MAX_BACKUPS=5`.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{ConfigError, Result};
pub use manager::ConfigManager;
pub use types::{
    BackupSettings, HardwareSettings, LauncherSettings, LoggingSettings, PresetSettings,
    SettingsManager,
};
