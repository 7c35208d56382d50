//! Settings manager implementation

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    types::{LauncherSettings, SettingsManager},
};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TIERGUARD";

/// Settings manager
pub struct ConfigManager {
    /// Settings file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
}

impl ConfigManager {
    /// Create a manager using the default settings path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Create with custom settings path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Settings file this manager reads and writes
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get default settings path
    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tierguard")
            .join("config.toml")
    }

    /// Load and validate in one step
    pub fn load_validated(&self) -> Result<LauncherSettings> {
        let settings = self.load_settings()?;
        self.validate_settings(&settings)?;
        Ok(settings)
    }
}

impl SettingsManager for ConfigManager {
    fn load_settings(&self) -> Result<LauncherSettings> {
        let builder = Config::builder()
            .add_source(
                File::from(self.config_path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let settings: LauncherSettings = config.try_deserialize()?;
        debug!(path = %self.config_path.display(), "Settings loaded");
        Ok(settings)
    }

    fn save_settings(&self, settings: &LauncherSettings) -> Result<()> {
        let toml = toml::to_string(settings)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, toml)?;
        debug!(path = %self.config_path.display(), "Settings saved");
        Ok(())
    }

    fn validate_settings(&self, settings: &LauncherSettings) -> Result<()> {
        if settings.backups.max_backups == 0 {
            return Err(ConfigError::Validation(
                "backups.max_backups must be greater than 0".to_string(),
            ));
        }
        if settings.backups.max_age_days == 0 {
            return Err(ConfigError::Validation(
                "backups.max_age_days must be greater than 0".to_string(),
            ));
        }
        if settings.hardware.probe_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "hardware.probe_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if settings.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
