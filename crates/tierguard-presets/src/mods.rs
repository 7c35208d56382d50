//! Installed-mod enumeration

use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

/// Name of the mods folder inside a game directory
pub const MODS_DIR_NAME: &str = "mods";
/// Extension of installed mod archives
pub const MOD_EXTENSION: &str = "jar";

/// Lists the mods installed in a game directory
#[async_trait]
pub trait ModEnumerator: Send + Sync {
    /// Installed mod names without their archive extension
    ///
    /// Returns an empty list when nothing can be listed.
    async fn list_installed_mods(&self, game_dir: &Path) -> Vec<String>;
}

/// Reads `<game_dir>/mods/*.jar`
#[derive(Debug, Clone, Copy, Default)]
pub struct ModsDirectory;

#[async_trait]
impl ModEnumerator for ModsDirectory {
    async fn list_installed_mods(&self, game_dir: &Path) -> Vec<String> {
        let mods_dir = game_dir.join(MODS_DIR_NAME);
        let mut entries = match fs::read_dir(&mods_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %mods_dir.display(), error = %e, "No mods directory");
                return Vec::new();
            }
        };

        let mut mods = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    let is_jar = path.extension().and_then(|e| e.to_str()) == Some(MOD_EXTENSION);
                    if !is_jar {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        mods.push(stem.to_string());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %mods_dir.display(), error = %e, "Failed to list mods");
                    break;
                }
            }
        }

        mods.sort();
        mods
    }
}

/// A fixed mod list, for callers that already know what is installed
#[derive(Debug, Clone, Default)]
pub struct StaticMods(pub Vec<String>);

#[async_trait]
impl ModEnumerator for StaticMods {
    async fn list_installed_mods(&self, _game_dir: &Path) -> Vec<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_jars_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mods = dir.path().join(MODS_DIR_NAME);
        fs::create_dir(&mods).await.unwrap();
        fs::write(mods.join("sodium-fabric-0.5.8.jar"), "").await.unwrap();
        fs::write(mods.join("immediatelyfast.jar"), "").await.unwrap();
        fs::write(mods.join("readme.txt"), "").await.unwrap();
        fs::create_dir(mods.join("nested")).await.unwrap();

        let listed = ModsDirectory.list_installed_mods(dir.path()).await;
        assert_eq!(listed, vec!["immediatelyfast", "sodium-fabric-0.5.8"]);
    }

    #[tokio::test]
    async fn test_missing_mods_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ModsDirectory.list_installed_mods(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_static_mods() {
        let mods = StaticMods(vec!["sodium".to_string()]);
        assert_eq!(
            mods.list_installed_mods(Path::new("/nowhere")).await,
            vec!["sodium"]
        );
    }
}
