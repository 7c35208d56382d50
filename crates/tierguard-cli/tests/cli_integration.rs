//! Integration tests for the tierguard command line
//! **Commands run end to end against a temporary game directory**

use std::path::{Path, PathBuf};

use clap::Parser;
use tempfile::TempDir;
use tierguard_cli::{Cli, CommandRouter};

const SETTINGS: &str = r#"
[hardware]
probe_timeout_secs = 1
screen_width = 1920
screen_height = 1080

[logging]
level = "warn"
"#;

struct Fixture {
    _root: TempDir,
    game_dir: PathBuf,
    settings: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let game_dir = root.path().join("game");
        std::fs::create_dir_all(&game_dir).unwrap();
        let settings = root.path().join("tierguard.toml");
        std::fs::write(&settings, SETTINGS).unwrap();
        Self {
            _root: root,
            game_dir,
            settings,
        }
    }

    fn config_dir(&self) -> PathBuf {
        self.game_dir.join("config")
    }

    async fn run(&self, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec![
            "tierguard".to_string(),
            "--game-dir".to_string(),
            self.game_dir.display().to_string(),
            "--config".to_string(),
            self.settings.display().to_string(),
            "--quiet".to_string(),
            "--json".to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        CommandRouter::execute(Cli::try_parse_from(argv)?).await
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_apply_writes_managed_files() {
    let fixture = Fixture::new();

    fixture.run(&["apply", "--tier", "balanced"]).await.unwrap();

    let sodium = fixture.config_dir().join("sodium-options.json");
    assert!(sodium.exists());
    assert!(fixture.config_dir().join("lithium.properties").exists());
    assert!(read(&fixture.config_dir().join("ferritecore-common.toml")).contains("[mixin]"));
    assert!(fixture.config_dir().join("launcher_config_metadata.json").exists());
}

#[tokio::test]
async fn test_dry_run_leaves_config_untouched() {
    let fixture = Fixture::new();

    fixture
        .run(&["apply", "--tier", "high-end", "--dry-run"])
        .await
        .unwrap();

    assert!(!fixture.config_dir().join("sodium-options.json").exists());
    assert!(!fixture.config_dir().join(".launcher-backups").exists());
}

#[tokio::test]
async fn test_rollback_restores_previous_content() {
    let fixture = Fixture::new();
    let config_dir = fixture.config_dir();
    std::fs::create_dir_all(&config_dir).unwrap();
    let sodium = config_dir.join("sodium-options.json");
    std::fs::write(&sodium, "{\"quality\":{\"weather_quality\":\"FANCY\"}}").unwrap();
    let before = read(&sodium);

    fixture.run(&["apply", "--tier", "low-end"]).await.unwrap();
    assert_ne!(read(&sodium), before);

    fixture.run(&["rollback"]).await.unwrap();
    assert_eq!(read(&sodium), before);
}

#[tokio::test]
async fn test_rollback_without_backups_fails() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(fixture.config_dir()).unwrap();

    let err = fixture.run(&["rollback"]).await.unwrap_err();
    assert!(format!("{:#}", err).contains("No backup"));
}

#[tokio::test]
async fn test_user_managed_files_are_skipped() {
    let fixture = Fixture::new();

    fixture.run(&["manage", "--user"]).await.unwrap();
    fixture.run(&["apply", "--tier", "balanced"]).await.unwrap();
    assert!(!fixture.config_dir().join("sodium-options.json").exists());

    fixture.run(&["apply", "--tier", "balanced", "--force"]).await.unwrap();
    assert!(fixture.config_dir().join("sodium-options.json").exists());
}

#[tokio::test]
async fn test_restore_unknown_backup_fails() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(fixture.config_dir()).unwrap();

    let result = fixture
        .run(&["backups", "restore", "2020-01-01T00-00-00-000Z"])
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_invalid_settings_are_rejected() {
    let fixture = Fixture::new();
    std::fs::write(&fixture.settings, "[backups]\nmax_backups = 0\n").unwrap();

    assert!(fixture.run(&["audit"]).await.is_err());
}
