// Command routing and dispatch

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use tierguard_config::ConfigManager;
use tierguard_hardware::PresetChoice;

use crate::commands::*;
use crate::context::CommandContext;
use crate::logging::init_logging;

/// Tierguard - hardware-aware performance presets for mod configs
#[derive(Parser, Debug)]
#[command(name = "tierguard")]
#[command(bin_name = "tierguard")]
#[command(about = "Hardware-aware performance presets for mod config files")]
#[command(
    long_about = "Tierguard picks a performance tier for this machine and merges it into the \
known mod config files under <game-dir>/config, keeping your own edits.\n\nEvery change is \
preceded by a snapshot, so `tierguard rollback` can always undo the last one."
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Game directory containing `config/` and `mods/`
    #[arg(short, long, global = true, default_value = ".")]
    pub game_dir: PathBuf,

    /// Settings file (default: <config dir>/tierguard/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Apply a performance preset
    #[command(about = "Merge a tier preset into the managed config files")]
    Apply {
        /// Tier to apply: auto, low-end, balanced or high-end
        #[arg(short, long)]
        tier: Option<PresetChoice>,

        /// Preview changes without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Apply even when the files are user-managed
        #[arg(long)]
        force: bool,

        /// Overwrite values in files edited by hand
        #[arg(long)]
        no_preserve: bool,

        /// Skip the incompatibility check
        #[arg(long)]
        no_incompat: bool,

        /// Do not snapshot before applying
        #[arg(long)]
        no_backup: bool,
    },

    /// Undo the last change
    #[command(about = "Restore the most recent snapshot")]
    Rollback,

    /// Manage snapshots
    #[command(about = "List, create or restore config snapshots")]
    Backups {
        #[command(subcommand)]
        action: BackupsAction,
    },

    /// Show the audit trail
    #[command(about = "Show recent audited operations, newest first")]
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Write conservative settings
    #[command(about = "Overwrite key config files with minimal-risk settings")]
    SafeBoot,

    /// Show the hardware profile
    #[command(about = "Detect hardware and show the recommended tier")]
    Hardware,

    /// Switch between automatic and user management
    #[command(about = "Opt the config files out of (or back into) automatic presets")]
    #[command(group(ArgGroup::new("mode").required(true).args(["user", "auto"])))]
    Manage {
        /// Leave the files to the user
        #[arg(long)]
        user: bool,

        /// Let tierguard manage the files again
        #[arg(long)]
        auto: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum BackupsAction {
    /// List snapshots, newest first
    List,
    /// Take a manual snapshot
    Create,
    /// Restore a snapshot by id
    Restore {
        /// Backup id as shown by `backups list`
        #[arg(value_name = "ID")]
        id: String,
    },
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse the process arguments and run the selected command
    pub async fn route() -> anyhow::Result<()> {
        let cli = Cli::parse();
        Self::execute(cli).await
    }

    /// Run a parsed command line
    pub async fn execute(cli: Cli) -> anyhow::Result<()> {
        let manager = match &cli.config {
            Some(path) => ConfigManager::with_path(path.clone()),
            None => ConfigManager::new(),
        };
        let settings = manager
            .load_validated()
            .with_context(|| format!("Failed to load settings from {}", manager.config_path().display()))?;

        init_logging(cli.verbose, cli.quiet, &settings.logging.level);

        let ctx = CommandContext::new(cli.game_dir.clone(), settings, cli.json);

        match cli.command {
            Commands::Apply {
                tier,
                dry_run,
                force,
                no_preserve,
                no_incompat,
                no_backup,
            } => {
                let command = ApplyCommand::new(tier, &ctx.settings.presets)
                    .dry_run(dry_run)
                    .force(force)
                    .no_preserve(no_preserve)
                    .no_incompat(no_incompat)
                    .no_backup(no_backup);
                command.execute(&ctx).await
            }
            Commands::Rollback => RollbackCommand.execute(&ctx).await,
            Commands::Backups { action } => BackupsCommand::new(action).execute(&ctx).await,
            Commands::Audit { limit } => AuditCommand::new(limit).execute(&ctx).await,
            Commands::SafeBoot => SafeBootCommand.execute(&ctx).await,
            Commands::Hardware => HardwareCommand.execute(&ctx).await,
            Commands::Manage { user, .. } => ManageCommand::new(user).execute(&ctx).await,
        }
    }
}
