// Snapshot management

use anyhow::{ensure, Context};
use tierguard_backup::{BackupEntry, RollbackResult};

use super::Command;
use crate::context::CommandContext;
use crate::output::{print_json, OutputStyle};
use crate::router::BackupsAction;

/// List, create or restore snapshots
pub struct BackupsCommand {
    action: BackupsAction,
}

impl BackupsCommand {
    pub fn new(action: BackupsAction) -> Self {
        Self { action }
    }

    async fn list(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        let backups = ctx
            .orchestrator()
            .backup_store(ctx.game_dir())
            .list_backups()
            .await;

        if ctx.json {
            return print_json(&backups);
        }

        if backups.is_empty() {
            println!("{}", ctx.style.info("No backups yet"));
            return Ok(());
        }

        println!("{}", ctx.style.section("Backups"));
        for entry in &backups {
            println!("{}", render_entry(&ctx.style, entry));
        }
        Ok(())
    }

    async fn create(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        let backup_id = ctx
            .orchestrator()
            .create_manual_backup(ctx.game_dir())
            .await
            .context("Failed to create backup")?;

        if ctx.json {
            print_json(&serde_json::json!({ "backupId": backup_id }))
        } else {
            println!(
                "{}",
                ctx.style
                    .success(&format!("Created backup {}", ctx.style.code(&backup_id)))
            );
            Ok(())
        }
    }

    async fn restore(&self, ctx: &CommandContext, id: &str) -> anyhow::Result<()> {
        let result = ctx
            .orchestrator()
            .restore_backup(ctx.game_dir(), id)
            .await
            .with_context(|| format!("Failed to restore backup {}", id))?;

        if ctx.json {
            print_json(&result)?;
        } else {
            print_restore(&ctx.style, &result);
        }

        ensure!(result.success, "{} file(s) could not be restored", result.failed.len());
        Ok(())
    }
}

#[async_trait::async_trait]
impl Command for BackupsCommand {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        match &self.action {
            BackupsAction::List => self.list(ctx).await,
            BackupsAction::Create => self.create(ctx).await,
            BackupsAction::Restore { id } => self.restore(ctx, id).await,
        }
    }
}

/// One line per snapshot: id, reason, file count and tier
pub fn render_entry(style: &OutputStyle, entry: &BackupEntry) -> String {
    let mut line = format!(
        "{} {} ({} file{})",
        style.code(&entry.id),
        entry.reason,
        entry.files.len(),
        if entry.files.len() == 1 { "" } else { "s" }
    );
    if let Some(preset) = &entry.preset_applied {
        line.push_str(&format!(", preset {}", preset));
    }
    if !entry.can_restore {
        line.push_str(", empty");
    }
    style.list_item(&line)
}

pub(crate) fn print_restore(style: &OutputStyle, result: &RollbackResult) {
    if result.success {
        println!(
            "{}",
            style.success(&format!("Restored backup {}", style.code(&result.backup_id)))
        );
    } else {
        println!(
            "{}",
            style.error(&format!("Partially restored backup {}", result.backup_id))
        );
    }
    if let Some(pre_rollback) = &result.pre_rollback_backup_id {
        println!("{}", style.key_value("Previous state saved as", &style.code(pre_rollback)));
    }
    for file in &result.restored {
        println!("{}", style.list_item(file));
    }
    for file in &result.failed {
        println!("{}", style.error(&format!("Failed to restore {}", file)));
    }
}
