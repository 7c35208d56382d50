// Restore the most recent snapshot

use anyhow::ensure;

use super::Command;
use crate::context::CommandContext;
use crate::output::print_json;

/// Restore the most recent snapshot of any kind
pub struct RollbackCommand;

#[async_trait::async_trait]
impl Command for RollbackCommand {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        let result = ctx.orchestrator().rollback_preset(ctx.game_dir()).await?;

        if ctx.json {
            print_json(&result)?;
        } else {
            super::backups::print_restore(&ctx.style, &result);
        }

        ensure!(result.success, "{} file(s) could not be restored", result.failed.len());
        Ok(())
    }
}
