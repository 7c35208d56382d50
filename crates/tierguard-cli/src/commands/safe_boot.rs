// Write conservative settings

use anyhow::ensure;

use super::Command;
use crate::context::CommandContext;
use crate::output::print_json;

/// Overwrite key config files with minimal-risk settings
pub struct SafeBootCommand;

#[async_trait::async_trait]
impl Command for SafeBootCommand {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        let result = ctx.orchestrator().apply_safe_boot(ctx.game_dir()).await?;

        if ctx.json {
            print_json(&result)?;
        } else {
            let style = &ctx.style;
            println!("{}", style.success("Safe boot settings written"));
            println!("{}", style.key_value("Backup", &style.code(&result.backup_id)));
            for file in &result.modified {
                println!("{}", style.list_item(file));
            }
            for file in &result.failed {
                println!("{}", style.error(&format!("Failed to write {}", file)));
            }
        }

        ensure!(result.failed.is_empty(), "{} file(s) could not be written", result.failed.len());
        Ok(())
    }
}
