// Toggle user management of the config files

use super::Command;
use crate::context::CommandContext;
use crate::output::print_json;

/// Opt the config files out of, or back into, automatic presets
pub struct ManageCommand {
    user_managed: bool,
}

impl ManageCommand {
    pub fn new(user_managed: bool) -> Self {
        Self { user_managed }
    }
}

#[async_trait::async_trait]
impl Command for ManageCommand {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        let metadata = ctx
            .orchestrator()
            .set_user_managed(ctx.game_dir(), self.user_managed)
            .await?;

        if ctx.json {
            return print_json(&metadata);
        }

        let message = if metadata.user_managed {
            "Config files are now user-managed; `apply` will leave them alone"
        } else {
            "Config files are managed by tierguard again"
        };
        println!("{}", ctx.style.success(message));
        Ok(())
    }
}
