// Command handlers for the tierguard CLI

pub mod apply;
pub mod audit;
pub mod backups;
pub mod hardware;
pub mod manage;
pub mod rollback;
pub mod safe_boot;

pub use apply::ApplyCommand;
pub use audit::AuditCommand;
pub use backups::BackupsCommand;
pub use hardware::HardwareCommand;
pub use manage::ManageCommand;
pub use rollback::RollbackCommand;
pub use safe_boot::SafeBootCommand;

use crate::context::CommandContext;

/// Trait for command handlers
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Execute the command
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()>;
}
