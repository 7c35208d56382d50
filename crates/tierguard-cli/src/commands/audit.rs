// Audit trail display

use tierguard_backup::AuditEntry;

use super::Command;
use crate::context::CommandContext;
use crate::output::{print_json, OutputStyle};

/// Show the most recent audit entries, newest first
pub struct AuditCommand {
    limit: usize,
}

impl AuditCommand {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// One line per entry, with details worth scanning for
    pub fn render(style: &OutputStyle, entry: &AuditEntry) -> String {
        let mut line = format!(
            "{} {} [{}]",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.result
        );
        if let Some(preset) = &entry.details.preset {
            line.push_str(&format!(" preset={}", preset));
        }
        if let Some(backup_id) = &entry.details.backup_id {
            line.push_str(&format!(" backup={}", style.code(backup_id)));
        }
        if !entry.details.files_modified.is_empty() {
            line.push_str(&format!(" files={}", entry.details.files_modified.len()));
        }
        let mut lines = vec![style.list_item(&line)];
        for error in &entry.errors {
            lines.push(format!("    {}", style.error(error)));
        }
        lines.join("\n")
    }
}

#[async_trait::async_trait]
impl Command for AuditCommand {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        let entries = ctx
            .orchestrator()
            .backup_store(ctx.game_dir())
            .recent_audit_entries(self.limit)
            .await;

        if ctx.json {
            return print_json(&entries);
        }

        if entries.is_empty() {
            println!("{}", ctx.style.info("No audited operations yet"));
            return Ok(());
        }

        println!("{}", ctx.style.section("Audit log"));
        for entry in &entries {
            println!("{}", Self::render(&ctx.style, entry));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tierguard_backup::{AuditAction, AuditDetails, AuditResult};

    #[test]
    fn test_render_entry_with_errors() {
        let mut entry = AuditEntry::new(
            AuditAction::PresetApplied,
            AuditDetails {
                preset: Some("low-end".to_string()),
                files_modified: vec!["sodium-options.json".to_string()],
                ..Default::default()
            },
            AuditResult::Partial,
        )
        .with_errors(vec!["lithium.properties: denied".to_string()]);
        entry.timestamp = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();

        let rendered = AuditCommand::render(&OutputStyle::plain(), &entry);
        assert_eq!(
            rendered,
            "  • 2025-03-01 10:00:00 preset-applied [partial] preset=low-end files=1\n    ✗ lithium.properties: denied"
        );
    }
}
