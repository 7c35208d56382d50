// Apply a performance preset

use anyhow::{ensure, Context};
use tierguard_config::PresetSettings;
use tierguard_hardware::PresetChoice;
use tierguard_presets::{ApplyOptions, PresetApplicationResult};
use tracing::info;

use super::Command;
use crate::context::CommandContext;
use crate::output::{print_json, OutputStyle};

/// Merge a tier preset into the managed config files
pub struct ApplyCommand {
    choice: PresetChoice,
    options: ApplyOptions,
}

impl ApplyCommand {
    /// Starts from the configured defaults; `tier` overrides the default tier
    pub fn new(tier: Option<PresetChoice>, settings: &PresetSettings) -> Self {
        Self {
            choice: tier.unwrap_or(settings.default_tier),
            options: ApplyOptions {
                preserve_user_modifications: settings.preserve_user_modifications,
                check_incompatibilities: settings.check_incompatibilities,
                create_backup: settings.create_backup,
                ..Default::default()
            },
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.options.force_overwrite = force;
        self
    }

    pub fn no_preserve(mut self, no_preserve: bool) -> Self {
        if no_preserve {
            self.options.preserve_user_modifications = false;
        }
        self
    }

    pub fn no_incompat(mut self, no_incompat: bool) -> Self {
        if no_incompat {
            self.options.check_incompatibilities = false;
        }
        self
    }

    pub fn no_backup(mut self, no_backup: bool) -> Self {
        if no_backup {
            self.options.create_backup = false;
        }
        self
    }

    pub fn choice(&self) -> PresetChoice {
        self.choice
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Human-readable summary of an apply
    pub fn render(style: &OutputStyle, result: &PresetApplicationResult) -> String {
        let mut lines = Vec::new();

        if let Some(simulation) = &result.dry_run {
            lines.push(simulation.to_string());
            return lines.join("\n");
        }

        if result.applied_files.is_empty() && !result.skipped_files.is_empty() {
            lines.push(style.info("Config files are user-managed; nothing was changed"));
            lines.push(style.info("Run `tierguard manage --auto` or pass --force to apply anyway"));
            return lines.join("\n");
        }

        let headline = format!("Applied {} preset", result.preset);
        lines.push(if result.success {
            style.success(&headline)
        } else {
            style.error(&format!("{} with errors", headline))
        });
        if let Some(backup_id) = &result.backup_id {
            lines.push(style.key_value("Backup", &style.code(backup_id)));
        }
        lines.push(style.key_value("Files written", &result.applied_files.len().to_string()));
        if !result.workarounds_applied.is_empty() {
            lines.push(style.key_value("Workarounds", &result.workarounds_applied.join(", ")));
        }
        for warning in &result.warnings {
            lines.push(style.warning(warning));
        }
        for error in &result.errors {
            lines.push(style.error(error));
        }

        lines.join("\n")
    }
}

#[async_trait::async_trait]
impl Command for ApplyCommand {
    async fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        let orchestrator = ctx
            .orchestrator()
            .with_progress(|label, percent| info!(percent, "{}", label));

        let result = orchestrator
            .apply_preset(ctx.game_dir(), self.choice, &self.options)
            .await
            .with_context(|| format!("Game directory: {}", ctx.game_dir().display()))?;

        if ctx.json {
            print_json(&result)?;
        } else {
            println!("{}", Self::render(&ctx.style, &result));
        }

        ensure!(
            result.success,
            "Preset application finished with {} error(s)",
            result.errors.len()
        );
        Ok(())
    }
}
