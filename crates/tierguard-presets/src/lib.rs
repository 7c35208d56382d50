//! Preset application for managed mod config files
//!
//! [`PresetOrchestrator`] ties the other tierguard crates together: it picks
//! a tier from the hardware profile, folds incompatibility workarounds into
//! the catalog presets, snapshots the directory and merges the result into
//! each managed file while keeping what the user changed by hand.
//! [`simulate`] previews the same merge without touching disk.

pub mod dry_run;
pub mod error;
pub mod metadata;
pub mod mods;
pub mod orchestrator;

pub use dry_run::{
    simulate, ChangeType, DiffAction, DiffEntry, DryRunOptions, DryRunResult, DryRunSummary,
    FileChange, UserModifications, NO_CHANGES_REASON,
};
pub use error::{PresetError, Result};
pub use metadata::{ConfigMetadata, MetadataStore, METADATA_FILE};
pub use mods::{ModEnumerator, ModsDirectory, StaticMods};
pub use orchestrator::{
    ApplyOptions, PresetApplicationResult, PresetOrchestrator, ProgressSink, CONFIG_DIR_NAME,
};
