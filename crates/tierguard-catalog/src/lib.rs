//! Static catalogs for tierguard
//!
//! All tables here are immutable data built once on first use:
//!
//! - [`managed`]: the seven config files tierguard is allowed to touch
//! - [`presets`]: per-tier settings for each managed file
//! - [`incompat`]: known hardware/OS/mod problems and their workaround patches
//! - [`safe_boot`]: conservative settings used for last-resort recovery

pub mod incompat;
pub mod managed;
pub mod presets;
pub mod safe_boot;

pub use incompat::{
    all_incompatibility_ids, evaluate, incompatibility_by_id, known_incompatibilities,
    Conditions, HardwarePattern, Impact, Incompatibility, IncompatibilityReport, Severity,
    Workaround,
};
pub use managed::{managed_file, ManagedFile, MANAGED_FILES};
pub use presets::{preset_for, presets_for_tier};
pub use safe_boot::safe_boot_configs;
