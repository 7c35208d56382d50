// Tierguard CLI library

pub mod commands;
pub mod context;
pub mod logging;
pub mod output;
pub mod router;

pub use context::CommandContext;
pub use logging::{filter_directive, init_logging};
pub use output::OutputStyle;
pub use router::{BackupsAction, Cli, CommandRouter, Commands};
