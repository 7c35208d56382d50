// Logging and verbosity control

use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive
pub const LOG_ENV_VAR: &str = "TIERGUARD_LOG";

/// Picks the filter directive: `--quiet`/`--verbose` first, then
/// `TIERGUARD_LOG`, then the configured level
pub fn filter_directive(
    verbose: bool,
    quiet: bool,
    env_directive: Option<String>,
    settings_level: &str,
) -> String {
    if quiet {
        return "error".to_string();
    }
    if verbose {
        return "debug".to_string();
    }
    match env_directive {
        Some(directive) if !directive.trim().is_empty() => directive,
        _ => settings_level.to_string(),
    }
}

/// Installs the global subscriber, writing to stderr
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool, quiet: bool, settings_level: &str) {
    let directive = filter_directive(
        verbose,
        quiet,
        std::env::var(LOG_ENV_VAR).ok(),
        settings_level,
    );
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}
