//! Structured logging setup.
//!
//! Log lines go to stderr through `tracing-subscriber`. `NIMBUS_LOG` takes an
//! `EnvFilter` directive and wins over `--verbosity`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive.
pub const LOG_ENV: &str = "NIMBUS_LOG";

/// Maps a `--verbosity` level to a filter directive.
///
/// `critical` maps to `error` and `none` disables logging. Unknown levels are
/// rejected by the command-line parser, so they fall back to `warn`.
#[must_use]
pub fn directive_for(verbosity: &str) -> &'static str {
    match verbosity.to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "info" => "info",
        "error" | "critical" => "error",
        "none" => "off",
        _ => "warn",
    }
}

/// Installs the global subscriber. Repeated calls are ignored.
pub fn init(verbosity: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(directive_for(verbosity)));
    if tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::trace!("logging already initialised");
    }
}
