//! Diagnostic logging setup for the `psprov` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is
//! left to the host.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "PSPROV_LOG";

/// Filter used when [`LOG_ENV`] is unset or invalid.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "psprov=debug" } else { "warn" }
}

/// Install a stderr `fmt` subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
