//! Logging setup for the `smallsh` binary.

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "SMALLSH_LOG";

/// Log to standard error so diagnostics never mix with command output.
///
/// `SMALLSH_LOG` wins when set; otherwise `-v` selects `debug` and the default
/// is `warn`.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();

    debug!("smallsh {} started", env!("CARGO_PKG_VERSION"));
}
