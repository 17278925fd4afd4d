//! Logging setup for binaries.

use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter.
const LOG_ENV: &str = "CAPSTAN_LOG";

/// Initialize the global `tracing` subscriber.
///
/// The filter comes from `CAPSTAN_LOG` when set, otherwise `debug` with
/// `verbose` or `info` without. Logs go to stderr so they never mix with
/// command output on stdout. Calling this twice is harmless; the second call
/// is a no-op.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
