//! Telemetry errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised while setting up telemetry. Emission itself never errors;
/// write failures are swallowed by design.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The telemetry log file could not be opened for append.
    #[error("failed to open telemetry log {path}: {source}")]
    Open {
        /// The destination path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
