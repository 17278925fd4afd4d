//! Capstan Telemetry - append-only invocation trail and logging setup.
//!
//! This crate provides:
//! - [`TelemetrySink`]: one JSON record per line appended to a shared log
//!   file, writers serialized behind a single lock
//! - [`TelemetryEvent`]: the start/finish lifecycle records
//! - [`init_logging`]: `tracing-subscriber` setup for binaries
//!
//! Telemetry is best-effort and never load-bearing: a sink without a
//! destination is a silent no-op, and a write failure is logged and
//! swallowed rather than failing the invocation it describes.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod event;
mod logging;
mod sink;

pub use error::{TelemetryError, TelemetryResult};
pub use event::{EventKind, InvocationOutcome, TelemetryEvent};
pub use logging::init_logging;
pub use sink::TelemetrySink;
