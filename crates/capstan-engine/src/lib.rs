//! Capstan Engine - guardrail-enforcing capability execution.
//!
//! This crate provides:
//! - [`ExecutionEngine`]: runs one validated invocation as a constrained
//!   subprocess with admission control, a wall-clock ceiling, output
//!   redaction and tail truncation, and outcome classification
//! - [`Gateway`]: the caller-facing façade that looks a capability up by id,
//!   validates inputs against its synthesized schema, and drives the engine
//! - [`run_health_command`]: module liveness probing
//!
//! Invocation-time failures never propagate as faults: spawn failures,
//! non-allowed exit codes, and timeouts all produce a structured
//! [`InvocationResult`], so one capability's failure cannot crash the host
//! process or affect other in-flight invocations.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod command;
mod engine;
mod gateway;
mod probe;
mod redact;
mod result;
mod truncate;

pub use command::{build_argv, display_command, to_upper_snake};
pub use engine::ExecutionEngine;
pub use gateway::{Gateway, InvokeError};
pub use probe::{ProbeOutcome, run_health_command};
pub use redact::Redactor;
pub use result::{InvocationResult, InvocationStatus};
pub use truncate::truncate_tail;
