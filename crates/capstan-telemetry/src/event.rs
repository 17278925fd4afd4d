//! Telemetry event records.

use capstan_manifest::Guardrails;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Lifecycle position of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Emitted after admission, before spawn.
    Start,
    /// Emitted once the invocation is finalized.
    Finish,
}

/// Outcome fields carried only by finish events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationOutcome {
    /// Classified status: `ok`, `error`, or `timeout`.
    pub status: String,
    /// Child exit code, absent on spawn failure.
    pub exit_code: Option<i32>,
    /// Wall-clock duration, seconds.
    pub duration: f64,
    /// Whether the runtime ceiling was hit.
    pub timed_out: bool,
}

/// One line in the telemetry trail.
///
/// Start events carry only input key names, never values, so secrets cannot
/// leak into the trail. Start and finish share an `invocation` correlation
/// id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    /// `start` or `finish`.
    pub event: EventKind,
    /// RFC 3339 UTC emission time.
    pub timestamp: DateTime<Utc>,
    /// Correlation id joining this invocation's start and finish.
    pub invocation: Uuid,
    /// Capability id.
    pub capability: String,
    /// Owning module id.
    pub module_id: String,
    /// Resolved entrypoint path.
    pub entrypoint: PathBuf,
    /// The capability's guardrails, echoed for audit.
    pub guardrails: Guardrails,
    /// Capability telemetry tags.
    pub tags: BTreeMap<String, String>,
    /// Sorted caller input key names (never values).
    pub inputs: Vec<String>,
    /// Outcome; present on finish events only.
    #[serde(flatten)]
    pub outcome: Option<InvocationOutcome>,
}

impl TelemetryEvent {
    /// Build a start event.
    #[must_use]
    pub fn start(
        invocation: Uuid,
        capability: &str,
        module_id: &str,
        entrypoint: &Path,
        guardrails: &Guardrails,
        input_keys: Vec<String>,
    ) -> Self {
        Self {
            event: EventKind::Start,
            timestamp: Utc::now(),
            invocation,
            capability: capability.to_string(),
            module_id: module_id.to_string(),
            entrypoint: entrypoint.to_path_buf(),
            guardrails: guardrails.clone(),
            tags: guardrails.telemetry_tags.clone(),
            inputs: input_keys,
            outcome: None,
        }
    }

    /// Build the matching finish event from a start event.
    #[must_use]
    pub fn finish(start: &Self, outcome: InvocationOutcome) -> Self {
        Self {
            event: EventKind::Finish,
            timestamp: Utc::now(),
            outcome: Some(outcome),
            ..start.clone()
        }
    }
}
