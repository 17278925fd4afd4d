//! Guardrails — the bounded runtime constraints attached to a capability.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ManifestError, ManifestResult};

/// Default wall-clock ceiling for one invocation, in seconds.
pub const DEFAULT_MAX_RUNTIME_SECONDS: u64 = 900;

/// Environment variables passed through when a manifest declares none.
pub const DEFAULT_ALLOWED_ENV: &[&str] = &["PATH", "PYTHONPATH", "HOME"];

/// Default truncation ceiling per captured stream, in bytes.
pub const DEFAULT_STREAM_MAX_BYTES: usize = 8192;

/// Default substitution token for redacted output.
pub const DEFAULT_REDACT_REPLACEMENT: &str = "***";

const MIN_RUNTIME_SECONDS: u64 = 30;
const MAX_RUNTIME_SECONDS: u64 = 7200;
const MIN_STREAM_BYTES: usize = 256;
const MAX_STREAM_BYTES: usize = 65536;
const MIN_REPLACEMENT_LEN: usize = 3;

/// Runtime constraints for one capability.
///
/// Set-valued fields are stored deduplicated and ordered; declaration order
/// in the manifest carries no meaning for them. `redact_patterns` is the one
/// ordered field: patterns are applied to captured output in declaration
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Guardrails {
    /// Wall-clock ceiling per invocation, seconds. Bounded [30, 7200].
    pub max_runtime_seconds: u64,
    /// Exit codes that classify as `ok`.
    pub allowed_exit_codes: BTreeSet<i32>,
    /// Environment variable names copied into the subprocess environment.
    pub allowed_env: BTreeSet<String>,
    /// Directory prefixes (relative to the module repo root) the entrypoint
    /// must resolve under. Empty means the repo root alone is the boundary.
    pub allowed_entrypoint_roots: BTreeSet<String>,
    /// Advisory network declaration; not enforced in-process.
    pub allow_network: bool,
    /// Simultaneous in-flight invocations of this capability. Minimum 1.
    pub max_concurrency: usize,
    /// Truncation ceiling for captured stdout, bytes. Bounded [256, 65536].
    pub stdout_max_bytes: usize,
    /// Truncation ceiling for captured stderr, bytes. Bounded [256, 65536].
    pub stderr_max_bytes: usize,
    /// Regular expressions substituted out of captured output, in order.
    pub redact_patterns: Vec<String>,
    /// Substitution token for redacted spans. Minimum length 3.
    pub redact_replacement: String,
    /// Free-form annotations propagated into telemetry events.
    pub telemetry_tags: BTreeMap<String, String>,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            max_runtime_seconds: DEFAULT_MAX_RUNTIME_SECONDS,
            allowed_exit_codes: BTreeSet::from([0]),
            allowed_env: DEFAULT_ALLOWED_ENV.iter().map(ToString::to_string).collect(),
            allowed_entrypoint_roots: BTreeSet::new(),
            allow_network: false,
            max_concurrency: 1,
            stdout_max_bytes: DEFAULT_STREAM_MAX_BYTES,
            stderr_max_bytes: DEFAULT_STREAM_MAX_BYTES,
            redact_patterns: Vec::new(),
            redact_replacement: DEFAULT_REDACT_REPLACEMENT.to_string(),
            telemetry_tags: BTreeMap::new(),
        }
    }
}

impl Guardrails {
    /// Validate bounds and compile-check redaction patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::GuardrailBounds`] when a numeric field is out
    /// of range or an env name is malformed, and
    /// [`ManifestError::RedactPattern`] when a pattern fails to compile.
    pub fn validate(&self, capability: &str) -> ManifestResult<()> {
        let bounds_err = |detail: String| ManifestError::GuardrailBounds {
            capability: capability.to_string(),
            detail,
        };

        if !(MIN_RUNTIME_SECONDS..=MAX_RUNTIME_SECONDS).contains(&self.max_runtime_seconds) {
            return Err(bounds_err(format!(
                "maxRuntimeSeconds {} not in [{MIN_RUNTIME_SECONDS}, {MAX_RUNTIME_SECONDS}]",
                self.max_runtime_seconds
            )));
        }
        if self.max_concurrency < 1 {
            return Err(bounds_err("maxConcurrency must be >= 1".to_string()));
        }
        for (name, value) in [
            ("stdoutMaxBytes", self.stdout_max_bytes),
            ("stderrMaxBytes", self.stderr_max_bytes),
        ] {
            if !(MIN_STREAM_BYTES..=MAX_STREAM_BYTES).contains(&value) {
                return Err(bounds_err(format!(
                    "{name} {value} not in [{MIN_STREAM_BYTES}, {MAX_STREAM_BYTES}]"
                )));
            }
        }
        if self.redact_replacement.len() < MIN_REPLACEMENT_LEN {
            return Err(bounds_err(format!(
                "redactReplacement must be at least {MIN_REPLACEMENT_LEN} characters"
            )));
        }
        for env in &self.allowed_env {
            if env.is_empty() || env.contains('=') || env.contains('\0') {
                return Err(bounds_err(format!("allowedEnv entry '{env}' is not a valid name")));
            }
        }

        self.compiled_redact_patterns(capability).map(|_| ())
    }

    /// Compile `redact_patterns` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::RedactPattern`] for the first pattern that
    /// fails to compile.
    pub fn compiled_redact_patterns(&self, capability: &str) -> ManifestResult<Vec<Regex>> {
        self.redact_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ManifestError::RedactPattern {
                    capability: capability.to_string(),
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }
}
