//! The structured invocation result.

use serde::Serialize;

/// Classified outcome of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    /// Exit code was allowed and the runtime ceiling was not hit.
    Ok,
    /// Spawn failure or a non-allowed exit code.
    Error,
    /// The runtime ceiling was hit; takes precedence over the exit code,
    /// including a zero code from a racing exit.
    Timeout,
}

/// What the caller gets back from every invocation, success or not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    /// Classified status.
    pub status: InvocationStatus,
    /// Child exit code; absent on spawn failure.
    pub exit_code: Option<i32>,
    /// Redacted, tail-truncated standard output.
    pub stdout: String,
    /// Redacted, tail-truncated standard error.
    pub stderr: String,
    /// The argv that ran, shell-quoted for display.
    pub command: String,
    /// Wall-clock duration, seconds.
    pub duration_seconds: f64,
    /// Whether the runtime ceiling was hit.
    pub timed_out: bool,
    /// Owning module id.
    pub module: String,
}

impl InvocationResult {
    /// Whether the invocation completed with an allowed exit code.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == InvocationStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let result = InvocationResult {
            status: InvocationStatus::Timeout,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            command: "bash run.sh".to_string(),
            duration_seconds: 1.5,
            timed_out: true,
            module: "ops".to_string(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "timeout");
        assert_eq!(value["timedOut"], true);
        assert_eq!(value["exitCode"], serde_json::Value::Null);
        assert_eq!(value["durationSeconds"], 1.5);
    }
}
