//! Module liveness probing.
//!
//! Health commands are operator tooling: they carry their own timeout and
//! environment, and bypass capability guardrails entirely (no redaction, no
//! admission). They never go through the invocation path.

use capstan_manifest::HealthCommand;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

use crate::truncate::truncate_tail;

/// Stderr kept per probe, enough for a diagnostic tail.
const PROBE_STDERR_BYTES: usize = 2048;

/// Outcome of one health probe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    /// The probe's declared label.
    pub label: String,
    /// Whether the command exited zero within its timeout.
    pub passed: bool,
    /// Exit code, absent on spawn failure or timeout.
    pub exit_code: Option<i32>,
    /// Whether the probe hit its timeout.
    pub timed_out: bool,
    /// Wall-clock duration, seconds.
    pub duration_seconds: f64,
    /// Tail of captured stderr for diagnostics.
    pub stderr: String,
}

/// Run one declared health command in the module's repo root.
pub async fn run_health_command(probe: &HealthCommand, repo_root: &Path) -> ProbeOutcome {
    let started = Instant::now();
    let failed = |stderr: String, timed_out: bool| ProbeOutcome {
        label: probe.label.clone(),
        passed: false,
        exit_code: None,
        timed_out,
        duration_seconds: started.elapsed().as_secs_f64(),
        stderr,
    };

    let Some((program, args)) = probe.command.split_first() else {
        return failed("health command is empty".to_string(), false);
    };

    debug!(label = %probe.label, command = ?probe.command, "running health probe");
    let output = tokio::time::timeout(
        Duration::from_secs(probe.timeout_seconds),
        Command::new(program)
            .args(args)
            .envs(&probe.env)
            .current_dir(repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await;

    match output {
        Ok(Ok(output)) => {
            let exit_code = output.status.code();
            ProbeOutcome {
                label: probe.label.clone(),
                passed: output.status.success(),
                exit_code,
                timed_out: false,
                duration_seconds: started.elapsed().as_secs_f64(),
                stderr: truncate_tail(
                    &String::from_utf8_lossy(&output.stderr),
                    PROBE_STDERR_BYTES,
                ),
            }
        },
        Ok(Err(err)) => failed(format!("failed to spawn health command: {err}"), false),
        Err(_) => failed(String::new(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn probe(command: &[&str], timeout_seconds: u64) -> HealthCommand {
        HealthCommand {
            label: "probe".to_string(),
            command: command.iter().map(ToString::to_string).collect(),
            env: BTreeMap::new(),
            timeout_seconds,
        }
    }

    #[tokio::test]
    async fn test_passing_probe() {
        let outcome = run_health_command(&probe(&["true"], 30), Path::new("/tmp")).await;
        assert!(outcome.passed);
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_failing_probe() {
        let outcome = run_health_command(&probe(&["false"], 30), Path::new("/tmp")).await;
        assert!(!outcome.passed);
        assert_eq!(outcome.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_timeout_probe() {
        let outcome = run_health_command(&probe(&["sleep", "5"], 1), Path::new("/tmp")).await;
        assert!(!outcome.passed);
        assert!(outcome.timed_out);
        assert!(outcome.duration_seconds < 3.0);
    }

    #[tokio::test]
    async fn test_spawn_failure_probe() {
        let outcome =
            run_health_command(&probe(&["/definitely/not/here"], 30), Path::new("/tmp")).await;
        assert!(!outcome.passed);
        assert!(outcome.stderr.contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_empty_command() {
        let outcome = run_health_command(&probe(&[], 30), Path::new("/tmp")).await;
        assert!(!outcome.passed);
        assert!(outcome.stderr.contains("empty"));
    }
}
