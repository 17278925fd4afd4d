//! The execution engine: admission, spawn, timeout, finalization.

use capstan_registry::{CapabilityEntry, LoadedModule, Registry};
use capstan_telemetry::{InvocationOutcome, TelemetryEvent, TelemetrySink};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::command::{build_argv, build_env, display_command};
use crate::redact::Redactor;
use crate::result::{InvocationResult, InvocationStatus};
use crate::truncate::truncate_tail;

/// Executes validated invocations as constrained subprocesses.
///
/// Stateless per call aside from the per-capability admission semaphores,
/// which are the only shared mutable state: load on one capability never
/// throttles another. Redaction patterns are compiled once at construction.
pub struct ExecutionEngine {
    telemetry: TelemetrySink,
    semaphores: HashMap<String, Arc<Semaphore>>,
    redactors: HashMap<String, Redactor>,
}

impl ExecutionEngine {
    /// Build the engine over a loaded registry.
    #[must_use]
    pub fn new(registry: &Registry, telemetry: TelemetrySink) -> Self {
        let mut semaphores = HashMap::new();
        let mut redactors = HashMap::new();
        for module in registry.modules() {
            for entry in &module.entries {
                let capability = &entry.capability;
                semaphores.insert(
                    capability.id.clone(),
                    Arc::new(Semaphore::new(capability.guardrails.max_concurrency)),
                );
                redactors.insert(
                    capability.id.clone(),
                    Redactor::from_guardrails(&capability.id, &capability.guardrails),
                );
            }
        }
        Self {
            telemetry,
            semaphores,
            redactors,
        }
    }

    /// Execute one invocation end to end and classify the outcome.
    ///
    /// Blocks on the capability's admission semaphore when `maxConcurrency`
    /// invocations are already in flight (cooperative backpressure, not
    /// rejection). The permit is released unconditionally on return,
    /// including on spawn failure. Never returns an error: every failure
    /// mode is captured in the result payload.
    pub async fn invoke(
        &self,
        module: &LoadedModule,
        entry: &CapabilityEntry,
        inputs: &Map<String, Value>,
    ) -> InvocationResult {
        let capability = &entry.capability;
        let guardrails = &capability.guardrails;

        // PENDING -> ADMITTED. The permit is dropped when this call returns,
        // on every path. A capability the engine was not built over has no
        // admission semaphore; refusing it beats running unguarded.
        let Some(semaphore) = self.semaphores.get(&capability.id) else {
            warn!(capability = %capability.id, "capability not registered with this engine");
            return not_admitted(module, entry, "capability is not registered with this engine");
        };
        let Ok(_permit) = semaphore.clone().acquire_owned().await else {
            warn!(capability = %capability.id, "admission semaphore closed");
            return not_admitted(module, entry, "admission semaphore closed");
        };

        let invocation = Uuid::new_v4();
        let mut input_keys: Vec<String> = inputs.keys().cloned().collect();
        input_keys.sort();
        let start_event = TelemetryEvent::start(
            invocation,
            &capability.id,
            &module.descriptor.id,
            &entry.entrypoint,
            guardrails,
            input_keys,
        );
        self.telemetry.emit(&start_event);

        // ADMITTED -> RUNNING.
        let argv = build_argv(&entry.entrypoint);
        let env = build_env(
            guardrails,
            &module.repo_root,
            &capability.id,
            &module.descriptor.id,
            &module.manifest_path,
            inputs,
        );
        let command_display = display_command(&argv);
        debug!(
            capability = %capability.id,
            invocation = %invocation,
            command = %command_display,
            "spawning capability"
        );

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .env_clear()
            .envs(&env)
            .current_dir(&module.repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let result = match command.spawn() {
            Ok(child) => {
                let supervised = supervise(
                    child,
                    Duration::from_secs(guardrails.max_runtime_seconds),
                )
                .await;
                self.finalize(module, entry, command_display, started, supervised)
            },
            Err(err) => {
                // Load-time validation passed but the spawn failed anyway,
                // e.g. permissions changed since. Surfaces as a structured
                // error, never a fault.
                warn!(capability = %capability.id, error = %err, "spawn failed");
                InvocationResult {
                    status: InvocationStatus::Error,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: format!("failed to spawn entrypoint: {err}"),
                    command: command_display,
                    duration_seconds: started.elapsed().as_secs_f64(),
                    timed_out: false,
                    module: module.descriptor.id.clone(),
                }
            },
        };

        let finish = TelemetryEvent::finish(
            &start_event,
            InvocationOutcome {
                status: status_label(result.status).to_string(),
                exit_code: result.exit_code,
                duration: result.duration_seconds,
                timed_out: result.timed_out,
            },
        );
        self.telemetry.emit(&finish);
        result
    }

    /// FINALIZED: redact, truncate to the tail, classify.
    fn finalize(
        &self,
        module: &LoadedModule,
        entry: &CapabilityEntry,
        command_display: String,
        started: Instant,
        supervised: Supervised,
    ) -> InvocationResult {
        let capability = &entry.capability;
        let guardrails = &capability.guardrails;

        let default_redactor = Redactor::default();
        let redactor = self
            .redactors
            .get(&capability.id)
            .unwrap_or(&default_redactor);

        let stdout = truncate_tail(
            &redactor.apply(&String::from_utf8_lossy(&supervised.stdout)),
            guardrails.stdout_max_bytes,
        );
        let stderr = truncate_tail(
            &redactor.apply(&String::from_utf8_lossy(&supervised.stderr)),
            guardrails.stderr_max_bytes,
        );

        let exit_ok = supervised
            .exit_code
            .is_some_and(|code| guardrails.allowed_exit_codes.contains(&code));
        let status = if supervised.timed_out {
            InvocationStatus::Timeout
        } else if exit_ok {
            InvocationStatus::Ok
        } else {
            InvocationStatus::Error
        };

        InvocationResult {
            status,
            exit_code: supervised.exit_code,
            stdout,
            stderr,
            command: command_display,
            duration_seconds: started.elapsed().as_secs_f64(),
            timed_out: supervised.timed_out,
            module: module.descriptor.id.clone(),
        }
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("capabilities", &self.semaphores.len())
            .finish_non_exhaustive()
    }
}

/// Error result for an invocation refused before anything ran.
fn not_admitted(module: &LoadedModule, entry: &CapabilityEntry, detail: &str) -> InvocationResult {
    InvocationResult {
        status: InvocationStatus::Error,
        exit_code: None,
        stdout: String::new(),
        stderr: detail.to_string(),
        command: display_command(&build_argv(&entry.entrypoint)),
        duration_seconds: 0.0,
        timed_out: false,
        module: module.descriptor.id.clone(),
    }
}

struct Supervised {
    exit_code: Option<i32>,
    timed_out: bool,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// How long the stream drains may outlive the child before being abandoned.
const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

type StreamBuffer = Arc<Mutex<Vec<u8>>>;

fn take_buffer(buffer: &StreamBuffer) -> Vec<u8> {
    let mut guard = match buffer.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    std::mem::take(&mut *guard)
}

/// Stream a pipe into a shared buffer chunk by chunk, so everything read so
/// far survives even when the drain itself is abandoned mid-stream.
async fn drain_into<R>(reader: Option<R>, buffer: StreamBuffer)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(mut reader) = reader else { return };
    let mut chunk = [0_u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            // Read errors leave whatever was buffered so far; a killed
            // child's partial output is still worth returning.
            Ok(0) | Err(_) => return,
            Ok(n) => {
                let mut guard = match buffer.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.extend_from_slice(&chunk[..n]);
            },
        }
    }
}

/// RUNNING -> COMPLETED | TIMED_OUT. The kill on timeout is forceful so the
/// semaphore slot is freed within the runtime bound plus teardown, even for
/// a child that ignores polite signals.
async fn supervise(mut child: Child, ceiling: Duration) -> Supervised {
    let stdout_buf = StreamBuffer::default();
    let stderr_buf = StreamBuffer::default();
    let stdout_task = tokio::spawn(drain_into(child.stdout.take(), Arc::clone(&stdout_buf)));
    let stderr_task = tokio::spawn(drain_into(child.stderr.take(), Arc::clone(&stderr_buf)));

    let (exit_code, timed_out) = match tokio::time::timeout(ceiling, child.wait()).await {
        Ok(Ok(status)) => (status.code(), false),
        Ok(Err(err)) => {
            warn!(error = %err, "wait on child failed");
            (None, false)
        },
        Err(_) => {
            if let Err(err) = child.start_kill() {
                warn!(error = %err, "failed to kill timed-out child");
            }
            let _ = child.wait().await;
            (None, true)
        },
    };

    // A backgrounded grandchild can inherit a pipe's write end and keep it
    // open long after the child is gone, so the drains never see EOF. They
    // get a short grace past the child's exit, then are abandoned with
    // whatever they buffered.
    let stdout_abort = stdout_task.abort_handle();
    let stderr_abort = stderr_task.abort_handle();
    let drains = async {
        let _ = stdout_task.await;
        let _ = stderr_task.await;
    };
    if tokio::time::timeout(TEARDOWN_GRACE, drains).await.is_err() {
        warn!("output pipe held open past teardown grace, abandoning drain");
        stdout_abort.abort();
        stderr_abort.abort();
    }

    Supervised {
        exit_code,
        timed_out,
        stdout: take_buffer(&stdout_buf),
        stderr: take_buffer(&stderr_buf),
    }
}

fn status_label(status: InvocationStatus) -> &'static str {
    match status {
        InvocationStatus::Ok => "ok",
        InvocationStatus::Error => "error",
        InvocationStatus::Timeout => "timeout",
    }
}
