//! The append-only telemetry sink.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::error::{TelemetryError, TelemetryResult};
use crate::event::TelemetryEvent;

/// Serializes events as JSON lines appended to a shared log file.
///
/// One lock gates all writers across every capability: the log is a single
/// ordered append target, and the lock is held only for the duration of one
/// line write, never for an invocation's lifetime. Emission is best-effort;
/// failures are logged and swallowed.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySink {
    inner: Option<Arc<Mutex<File>>>,
    path: Option<PathBuf>,
}

impl TelemetrySink {
    /// Open (or create) an append-mode sink at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Open`] when the file cannot be opened.
    pub fn to_path(path: &Path) -> TelemetryResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| TelemetryError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            inner: Some(Arc::new(Mutex::new(file))),
            path: Some(path.to_path_buf()),
        })
    }

    /// A sink with no destination; every emit is a silent no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether a destination is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Append one event as a single JSON line.
    ///
    /// Never fails: serialization or write errors are logged at `warn` and
    /// dropped so an invocation is never failed or delayed by its telemetry.
    pub fn emit(&self, event: &TelemetryEvent) {
        let Some(file) = &self.inner else {
            return;
        };

        let mut line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to serialize telemetry event");
                return;
            },
        };
        line.push('\n');

        // A poisoned lock means another writer panicked mid-write; the file
        // is still usable for appends.
        let mut guard = match file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = guard.write_all(line.as_bytes()).and_then(|()| guard.flush()) {
            warn!(
                path = ?self.path,
                error = %err,
                "failed to append telemetry event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_manifest::Guardrails;
    use uuid::Uuid;

    fn event(capability: &str) -> TelemetryEvent {
        TelemetryEvent::start(
            Uuid::new_v4(),
            capability,
            "ops",
            Path::new("/srv/run.sh"),
            &Guardrails::default(),
            vec![],
        )
    }

    #[test]
    fn test_disabled_sink_is_noop() {
        let sink = TelemetrySink::disabled();
        assert!(!sink.is_enabled());
        sink.emit(&event("ops.ping"));
    }

    #[test]
    fn test_appends_one_line_per_event() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        let sink = TelemetrySink::to_path(&path).unwrap();

        sink.emit(&event("ops.ping"));
        sink.emit(&event("ops.pong"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        let sink = TelemetrySink::to_path(&path).unwrap();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let sink = sink.clone();
                scope.spawn(move || {
                    for i in 0..25 {
                        sink.emit(&event(&format!("cap.{worker}.{i}")));
                    }
                });
            }
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            // Every line parses: no torn or interleaved writes.
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }
}
