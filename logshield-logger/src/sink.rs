//! Log sinks
//!
//! A sink receives a finished, already-redacted [`LogEntry`] tagged with a
//! [`Severity`] and performs the write. Writes are fire-and-forget: a sink
//! swallows its own failures and never reports back into the logger.

use logshield_core::{CoreError, Result};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::entry::LogEntry;
use crate::level::Severity;

/// Target used by [`TracingSink`] events
pub const TRACING_TARGET: &str = "logshield";

pub trait LogSink: Send + Sync {
    fn write(&self, severity: Severity, entry: &LogEntry);
}

// ============================================================================
// Tracing
// ============================================================================

/// Forwards entries to the installed `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, severity: Severity, entry: &LogEntry) {
        let payload = serde_json::to_string(entry).unwrap_or_default();

        macro_rules! emit {
            ($level:expr) => {
                tracing::event!(
                    target: TRACING_TARGET,
                    $level,
                    trace_id = %entry.trace_id,
                    span_id = %entry.span_id,
                    security_alert = entry.security_alert,
                    entry = %payload,
                    "{}",
                    entry.message
                )
            };
        }

        match severity {
            Severity::Debug => emit!(tracing::Level::DEBUG),
            Severity::Info => emit!(tracing::Level::INFO),
            Severity::Warn => emit!(tracing::Level::WARN),
            Severity::Error => emit!(tracing::Level::ERROR),
        }
    }
}

// ============================================================================
// JSON Lines
// ============================================================================

/// Writes one JSON document per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl JsonLinesSink<RollingFileAppender> {
    /// Daily-rotated files named `<prefix>.<date>.log` under `directory`.
    pub fn daily_file(directory: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(prefix)
            .filename_suffix("log")
            .build(directory.as_ref())
            .map_err(|e| CoreError::Io(e.to_string()))?;

        Ok(Self::new(appender))
    }
}

impl<W: Write + Send> LogSink for JsonLinesSink<W> {
    fn write(&self, _severity: Severity, entry: &LogEntry) {
        let Ok(line) = serde_json::to_string(entry) else {
            return;
        };

        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writeln!(writer, "{}", line);
        let _ = writer.flush();
    }
}

// ============================================================================
// Fan-out
// ============================================================================

/// Writes every entry to each inner sink in order
#[derive(Default, Clone)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogSink for MultiSink {
    fn write(&self, severity: Severity, entry: &LogEntry) {
        for sink in &self.sinks {
            sink.write(severity, entry);
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Keeps every entry in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(Severity, LogEntry)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Severity, LogEntry)>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn records(&self) -> Vec<(Severity, LogEntry)> {
        self.lock().clone()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().map(|(_, entry)| entry.clone()).collect()
    }

    pub fn last(&self) -> Option<LogEntry> {
        self.lock().last().map(|(_, entry)| entry.clone())
    }

    pub fn last_severity(&self) -> Option<Severity> {
        self.lock().last().map(|(severity, _)| *severity)
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|(_, entry)| entry.message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, severity: Severity, entry: &LogEntry) {
        self.lock().push((severity, entry.clone()));
    }
}

// ============================================================================
// Environment Defaults
// ============================================================================

/// File prefix used for production log files
pub const LOG_FILE_PREFIX: &str = "application";

/// Default sink wiring per environment:
/// - `development`: [`TracingSink`]
/// - `production`: JSON lines on stdout plus a daily rotated file in `log_dir`
/// - anything else: JSON lines on stdout
pub fn sink_for_environment(env: &str, log_dir: impl AsRef<Path>) -> Result<Arc<dyn LogSink>> {
    let sink: Arc<dyn LogSink> = match env {
        "development" => Arc::new(TracingSink),
        "production" => Arc::new(
            MultiSink::default()
                .with(Arc::new(JsonLinesSink::daily_file(log_dir, LOG_FILE_PREFIX)?))
                .with(Arc::new(JsonLinesSink::stdout())),
        ),
        _ => Arc::new(JsonLinesSink::stdout()),
    };

    Ok(sink)
}
