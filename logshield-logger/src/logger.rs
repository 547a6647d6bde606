//! Leveled logger orchestrating redaction, enrichment and emission
//!
//! # Example
//!
//! ```rust
//! use logshield_logger::{json, Logger, LoggerConfig, MemorySink, RecordingTerminator};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let terminator = Arc::new(RecordingTerminator::new());
//! let logger = Logger::builder(LoggerConfig::default())
//!     .sink(sink.clone())
//!     .terminator(terminator.clone())
//!     .build();
//!
//! let fatal = logger.fatal("cannot continue", json!({}), None);
//! assert_eq!(fatal.exit_code, 1);
//! assert_eq!(terminator.codes(), vec![1]);
//! ```

use chrono::Utc;
use logshield_core::{into_metadata, PrivacySanitizer, SecretScanner, TraceContext, TraceContextManager};
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;

use crate::config::LoggerConfig;
use crate::entry::{fold_reserved_keys, Callsite, ErrorReport, LogEntry};
use crate::level::Level;
use crate::sink::{LogSink, TracingSink};
use crate::terminate::{Fatal, ProcessTerminator, Terminator, FATAL_EXIT_CODE};

pub struct Logger {
    config: LoggerConfig,
    sink: Arc<dyn LogSink>,
    traces: Arc<TraceContextManager>,
    terminator: Arc<dyn Terminator>,
}

/// Builder for [`Logger`]
pub struct LoggerBuilder {
    config: LoggerConfig,
    sink: Option<Arc<dyn LogSink>>,
    traces: Option<Arc<TraceContextManager>>,
    terminator: Option<Arc<dyn Terminator>>,
}

impl LoggerBuilder {
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn traces(mut self, traces: Arc<TraceContextManager>) -> Self {
        self.traces = Some(traces);
        self
    }

    pub fn terminator(mut self, terminator: Arc<dyn Terminator>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    pub fn build(self) -> Logger {
        Logger {
            config: self.config,
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            traces: self.traces.unwrap_or_default(),
            terminator: self.terminator.unwrap_or_else(|| Arc::new(ProcessTerminator)),
        }
    }
}

impl Logger {
    pub fn builder(config: LoggerConfig) -> LoggerBuilder {
        LoggerBuilder {
            config,
            sink: None,
            traces: None,
            terminator: None,
        }
    }

    pub fn new(config: LoggerConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn traces(&self) -> &Arc<TraceContextManager> {
        &self.traces
    }

    pub fn terminator(&self) -> &Arc<dyn Terminator> {
        &self.terminator
    }

    /// Whether an entry at `level` reaches the sink.
    ///
    /// Debug requires the threshold to be exactly `debug`; fatal is never
    /// filtered.
    pub fn enabled(&self, level: Level) -> bool {
        match level {
            Level::Debug => self.config.log_level == Level::Debug,
            Level::Fatal => true,
            other => other >= self.config.log_level,
        }
    }

    #[track_caller]
    pub fn debug(&self, message: &str, meta: Value) {
        self.log_at(Level::Debug, Some(Callsite::caller()), message, meta, None);
    }

    #[track_caller]
    pub fn info(&self, message: &str, meta: Value) {
        self.log_at(Level::Info, Some(Callsite::caller()), message, meta, None);
    }

    #[track_caller]
    pub fn warn(&self, message: &str, meta: Value) {
        self.log_at(Level::Warn, Some(Callsite::caller()), message, meta, None);
    }

    #[track_caller]
    pub fn error(&self, message: &str, meta: Value, error: Option<&dyn Error>) {
        self.log_at(Level::Error, Some(Callsite::caller()), message, meta, error);
    }

    /// Log at fatal, written to the sink as an error, then request process
    /// termination with exit code 1.
    #[track_caller]
    pub fn fatal(&self, message: &str, meta: Value, error: Option<&dyn Error>) -> Fatal {
        self.fatal_at(Some(Callsite::caller()), message, meta, error)
    }

    pub fn fatal_at(
        &self,
        callsite: Option<Callsite>,
        message: &str,
        meta: Value,
        error: Option<&dyn Error>,
    ) -> Fatal {
        self.emit(Level::Fatal, callsite, message, meta, error);
        self.terminator.terminate(FATAL_EXIT_CODE);
        Fatal::new(FATAL_EXIT_CODE)
    }

    /// General entry point. Returns whether the entry reached the sink.
    /// A fatal level goes through [`fatal_at`](Self::fatal_at).
    pub fn log_at(
        &self,
        level: Level,
        callsite: Option<Callsite>,
        message: &str,
        meta: Value,
        error: Option<&dyn Error>,
    ) -> bool {
        if level == Level::Fatal {
            let _ = self.fatal_at(callsite, message, meta, error);
            return true;
        }
        if !self.enabled(level) {
            return false;
        }

        self.emit(level, callsite, message, meta, error);
        true
    }

    /// Write an entry regardless of the configured threshold.
    pub(crate) fn emit(
        &self,
        level: Level,
        callsite: Option<Callsite>,
        message: &str,
        meta: Value,
        error: Option<&dyn Error>,
    ) {
        let entry = self.build_entry(level, message, meta, error, callsite);
        self.sink.write(level.severity(), &entry);
    }

    /// Build the redacted, enriched entry for one log call.
    pub fn build_entry(
        &self,
        level: Level,
        message: &str,
        meta: Value,
        error: Option<&dyn Error>,
        callsite: Option<Callsite>,
    ) -> LogEntry {
        let trace = self.traces.get_trace_context();
        let scan = SecretScanner::scan_map(&into_metadata(meta));
        let sanitized = PrivacySanitizer::sanitize_map(&scan.redacted);
        let report = error.map(ErrorReport::from_error);
        let callsite = callsite.filter(|_| self.config.is_development());

        LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            trace_id: trace.trace_id,
            span_id: trace.span_id,
            parent_span_id: trace.parent_span_id,
            service_name: self.config.service_name.clone(),
            env: self.config.env.clone(),
            release_version: self.config.release_version.clone(),
            security_alert: scan.has_secrets,
            error_message: report.as_ref().map(|r| r.message.clone()),
            error_stack: report.map(|r| r.stack),
            file: callsite.as_ref().map(|c| c.file.clone()),
            line: callsite.as_ref().map(|c| c.line),
            function: callsite.and_then(|c| c.function),
            metadata: fold_reserved_keys(sanitized),
        }
    }

    /// Run `f` inside a new child span, restoring the parent context after.
    pub fn with_span<R>(&self, f: impl FnOnce(&TraceContext) -> R) -> R {
        let parent = self.traces.get_trace_context();
        let span = self.traces.create_span();
        let _restore = RestoreContext {
            traces: &self.traces,
            parent: Some(parent),
        };
        f(&span)
    }

    /// Install the given trace/span as current, then run `f`.
    pub fn with_trace<R>(
        &self,
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        f: impl FnOnce() -> R,
    ) -> R {
        self.traces.set_trace_context(trace_id, span_id, None);
        f()
    }
}

struct RestoreContext<'a> {
    traces: &'a TraceContextManager,
    parent: Option<TraceContext>,
}

impl Drop for RestoreContext<'_> {
    fn drop(&mut self) {
        if let Some(parent) = self.parent.take() {
            self.traces.install(parent);
        }
    }
}

// ============================================================================
// Utility Macros
// ============================================================================

/// Log with the full call site, including the enclosing module as `function`
#[macro_export]
macro_rules! log_with_callsite {
    ($logger:expr, $level:expr, $message:expr, $meta:expr, $error:expr) => {
        $logger.log_at(
            $level,
            Some($crate::Callsite::new(file!(), line!(), Some(module_path!()))),
            $message,
            $meta,
            $error,
        )
    };
}

/// Debug log with call site
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $message:expr) => {
        $crate::log_debug!($logger, $message, $crate::Value::Null)
    };
    ($logger:expr, $message:expr, $meta:expr) => {
        $crate::log_with_callsite!($logger, $crate::Level::Debug, $message, $meta, None)
    };
}

/// Info log with call site
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $message:expr) => {
        $crate::log_info!($logger, $message, $crate::Value::Null)
    };
    ($logger:expr, $message:expr, $meta:expr) => {
        $crate::log_with_callsite!($logger, $crate::Level::Info, $message, $meta, None)
    };
}

/// Warn log with call site
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $message:expr) => {
        $crate::log_warn!($logger, $message, $crate::Value::Null)
    };
    ($logger:expr, $message:expr, $meta:expr) => {
        $crate::log_with_callsite!($logger, $crate::Level::Warn, $message, $meta, None)
    };
}

/// Error log with call site
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $message:expr, $meta:expr) => {
        $crate::log_with_callsite!($logger, $crate::Level::Error, $message, $meta, None)
    };
    ($logger:expr, $message:expr, $meta:expr, $error:expr) => {
        $crate::log_with_callsite!(
            $logger,
            $crate::Level::Error,
            $message,
            $meta,
            Some($error as &dyn ::std::error::Error)
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::terminate::RecordingTerminator;
    use serde_json::json;

    fn logger_with(config: LoggerConfig) -> (Logger, Arc<MemorySink>, Arc<RecordingTerminator>) {
        let sink = Arc::new(MemorySink::new());
        let terminator = Arc::new(RecordingTerminator::new());
        let logger = Logger::builder(config)
            .sink(sink.clone())
            .terminator(terminator.clone())
            .build();
        (logger, sink, terminator)
    }

    #[test]
    fn test_threshold() {
        let (logger, _, _) = logger_with(LoggerConfig::default().with_log_level(Level::Warn));
        assert!(!logger.enabled(Level::Debug));
        assert!(!logger.enabled(Level::Info));
        assert!(logger.enabled(Level::Warn));
        assert!(logger.enabled(Level::Error));
        assert!(logger.enabled(Level::Fatal));
    }

    #[test]
    fn test_info_below_threshold_is_dropped() {
        let (logger, sink, _) = logger_with(LoggerConfig::default().with_log_level(Level::Error));
        logger.info("quiet", Value::Null);
        logger.warn("quiet", Value::Null);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_callsite_only_in_development() {
        let (dev, dev_sink, _) = logger_with(LoggerConfig::default());
        dev.info("here", Value::Null);
        let entry = dev_sink.last().unwrap();
        assert!(entry.file.as_deref().unwrap().ends_with("logger.rs"));
        assert!(entry.line.is_some());
        assert!(entry.function.is_none());

        let (prod, prod_sink, _) = logger_with(LoggerConfig::default().with_env("production"));
        prod.info("here", Value::Null);
        let entry = prod_sink.last().unwrap();
        assert!(entry.file.is_none());
        assert!(entry.line.is_none());
    }

    #[test]
    fn test_macro_records_function() {
        let (logger, sink, _) = logger_with(LoggerConfig::default());
        log_info!(logger, "from macro", json!({"k": 1}));

        let entry = sink.last().unwrap();
        assert_eq!(entry.function.as_deref(), Some(module_path!()));
        assert_eq!(entry.field("k"), Some(&json!(1)));
    }

    #[test]
    fn test_log_at_fatal_terminates() {
        let (logger, sink, terminator) = logger_with(LoggerConfig::default());
        assert!(logger.log_at(Level::Fatal, None, "boom", Value::Null, None));
        assert_eq!(sink.last().unwrap().level, Level::Fatal);
        assert_eq!(terminator.codes(), vec![FATAL_EXIT_CODE]);
    }

    #[test]
    fn test_emit_ignores_threshold() {
        let (logger, sink, terminator) =
            logger_with(LoggerConfig::default().with_log_level(Level::Fatal));
        assert!(!logger.log_at(Level::Error, None, "filtered", Value::Null, None));
        assert!(sink.is_empty());

        logger.emit(Level::Error, None, "always", Value::Null, None);
        let entry = sink.last().unwrap();
        assert_eq!(entry.level, Level::Error);
        assert_eq!(entry.message, "always");
        assert!(terminator.codes().is_empty());
    }

    #[test]
    fn test_with_span_restores_parent() {
        let (logger, sink, _) = logger_with(LoggerConfig::default());
        let parent = logger.traces().get_trace_context();

        let child_span = logger.with_span(|span| {
            logger.info("inside", Value::Null);
            span.span_id.clone()
        });

        let inside = sink.last().unwrap();
        assert_eq!(inside.span_id, child_span);
        assert_eq!(inside.parent_span_id.as_deref(), Some(parent.span_id.as_str()));
        assert_eq!(inside.trace_id, parent.trace_id);
        assert_eq!(logger.traces().get_trace_context(), parent);
    }

    #[test]
    fn test_with_trace_installs_context() {
        let (logger, sink, _) = logger_with(LoggerConfig::default());
        logger.with_trace("trace-1", "span-1", || logger.info("traced", Value::Null));

        let entry = sink.last().unwrap();
        assert_eq!(entry.trace_id, "trace-1");
        assert_eq!(entry.span_id, "span-1");
    }
}
