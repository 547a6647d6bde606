//! Structured logging with secret redaction and trace correlation
//!
//! Every log call runs the same pipeline on the caller's thread:
//! - secret scan of the metadata (`logshield_core::SecretScanner`)
//! - PII sanitization of the scan output (`logshield_core::PrivacySanitizer`)
//! - merge with trace context and process metadata into a [`LogEntry`]
//! - hand-off to a [`LogSink`]
//!
//! # Examples
//!
//! ```rust
//! use logshield_logger::{json, Logger, LoggerConfig, MemorySink};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let logger = Logger::builder(LoggerConfig::default()).sink(sink.clone()).build();
//!
//! logger.info("user signed in", json!({"apiKey": "sk-1234567890abcdef"}));
//!
//! let entry = sink.last().unwrap();
//! assert!(entry.security_alert);
//! ```

pub mod config;
pub mod entry;
pub mod hooks;
pub mod level;
pub mod logger;
pub mod middleware;
pub mod sink;
pub mod subscriber;
pub mod terminate;

pub use config::LoggerConfig;
pub use entry::{Callsite, ErrorReport, LogEntry, RESERVED_KEYS};
pub use hooks::{install_process_hooks, spawn_monitored};
pub use level::{Level, Severity};
pub use logger::{Logger, LoggerBuilder};
pub use middleware::{request_logging_middleware, RequestLoggingState, SPAN_ID_HEADER, TRACE_ID_HEADER};
pub use sink::{sink_for_environment, JsonLinesSink, LogSink, MemorySink, MultiSink, TracingSink};
pub use subscriber::{init_logging, LogConfig, LogFormat};
pub use terminate::{Fatal, ProcessTerminator, RecordingTerminator, Terminator, FATAL_EXIT_CODE};

pub use logshield_core::{TraceContext, TraceContextManager};
pub use serde_json::{json, Value};
