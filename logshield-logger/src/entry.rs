use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::Write as _;
use std::panic::Location;

use crate::level::Level;

/// Core keys that caller metadata may not override
pub const RESERVED_KEYS: &[&str] = &[
    "timestamp",
    "level",
    "message",
    "traceId",
    "spanId",
    "parentSpanId",
    "serviceName",
    "env",
    "releaseVersion",
    "securityAlert",
    "errorMessage",
    "errorStack",
    "file",
    "line",
    "function",
];

/// Prefix under which colliding metadata keys are kept
pub const RESERVED_KEY_PREFIX: &str = "meta.";

/// One finished, already-redacted log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub service_name: String,
    pub env: String,
    pub release_version: String,
    pub security_alert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl LogEntry {
    /// Render as a JSON object.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Lookup a metadata field by key.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// Move metadata keys that collide with core fields under [`RESERVED_KEY_PREFIX`].
///
/// Caller keys that are not reserved keep their names. A folded key that is
/// already taken gets the first free numeric suffix (`meta.level.1`, ...), so
/// no value is dropped.
pub fn fold_reserved_keys(metadata: Map<String, Value>) -> Map<String, Value> {
    let (reserved, kept): (Vec<_>, Vec<_>) = metadata
        .into_iter()
        .partition(|(key, _)| RESERVED_KEYS.contains(&key.as_str()));

    let mut folded: Map<String, Value> = kept.into_iter().collect();
    for (key, value) in reserved {
        let base = format!("{}{}", RESERVED_KEY_PREFIX, key);
        let mut target = base.clone();
        let mut suffix = 1;
        while folded.contains_key(&target) {
            target = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        folded.insert(target, value);
    }

    folded
}

/// Call site of a log statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callsite {
    pub file: String,
    pub line: u32,
    pub function: Option<String>,
}

impl Callsite {
    pub fn new(file: impl Into<String>, line: u32, function: Option<&str>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.map(str::to_string),
        }
    }

    /// Location of the nearest caller not marked `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line(), None)
    }
}

/// Structured capture of a caller-supplied error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: String,
    pub stack: String,
}

impl ErrorReport {
    /// Capture the error, its `source()` chain, and a backtrace of the log
    /// site when `RUST_BACKTRACE` enables capture.
    pub fn from_error(error: &dyn Error) -> Self {
        let message = error.to_string();
        let mut stack = message.clone();

        let mut source = error.source();
        if source.is_some() {
            stack.push_str("\n\nCaused by:");
        }
        let mut index = 0;
        while let Some(cause) = source {
            let _ = write!(stack, "\n    {}: {}", index, cause);
            index += 1;
            source = cause.source();
        }

        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            let _ = write!(stack, "\n\nStack backtrace:\n{}", backtrace);
        }

        Self { message, stack }
    }
}
