//! Runtime secret detection and redaction
//!
//! Scans strings and metadata trees for credential-like values:
//! - OpenAI-style `sk-`/`pk-` keys and generic API key assignments
//! - AWS access keys and AWS/GCP/Azure credential assignments
//! - Database connection URLs with embedded credentials
//! - JWT secrets and JWT-shaped tokens
//! - Generic `token`/`key`/`secret`/`password` assignments
//!
//! Every detection increments the `secret_leak_total` counter through the
//! `metrics` facade. Without an installed recorder the increment is a no-op.
//!
//! # Examples
//!
//! ```rust
//! use logshield_core::secrets::{SecretScanner, REDACTED};
//! use serde_json::json;
//!
//! let scan = SecretScanner::scan_object(&json!({"apiKey": "sk-1234567890abcdef"}));
//! assert!(scan.has_secrets);
//! assert_eq!(scan.redacted["apiKey"], REDACTED);
//! ```

use metrics::{counter, describe_counter, Unit};
use regex::{NoExpand, Regex};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::metadata::child_path;

// ============================================================================
// Constants
// ============================================================================

/// Replacement token for detected secrets
pub const REDACTED: &str = "«REDACTED»";

/// Counter incremented once per detection
pub const SECRET_LEAK_COUNTER: &str = "secret_leak_total";

/// Secret signatures in application order
const SECRET_PATTERN_SOURCES: &[(SecretKind, &str)] = &[
    // API keys
    (SecretKind::ApiKey, r"(?i-u)(sk|pk)-[a-z0-9-]{10,}"),
    (
        SecretKind::ApiKey,
        r#"(?i)(api_key|api_secret|access_token|secret_key)\s*[:=]\s*['"][^'"]+['"]"#,
    ),
    // Cloud providers
    (
        SecretKind::CloudCredential,
        r#"(?i)(AWS_ACCESS_KEY_ID|AWS_SECRET_ACCESS_KEY|GOOGLE_APPLICATION_CREDENTIALS)\s*[:=]\s*['"][^'"]+['"]"#,
    ),
    (SecretKind::AwsAccessKey, r"AKIA[0-9A-Z]{16}"),
    (
        SecretKind::CloudCredential,
        r#"(?i)(AZURE_CLIENT_ID|AZURE_CLIENT_SECRET|AZURE_TENANT_ID)\s*[:=]\s*['"][^'"]+['"]"#,
    ),
    // Database
    (
        SecretKind::DatabaseUrl,
        r#"(?i)(DATABASE_URL|MONGODB_URI|REDIS_URL)\s*[:=]\s*['"][^'"]+['"]"#,
    ),
    (
        SecretKind::DatabaseUrl,
        r"postgres(?:ql)?://[A-Za-z0-9_]+:[^@]+@[^:]+:[0-9]+/[A-Za-z0-9_]+",
    ),
    (SecretKind::DatabaseUrl, r"mongodb://[A-Za-z0-9_]+:[^@]+@[^:]+:[0-9]+/[A-Za-z0-9_]+"),
    // JWT
    (
        SecretKind::Jwt,
        r#"(?i)(JWT_SECRET|JWT_PRIVATE_KEY)\s*[:=]\s*['"][^'"]+['"]"#,
    ),
    (
        SecretKind::Jwt,
        r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+",
    ),
    // Email/password
    (
        SecretKind::CredentialAssignment,
        r#"(?i)(email|password)\s*[:=]\s*['"][^'"]+['"]"#,
    ),
    (
        SecretKind::CredentialAssignment,
        r#"(?i)password\s*[:=]\s*['"][^'"]+['"]"#,
    ),
    // Common patterns
    (
        SecretKind::GenericAssignment,
        r#"(?i)(token|key|secret|password)\s*[:=]\s*['"][^'"]{10,}['"]"#,
    ),
];

// ============================================================================
// Secret Classification
// ============================================================================

/// Category of a detected secret, used as the `secret_type` metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    ApiKey,
    CloudCredential,
    AwsAccessKey,
    DatabaseUrl,
    Jwt,
    CredentialAssignment,
    GenericAssignment,
}

impl SecretKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::CloudCredential => "cloud_credential",
            Self::AwsAccessKey => "aws_access_key",
            Self::DatabaseUrl => "database_url",
            Self::Jwt => "jwt",
            Self::CredentialAssignment => "credential_assignment",
            Self::GenericAssignment => "generic_assignment",
        }
    }

    pub fn severity(&self) -> SecretSeverity {
        match self {
            Self::CloudCredential | Self::AwsAccessKey | Self::DatabaseUrl => {
                SecretSeverity::Critical
            }
            Self::ApiKey | Self::Jwt => SecretSeverity::High,
            Self::CredentialAssignment | Self::GenericAssignment => SecretSeverity::Medium,
        }
    }
}

impl std::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity label attached to leak metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretSeverity {
    Medium,
    High,
    Critical,
}

impl SecretSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

struct SecretPattern {
    kind: SecretKind,
    regex: Regex,
}

fn secret_patterns() -> &'static [SecretPattern] {
    static PATTERNS: OnceLock<Vec<SecretPattern>> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        SECRET_PATTERN_SOURCES
            .iter()
            .filter_map(|(kind, source)| {
                Regex::new(source)
                    .ok()
                    .map(|regex| SecretPattern { kind: *kind, regex })
            })
            .collect()
    })
}

/// Registers the leak counter description with the installed recorder.
pub fn describe_secret_metrics() {
    describe_counter!(
        SECRET_LEAK_COUNTER,
        Unit::Count,
        "Total number of secret leaks detected"
    );
}

fn record_leak(kind: SecretKind) {
    counter!(
        SECRET_LEAK_COUNTER,
        "secret_type" => kind.as_str(),
        "severity" => kind.severity().as_str()
    )
    .increment(1);
}

// ============================================================================
// Scan Results
// ============================================================================

/// Result of scanning a single string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringScan {
    pub has_secrets: bool,
    pub redacted_text: String,
    /// Kinds of every pattern that matched, in pattern order
    pub kinds: Vec<SecretKind>,
}

/// A secret detected at a position in a metadata tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretFinding {
    pub path: String,
    pub kind: SecretKind,
    pub severity: SecretSeverity,
}

/// Result of scanning a metadata tree
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectScan<T = Value> {
    pub has_secrets: bool,
    pub redacted: T,
    pub findings: Vec<SecretFinding>,
}

// ============================================================================
// Scanner
// ============================================================================

/// Stateless secret scanner over a fixed pattern set
pub struct SecretScanner;

impl SecretScanner {
    /// Redact every secret occurrence inside `text`.
    ///
    /// Each pattern runs as an independent global replace against the output
    /// of the previous one, so overlapping matches are all applied.
    pub fn scan_string(text: &str) -> StringScan {
        let mut redacted_text = text.to_string();
        let mut kinds = Vec::new();

        for pattern in secret_patterns() {
            if pattern.regex.is_match(&redacted_text) {
                redacted_text = pattern
                    .regex
                    .replace_all(&redacted_text, NoExpand(REDACTED))
                    .into_owned();
                record_leak(pattern.kind);
                kinds.push(pattern.kind);
            }
        }

        StringScan {
            has_secrets: !kinds.is_empty(),
            redacted_text,
            kinds,
        }
    }

    /// Returns the kind of the first pattern matching `text`.
    pub fn detect(text: &str) -> Option<SecretKind> {
        secret_patterns()
            .iter()
            .find(|pattern| pattern.regex.is_match(text))
            .map(|pattern| pattern.kind)
    }

    /// Scan a metadata tree, replacing every matching string value whole.
    pub fn scan_object(value: &Value) -> ObjectScan {
        Self::scan_object_at(value, "")
    }

    /// Same as [`scan_object`](Self::scan_object) with findings rooted at `path`.
    pub fn scan_object_at(value: &Value, path: &str) -> ObjectScan {
        let mut findings = Vec::new();
        let redacted = walk(value, path, &mut findings);

        ObjectScan {
            has_secrets: !findings.is_empty(),
            redacted,
            findings,
        }
    }

    /// Scan top-level log metadata.
    pub fn scan_map(map: &Map<String, Value>) -> ObjectScan<Map<String, Value>> {
        let mut findings = Vec::new();
        let redacted = walk_map(map, "", &mut findings);

        ObjectScan {
            has_secrets: !findings.is_empty(),
            redacted,
            findings,
        }
    }
}

fn walk(value: &Value, path: &str, findings: &mut Vec<SecretFinding>) -> Value {
    match value {
        Value::String(text) => match SecretScanner::detect(text) {
            Some(kind) => {
                record_leak(kind);
                findings.push(SecretFinding {
                    path: path.to_string(),
                    kind,
                    severity: kind.severity(),
                });
                Value::String(REDACTED.to_string())
            }
            None => value.clone(),
        },
        Value::Object(map) => Value::Object(walk_map(map, path, findings)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| walk(item, &child_path(path, &index.to_string()), findings))
                .collect(),
        ),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}

fn walk_map(
    map: &Map<String, Value>,
    path: &str,
    findings: &mut Vec<SecretFinding>,
) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), walk(value, &child_path(path, key), findings)))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
