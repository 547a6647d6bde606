//! PII sanitization for log metadata and persisted payloads.
//!
//! Every string leaf gets four replacements in a fixed order: email, then
//! national ID (CPF), then payment card, then phone. Each one applies whether
//! or not an earlier replacement matched.

use regex::{NoExpand, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub const EMAIL_REDACTED: &str = "«EMAIL_REDACTED»";
pub const CPF_REDACTED: &str = "«CPF_REDACTED»";
pub const CARD_REDACTED: &str = "«CARD_REDACTED»";
pub const PHONE_REDACTED: &str = "«PHONE_REDACTED»";

/// Kind of personally identifiable information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PiiKind {
    Email,
    NationalId,
    Card,
    Phone,
}

impl PiiKind {
    /// Replacement token written in place of a match
    pub fn token(&self) -> &'static str {
        match self {
            Self::Email => EMAIL_REDACTED,
            Self::NationalId => CPF_REDACTED,
            Self::Card => CARD_REDACTED,
            Self::Phone => PHONE_REDACTED,
        }
    }
}

/// Character classes are ASCII-only so digits and word characters from other
/// scripts neither match nor suppress a boundary.
const PII_PATTERN_SOURCES: &[(PiiKind, &str)] = &[
    (
        PiiKind::Email,
        r"(?-u:\b)[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}(?-u:\b)",
    ),
    (
        PiiKind::NationalId,
        r"(?-u:\b)[0-9]{3}\.?[0-9]{3}\.?[0-9]{3}-?[0-9]{2}(?-u:\b)",
    ),
    (
        PiiKind::Card,
        r"(?-u:\b)[0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{4}(?-u:\b)",
    ),
    (
        PiiKind::Phone,
        r"\([0-9]{2}\)\s?[0-9]{4,5}-?[0-9]{4}(?-u:\b)",
    ),
];

struct PiiPattern {
    kind: PiiKind,
    regex: Regex,
}

fn pii_patterns() -> &'static [PiiPattern] {
    static PATTERNS: OnceLock<Vec<PiiPattern>> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        PII_PATTERN_SOURCES
            .iter()
            .filter_map(|(kind, source)| {
                Regex::new(source)
                    .ok()
                    .map(|regex| PiiPattern { kind: *kind, regex })
            })
            .collect()
    })
}

/// Pure deep-copy PII redaction
pub struct PrivacySanitizer;

impl PrivacySanitizer {
    /// Sanitize a whole value tree. Array order and object keys are preserved.
    pub fn sanitize(value: &Value) -> Value {
        match value {
            Value::String(text) => Value::String(Self::sanitize_str(text)),
            Value::Object(map) => Value::Object(Self::sanitize_map(map)),
            Value::Array(items) => Value::Array(items.iter().map(Self::sanitize).collect()),
            Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        }
    }

    pub fn sanitize_map(map: &Map<String, Value>) -> Map<String, Value> {
        map.iter()
            .map(|(key, value)| (key.clone(), Self::sanitize(value)))
            .collect()
    }

    pub fn sanitize_str(text: &str) -> String {
        pii_patterns().iter().fold(text.to_string(), |acc, pattern| {
            pattern
                .regex
                .replace_all(&acc, NoExpand(pattern.kind.token()))
                .into_owned()
        })
    }

    /// Kinds of PII present in `text`, in replacement order.
    pub fn detect(text: &str) -> Vec<PiiKind> {
        pii_patterns()
            .iter()
            .filter(|pattern| pattern.regex.is_match(text))
            .map(|pattern| pattern.kind)
            .collect()
    }
}
