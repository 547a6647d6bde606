//! Log metadata model.
//!
//! Metadata is a `serde_json::Value`: a recursive union of null, bool, number,
//! string, array and object. Loggers accept a top-level object; anything else
//! is normalized by [`into_metadata`].

pub use serde_json::{Map, Value};

/// Top-level metadata attached to a log call.
pub type Metadata = Map<String, Value>;

/// Key used when a non-object value is passed as metadata.
pub const WRAPPED_META_KEY: &str = "meta";

/// Normalize an arbitrary value into a metadata map.
///
/// `null` becomes an empty map and any other non-object value is wrapped
/// under [`WRAPPED_META_KEY`].
pub fn into_metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert(WRAPPED_META_KEY.to_string(), other);
            map
        }
    }
}

/// Dot-joined path of a child key, used in scan findings.
pub fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
