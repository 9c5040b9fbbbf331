//! Canonical-JSON digests for handoff payloads.
//!
//! `serde_json` preserves insertion order for object keys, so a naive
//! serialization is not stable across producers. Digests are computed over a
//! canonical form: keys sorted, no redundant whitespace.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Serializes a JSON value canonically: object keys sorted, compact.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let parts: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json(v)
                    )
                })
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// Computes the lowercase hex SHA-256 of a payload's canonical form.
#[must_use]
pub fn payload_digest(payload: &serde_json::Map<String, Value>) -> String {
    let canonical = canonical_json(&Value::Object(payload.clone()));
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
