//! Canonical JSON serialisation and SHA-256 hashing.
//!
//! Canonicalisation sorts object keys lexicographically at every depth and
//! emits no insignificant whitespace; `serde_json`'s own number formatting is
//! already the shortest round-trip representation, so no further numeric
//! normalisation is needed once keys are ordered.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Recursively re-orders every object in `value` into lexicographic key order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical UTF-8 JSON bytes for `value`: sorted keys, no whitespace.
pub fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(&canonicalize(value)).expect("canonical value is always serializable")
}

/// Removes the named top-level fields before canonicalisation, as required
/// when hashing a structure that carries its own hash or signature field.
pub fn exclude_fields(value: &Value, fields: &[&str]) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                if !fields.contains(&k.as_str()) {
                    out.insert(k.clone(), v.clone());
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Lowercase hex SHA-256 digest of `bytes`, unprefixed.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// `sha256:`-prefixed lowercase hex SHA-256 digest of `bytes`.
pub fn sha256_prefixed(bytes: &[u8]) -> String {
    format!("sha256:{}", sha256_hex(bytes))
}

/// Canonicalises `value`, hashes the resulting bytes, and returns the
/// `sha256:`-prefixed hex digest.
pub fn hash_canonical_value(value: &Value) -> String {
    sha256_prefixed(&canonical_json_bytes(value))
}

/// Convenience: canonical-hash a serde value after excluding the given
/// top-level fields (e.g. `hash`, `receivedAt`, `signature`).
pub fn hash_canonical_excluding(value: &Value, exclude: &[&str]) -> String {
    hash_canonical_value(&exclude_fields(value, exclude))
}
