//! Content fingerprints.
//!
//! A record is serialized as compact JSON with object keys sorted at every
//! depth, then hashed with SHA-256. Two records with the same fields and
//! values produce the same digest no matter how their keys were ordered.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::record::Record;

/// Canonical JSON bytes for `record`.
pub fn canonical_json(record: &Record) -> Vec<u8> {
    let canonical = canonicalize(&Value::Object(record.as_map().clone()));
    // Serializing a `Value` with string keys cannot fail.
    serde_json::to_vec(&canonical).unwrap_or_default()
}

/// Rebuild `value` with every object's keys inserted in sorted order, so the
/// output is sorted whichever map backing `serde_json` was built with.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        scalar => scalar.clone(),
    }
}

/// SHA-256 of the canonical form, as 64 lowercase hex characters.
pub fn generate_data_hash(record: &Record) -> String {
    hex::encode(Sha256::digest(canonical_json(record)))
}

/// Recompute the digest of `record` and compare it with `hash`.
pub fn verify_data_integrity(record: &Record, hash: &str) -> bool {
    generate_data_hash(record) == hash
}
