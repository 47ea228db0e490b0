//! Deterministic hashing utilities, ported from
//! `original_source/.../rmos/runs_v2/hashing.py`.
//!
//! Every SHA-256 embedded in a `RunArtifact` is computed over the *canonical*
//! JSON form: sorted keys, compact separators, UTF-8, no ASCII escaping, no
//! trailing newline (§6). `serde_json::Value` already sorts map keys when the
//! `preserve_order` feature is off (the default), so canonicalization is a
//! `to_string` away once a value has round-tripped through `Value`.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Render `obj` as canonical JSON text: sorted keys, compact separators,
/// no trailing newline.
pub fn stable_json_dumps<T: Serialize>(obj: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(obj)?;
    serde_json::to_string(&canonicalize(&value))
}

/// Recursively rebuild a `Value` with object keys in sorted order. `Value`'s
/// `Map` is a `BTreeMap` by default (no `preserve_order` feature), so this
/// is mostly a structural no-op; it exists so canonicalization is explicit
/// and independent of crate feature flags elsewhere in the dependency tree.
fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                out.insert(k.clone(), canonicalize(&map[k]));
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize).collect())
        }
        other => other.clone(),
    }
}

/// SHA-256 of an arbitrary serializable object, hashed over its canonical
/// JSON form. Returns lowercase hex.
pub fn sha256_of_obj<T: Serialize>(obj: &T) -> serde_json::Result<String> {
    let text = stable_json_dumps(obj)?;
    Ok(sha256_of_text(&text))
}

/// SHA-256 of UTF-8 text. Returns lowercase hex.
pub fn sha256_of_text(text: &str) -> String {
    sha256_of_bytes(text.as_bytes())
}

/// SHA-256 of raw bytes. Returns lowercase hex.
pub fn sha256_of_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Returns true if `sha` looks like a lowercase, 64-hex-char SHA-256.
pub fn is_well_formed_sha256(sha: &str) -> bool {
    sha.len() == 64 && sha.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
