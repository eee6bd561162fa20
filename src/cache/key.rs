//! Deterministic cache keys for tool invocations

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Parameters whose names start with this prefix never reach the key
pub const INTERNAL_PARAM_PREFIX: char = '_';

/// Derive the cache key for `tool_name` invoked with `params`.
///
/// With an allow-list only the listed parameters are hashed (missing ones
/// are simply absent); otherwise every non-internal parameter is. Parameters
/// are sorted by name, so insertion order never changes the key.
pub fn derive_key(
    tool_name: &str,
    params: &Map<String, Value>,
    allow_list: Option<&[String]>,
) -> String {
    let selected: BTreeMap<&str, &Value> = match allow_list {
        Some(allowed) => allowed
            .iter()
            .filter_map(|name| params.get(name).map(|value| (name.as_str(), value)))
            .collect(),
        None => params
            .iter()
            .filter(|(name, _)| !name.starts_with(INTERNAL_PARAM_PREFIX))
            .map(|(name, value)| (name.as_str(), value))
            .collect(),
    };

    // serde_json keeps object keys sorted, so nested values are canonical too
    let serialized = serde_json::to_string(&selected).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(tool_name.as_bytes());
    hasher.update(b":");
    hasher.update(serialized.as_bytes());
    format!("{:x}", hasher.finalize())
}
