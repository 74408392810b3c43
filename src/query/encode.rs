//! Payload encoding: cache fingerprints and query strings

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::QueryPayload;

/// SHA-256 fingerprint of a payload.
///
/// Object keys are sorted before hashing so construction order never
/// changes the result.
pub fn fingerprint(payload: &QueryPayload) -> Result<String, serde_json::Error> {
    let serialized = match payload {
        QueryPayload::Structured(payload) => canonical_json(&serde_json::to_value(payload)?),
        QueryPayload::Raw(raw) => raw.clone(),
    };
    Ok(format!("{:x}", Sha256::digest(serialized.as_bytes())))
}

/// Serialize a JSON value with object keys in sorted order
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(item) = map.get(key) {
                    write_canonical(item, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Flatten a JSON value into bracketed query parameters.
///
/// `{"filter": {"field": "id", "value": [1, 2]}}` becomes
/// `filter[field]=id`, `filter[value][0]=1`, `filter[value][1]=2`.
/// Booleans are sent as `1`/`0` and nulls are omitted.
pub fn query_pairs(value: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Value::Object(map) = value {
        for (key, item) in map {
            flatten_into(key.clone(), item, &mut pairs);
        }
    }
    pairs
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => pairs.push((prefix, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(number) => pairs.push((prefix, number.to_string())),
        Value::String(text) => pairs.push((prefix, text.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(format!("{prefix}[{i}]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_into(format!("{prefix}[{key}]"), item, pairs);
            }
        }
    }
}
