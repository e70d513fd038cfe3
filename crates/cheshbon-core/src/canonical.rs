//! Canonical JSON for cheshbon.
//!
//! This module defines the strict canonical JSON encoding that every digest
//! in the system is computed over.
//!
//! Canonical JSON rules enforced here:
//! - Object keys are sorted recursively by Unicode code point
//! - Strings (values and keys) are normalized to Unicode NFC
//! - Floating-point numbers are rejected; callers encode decimals as strings
//! - Arrays preserve order, except arrays tagged as semantic sets, which are
//!   sorted via [`sort_set_array`]
//! - Compact separators only: `","` between pairs, `":"` between key and value
//! - No implicit defaults are inserted
//!
//! Canonical bytes are never produced by default serde formatting. All
//! hashing flows through [`canonical_json_bytes`].

use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

use crate::errors::CanonicalizationError;

/// Canonicalize a JSON value recursively.
///
/// Returns a new `Value` with sorted object keys, NFC-normalized strings,
/// and all nested values canonicalized. Fails on floating-point numbers.
pub fn canonical_json_value(value: &Value) -> Result<Value, CanonicalizationError> {
    canonicalize_at(value, "$")
}

fn canonicalize_at(value: &Value, path: &str) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Ok(value.clone())
            } else {
                Err(CanonicalizationError::FloatForbidden {
                    path: path.to_string(),
                })
            }
        }
        Value::String(s) => Ok(Value::String(nfc(s))),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, v) in items.iter().enumerate() {
                out.push(canonicalize_at(v, &format!("{path}[{i}]"))?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => canonicalize_object(map, path),
    }
}

fn canonicalize_object(map: &Map<String, Value>, path: &str) -> Result<Value, CanonicalizationError> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = Map::new();
    for (k, v) in entries {
        let nk = nfc(k);
        let child_path = format!("{path}.{nk}");
        let v = canonicalize_at(v, &child_path)?;
        if out.insert(nk, v).is_some() {
            // Two distinct keys collapsed to the same NFC form.
            return Err(CanonicalizationError::NonJsonType {
                path: path.to_string(),
                message: format!("object keys collide after NFC normalization: {k}"),
            });
        }
    }
    Ok(Value::Object(out))
}

fn nfc(s: &str) -> String {
    s.nfc().collect()
}

/// Convert a JSON value into canonical UTF-8 bytes.
///
/// This representation is byte-stable across machines and runs; equal
/// semantic values yield bit-identical output.
pub fn canonical_json_bytes(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let canonical = canonical_json_value(value)?;
    // serde_json's Map is ordered, so compact serialization of the
    // canonicalized value emits sorted keys with "," and ":" separators.
    serde_json::to_vec(&canonical).map_err(|e| CanonicalizationError::NonJsonType {
        path: "$".to_string(),
        message: format!("failed to serialize canonical JSON: {e}"),
    })
}

/// Parse raw bytes into a JSON value suitable for canonicalization.
///
/// Invalid UTF-8 is a canonicalization failure, not a parse failure.
pub fn canonical_json_from_slice(bytes: &[u8]) -> Result<Value, CanonicalizationError> {
    let text = std::str::from_utf8(bytes).map_err(|e| CanonicalizationError::InvalidUtf8 {
        message: e.to_string(),
    })?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| CanonicalizationError::NonJsonType {
            path: "$".to_string(),
            message: format!("invalid JSON: {e}"),
        })?;
    canonical_json_value(&value)
}

/// Sort the elements of a semantic-set array.
///
/// Elements are ordered by the two-level key `(type_tag, canonical_form)`
/// where the type tag orders `null < bool < number < string < array <
/// object`. Each element is canonicalized before comparison, so the result
/// is itself canonical.
pub fn sort_set_array(items: &[Value]) -> Result<Vec<Value>, CanonicalizationError> {
    let mut keyed = Vec::with_capacity(items.len());
    for v in items {
        let canonical = canonical_json_value(v)?;
        let bytes = canonical_json_bytes(&canonical)?;
        keyed.push((type_tag(&canonical), bytes, canonical));
    }
    keyed.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    Ok(keyed.into_iter().map(|(_, _, v)| v).collect())
}

fn type_tag(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compare two JSON values for canonical equality.
pub fn canonical_eq(a: &Value, b: &Value) -> Result<bool, CanonicalizationError> {
    Ok(canonical_json_bytes(a)? == canonical_json_bytes(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn keys_sorted_recursively() {
        let v = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let bytes = canonical_json_bytes(&v).unwrap();
        assert_eq!(bytes, br#"{"a":{"c":3,"d":2},"b":1}"#);
    }

    #[test]
    fn canonical_eq_ignores_key_order() {
        let a = json!({"a": 1, "b": [true, null]});
        let b = json!({"b": [true, null], "a": 1});
        assert!(canonical_eq(&a, &b).unwrap());
    }

    #[test]
    fn floats_rejected_with_path() {
        let v = json!({"params": {"rate": 0.5}});
        let err = canonical_json_value(&v).unwrap_err();
        assert_matches!(err, CanonicalizationError::FloatForbidden { path } if path == "$.params.rate");
    }

    #[test]
    fn integers_pass() {
        let v = json!({"n": -3, "m": 18446744073709551615u64});
        assert!(canonical_json_value(&v).is_ok());
    }

    #[test]
    fn strings_nfc_normalized() {
        // U+0065 U+0301 (e + combining acute) composes to U+00E9.
        let decomposed = json!("e\u{0301}");
        let composed = json!("\u{00e9}");
        assert!(canonical_eq(&decomposed, &composed).unwrap());
    }

    #[test]
    fn array_order_preserved_by_default() {
        let a = json!([2, 1]);
        let b = json!([1, 2]);
        assert!(!canonical_eq(&a, &b).unwrap());
    }

    #[test]
    fn set_array_sorted_by_type_then_form() {
        let items = vec![json!("b"), json!(2), json!(null), json!("a"), json!(true)];
        let sorted = sort_set_array(&items).unwrap();
        assert_eq!(sorted, vec![json!(null), json!(true), json!(2), json!("a"), json!("b")]);
    }

    #[test]
    fn invalid_utf8_rejected() {
        let err = canonical_json_from_slice(&[0xff, 0xfe]).unwrap_err();
        assert_matches!(err, CanonicalizationError::InvalidUtf8 { .. });
    }
}
