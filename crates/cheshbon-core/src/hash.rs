//! Deterministic hashing utilities for cheshbon.
//!
//! All digests in the system are SHA-256 over canonical JSON bytes. Hashes
//! are deterministic and explicitly parameterized; no implicit algorithm
//! defaults are allowed at call sites that record an algorithm name.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical::canonical_json_bytes;
use crate::errors::{CanonicalizationError, CoreResult};

/// Hash algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha256,
}

impl HashAlg {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sha256" => Some(HashAlg::Sha256),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlg::Sha256 => "sha256",
        }
    }
}

/// Hash raw bytes using the selected algorithm.
pub fn hash_bytes(alg: HashAlg, bytes: &[u8]) -> Vec<u8> {
    match alg {
        HashAlg::Sha256 => {
            let mut h = Sha256::new();
            h.update(bytes);
            h.finalize().to_vec()
        }
    }
}

/// SHA-256 of raw bytes as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(hash_bytes(HashAlg::Sha256, bytes))
}

/// SHA-256 of the canonical JSON encoding of a value, as lowercase hex.
pub fn hash_canonical_value_hex(value: &Value) -> Result<String, CanonicalizationError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

/// Hash a serializable artifact through the canonical JSON path.
pub fn hash_artifact_hex<T: serde::Serialize>(artifact: &T) -> CoreResult<String> {
    let value = serde_json::to_value(artifact)
        .map_err(|e| crate::errors::CoreError::serialization(format!("cannot hash artifact: {e}")))?;
    Ok(hash_canonical_value_hex(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sha256_stable() {
        assert_eq!(sha256_hex(b"abc"), sha256_hex(b"abc"));
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn canonical_hash_ignores_key_order() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(
            hash_canonical_value_hex(&a).unwrap(),
            hash_canonical_value_hex(&b).unwrap()
        );
    }

    #[test]
    fn alg_parse_round_trip() {
        assert_eq!(HashAlg::parse("sha256"), Some(HashAlg::Sha256));
        assert_eq!(HashAlg::parse("md5"), None);
        assert_eq!(HashAlg::Sha256.as_str(), "sha256");
    }
}
