//! Transform registry model.
//!
//! The registry catalogues transforms referenced by derived variables. Each
//! entry carries a structured implementation fingerprint and an append-only
//! history of fingerprint snapshots. Digest stability implies semantic
//! equivalence of the implementation; `ref` churn alone is not a change.
//!
//! History is the one append-only structure in the system: appending returns
//! a new sequence and prior entries are preserved byte-identically.

use std::collections::BTreeSet;
use std::path::Path;

use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::errors::{RegistryValidationError, SpecValidationError};
use crate::model::{NodeId, NodeKind};

/// Registry format version this crate reads and writes.
pub const REGISTRY_VERSION: &str = "1.0.0";

/// Structured fingerprint of a transform implementation.
///
/// `ref_path` is always relative to the registry root; absolute paths are
/// rejected at validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplFingerprint {
    pub algo: String,
    pub source: String,
    #[serde(rename = "ref")]
    pub ref_path: String,
    pub digest: String,
}

/// An immutable snapshot recorded when a transform changes.
///
/// Timestamps are supplied by the caller and treated as opaque strings; the
/// core never reads a clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub impl_fingerprint: ImplFingerprint,
    pub params_schema_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_reason: Option<String>,
}

/// An ordered, append-only sequence of history entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformHistory(Vec<HistoryEntry>);

impl TransformHistory {
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    /// Return a new history with `entry` appended. Existing entries are
    /// never mutated or reordered.
    pub fn appended(&self, entry: HistoryEntry) -> TransformHistory {
        let mut entries = self.0.clone();
        entries.push(entry);
        TransformHistory(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A catalogued transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformEntry {
    pub id: NodeId,
    pub version: String,
    pub kind: String,
    pub signature: String,
    pub params_schema_hash: String,
    pub impl_fingerprint: ImplFingerprint,
    #[serde(default)]
    pub history: TransformHistory,
}

/// A versioned transform registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRegistry {
    pub registry_version: String,
    pub transforms: Vec<TransformEntry>,
}

impl TransformRegistry {
    pub fn entry(&self, id: &NodeId) -> Option<&TransformEntry> {
        self.transforms.iter().find(|t| &t.id == id)
    }

    /// All transform ids, sorted.
    pub fn ids(&self) -> BTreeSet<NodeId> {
        self.transforms.iter().map(|t| t.id.clone()).collect()
    }
}

/// Validate a registry: id format and kind, global uniqueness, relative
/// implementation refs.
pub fn validate_registry(
    registry: &TransformRegistry,
) -> Result<(), crate::errors::CoreError> {
    let mut seen = BTreeSet::new();
    for t in &registry.transforms {
        if t.id.kind() != NodeKind::Transform {
            return Err(SpecValidationError::InvalidIdFormat {
                id: t.id.as_str().to_string(),
            }
            .into());
        }
        if !seen.insert(t.id.clone()) {
            return Err(RegistryValidationError::DuplicateTransformId { id: t.id.clone() }.into());
        }
        check_relative_ref(&t.id, &t.impl_fingerprint)?;
        for h in t.history.entries() {
            check_relative_ref(&t.id, &h.impl_fingerprint)?;
        }
    }
    Ok(())
}

fn check_relative_ref(
    id: &NodeId,
    fp: &ImplFingerprint,
) -> Result<(), SpecValidationError> {
    let cleaned = Path::new(&fp.ref_path).clean();
    if cleaned.is_absolute() || cleaned.starts_with("..") || fp.ref_path.starts_with('/') {
        return Err(SpecValidationError::AbsoluteImplRef {
            id: id.clone(),
            reference: fp.ref_path.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn fingerprint(ref_path: &str, digest: &str) -> ImplFingerprint {
        ImplFingerprint {
            algo: "sha256".to_string(),
            source: "git".to_string(),
            ref_path: ref_path.to_string(),
            digest: digest.to_string(),
        }
    }

    fn entry(id: &str, digest: &str) -> TransformEntry {
        TransformEntry {
            id: NodeId::parse(id).unwrap(),
            version: "1.0.0".to_string(),
            kind: "map".to_string(),
            signature: "(value) -> value".to_string(),
            params_schema_hash: "0".repeat(64),
            impl_fingerprint: fingerprint("transforms/ct_map.py", digest),
            history: TransformHistory::default(),
        }
    }

    #[test]
    fn valid_registry_passes() {
        let r = TransformRegistry {
            registry_version: REGISTRY_VERSION.to_string(),
            transforms: vec![entry("t:ct_map", "abc")],
        };
        assert!(validate_registry(&r).is_ok());
    }

    #[test]
    fn duplicate_transform_id_rejected() {
        let r = TransformRegistry {
            registry_version: REGISTRY_VERSION.to_string(),
            transforms: vec![entry("t:ct_map", "abc"), entry("t:ct_map", "def")],
        };
        assert_matches!(
            validate_registry(&r),
            Err(crate::errors::CoreError::RegistryValidation(
                RegistryValidationError::DuplicateTransformId { .. }
            ))
        );
    }

    #[test]
    fn absolute_ref_rejected() {
        let mut e = entry("t:ct_map", "abc");
        e.impl_fingerprint.ref_path = "/etc/transforms/ct_map.py".to_string();
        let r = TransformRegistry {
            registry_version: REGISTRY_VERSION.to_string(),
            transforms: vec![e],
        };
        assert_matches!(
            validate_registry(&r),
            Err(crate::errors::CoreError::SpecValidation(
                SpecValidationError::AbsoluteImplRef { .. }
            ))
        );
    }

    #[test]
    fn escaping_ref_rejected() {
        let mut e = entry("t:ct_map", "abc");
        e.impl_fingerprint.ref_path = "../outside/ct_map.py".to_string();
        let r = TransformRegistry {
            registry_version: REGISTRY_VERSION.to_string(),
            transforms: vec![e],
        };
        assert_matches!(
            validate_registry(&r),
            Err(crate::errors::CoreError::SpecValidation(
                SpecValidationError::AbsoluteImplRef { .. }
            ))
        );
    }

    #[test]
    fn history_append_preserves_prior_entries() {
        let h0 = TransformHistory::default();
        let h1 = h0.appended(HistoryEntry {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            impl_fingerprint: fingerprint("transforms/ct_map.py", "abc"),
            params_schema_hash: "0".repeat(64),
            change_reason: None,
        });
        let h2 = h1.appended(HistoryEntry {
            timestamp: "2026-02-01T00:00:00Z".to_string(),
            impl_fingerprint: fingerprint("transforms/ct_map.py", "def"),
            params_schema_hash: "0".repeat(64),
            change_reason: Some("tightened mapping".to_string()),
        });

        assert!(h0.is_empty());
        assert_eq!(h1.len(), 1);
        assert_eq!(h2.len(), 2);
        // Prior entries are byte-identical after append.
        assert_eq!(
            serde_json::to_vec(&h1.entries()[0]).unwrap(),
            serde_json::to_vec(&h2.entries()[0]).unwrap()
        );
    }
}
