//! Mapping specification model.
//!
//! A `MappingSpec` is the versioned artifact under analysis: a set of source
//! columns, derived variables, and constraints, plus a schema-version tag.
//! Entities are immutable value objects; a validated spec additionally
//! carries computed indexes (params digests, unresolved references) that are
//! never stored in the artifact itself.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::canonical_json_bytes;
use crate::hash::sha256_hex;
use crate::errors::SpecValidationError;
use crate::limits::{PARAMS_MAX_BYTES, PARAMS_WARN_BYTES};
use crate::model::{NodeId, NodeKind};

/// Schema version this crate reads and writes.
pub const SPEC_SCHEMA_VERSION: &str = "0.7";

/// A raw upstream column surfaced to the mapping layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceColumn {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A variable defined by a transform over inputs. Never executed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedVariable {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub inputs: Vec<NodeId>,
    #[serde(default)]
    pub transform_ref: Option<NodeId>,
    #[serde(default)]
    pub params: Value,
}

impl DerivedVariable {
    /// Inputs as a set; reordering the declared list is not a change.
    pub fn input_set(&self) -> BTreeSet<NodeId> {
        self.inputs.iter().cloned().collect()
    }
}

/// A named predicate over inputs with an opaque expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: NodeId,
    pub name: String,
    pub inputs: Vec<NodeId>,
    pub expression: String,
}

impl Constraint {
    pub fn input_set(&self) -> BTreeSet<NodeId> {
        self.inputs.iter().cloned().collect()
    }
}

/// A versioned mapping specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSpec {
    pub schema_version: String,
    pub sources: Vec<SourceColumn>,
    pub derived: Vec<DerivedVariable>,
    pub constraints: Vec<Constraint>,
}

impl MappingSpec {
    pub fn source(&self, id: &NodeId) -> Option<&SourceColumn> {
        self.sources.iter().find(|s| &s.id == id)
    }

    pub fn derived(&self, id: &NodeId) -> Option<&DerivedVariable> {
        self.derived.iter().find(|d| &d.id == id)
    }

    pub fn constraint(&self, id: &NodeId) -> Option<&Constraint> {
        self.constraints.iter().find(|c| &c.id == id)
    }

    /// All declared entity ids, sorted.
    pub fn declared_ids(&self) -> BTreeSet<NodeId> {
        let mut ids = BTreeSet::new();
        ids.extend(self.sources.iter().map(|s| s.id.clone()));
        ids.extend(self.derived.iter().map(|d| d.id.clone()));
        ids.extend(self.constraints.iter().map(|c| c.id.clone()));
        ids
    }
}

/// A non-fatal validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecWarning {
    pub code: String,
    pub message: String,
}

/// A spec that passed structural validation, with computed indexes.
///
/// `params_hash` holds the canonical-JSON digest of each derived variable's
/// params; it is computed at load and never stored in the artifact.
/// `unresolved` flags input references that do not resolve to a declared
/// entity (they are data, not an error: removals between versions surface
/// exactly this way).
#[derive(Debug, Clone)]
pub struct ValidatedSpec {
    pub spec: MappingSpec,
    pub params_hash: BTreeMap<NodeId, String>,
    pub unresolved: BTreeMap<NodeId, BTreeSet<NodeId>>,
    pub warnings: Vec<SpecWarning>,
}

/// Validate a mapping spec and compute its indexes.
///
/// Fails on: id kind mismatches, duplicate ids within a kind, params over
/// the hard size limit, params that cannot be canonicalized. Unresolved
/// references and oversized-but-legal params are collected, not fatal.
pub fn validate_spec(spec: &MappingSpec) -> Result<ValidatedSpec, SpecValidationError> {
    let mut warnings = Vec::new();

    if spec.schema_version != SPEC_SCHEMA_VERSION {
        warnings.push(SpecWarning {
            code: "spec.schema_version".to_string(),
            message: format!(
                "schema_version is {:?}, expected {:?}",
                spec.schema_version, SPEC_SCHEMA_VERSION
            ),
        });
    }

    check_kind_and_unique(spec.sources.iter().map(|s| &s.id), NodeKind::Source)?;
    check_kind_and_unique(spec.derived.iter().map(|d| &d.id), NodeKind::Derived)?;
    check_kind_and_unique(spec.constraints.iter().map(|c| &c.id), NodeKind::Constraint)?;

    let declared = spec.declared_ids();
    let mut unresolved: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    let mut params_hash = BTreeMap::new();

    for d in &spec.derived {
        for input in &d.inputs {
            if input.kind() == NodeKind::Transform {
                return Err(SpecValidationError::InvalidIdFormat {
                    id: input.as_str().to_string(),
                });
            }
            if !declared.contains(input) {
                unresolved.entry(d.id.clone()).or_default().insert(input.clone());
            }
        }
        if let Some(t) = &d.transform_ref {
            if t.kind() != NodeKind::Transform {
                return Err(SpecValidationError::InvalidIdFormat {
                    id: t.as_str().to_string(),
                });
            }
        }

        let bytes = canonical_json_bytes(&d.params).map_err(|e| {
            SpecValidationError::ParamsNotCanonical {
                id: d.id.clone(),
                source: e,
            }
        })?;
        if bytes.len() > PARAMS_MAX_BYTES {
            return Err(SpecValidationError::ParamsTooLarge {
                id: d.id.clone(),
                size: bytes.len(),
                limit: PARAMS_MAX_BYTES,
            });
        }
        if bytes.len() > PARAMS_WARN_BYTES {
            warnings.push(SpecWarning {
                code: "spec.params_large".to_string(),
                message: format!("params of {} are {} bytes", d.id, bytes.len()),
            });
        }
        params_hash.insert(d.id.clone(), sha256_hex(&bytes));
    }

    for c in &spec.constraints {
        for input in &c.inputs {
            if input.kind() == NodeKind::Transform {
                return Err(SpecValidationError::InvalidIdFormat {
                    id: input.as_str().to_string(),
                });
            }
            if !declared.contains(input) {
                unresolved.entry(c.id.clone()).or_default().insert(input.clone());
            }
        }
    }

    for (owner, refs) in &unresolved {
        for r in refs {
            warnings.push(SpecWarning {
                code: "spec.unresolved_reference".to_string(),
                message: format!("{owner} references undeclared {r}"),
            });
        }
    }

    Ok(ValidatedSpec {
        spec: spec.clone(),
        params_hash,
        unresolved,
        warnings,
    })
}

fn check_kind_and_unique<'a, I>(ids: I, kind: NodeKind) -> Result<(), SpecValidationError>
where
    I: Iterator<Item = &'a NodeId>,
{
    let mut seen = BTreeSet::new();
    for id in ids {
        if id.kind() != kind {
            return Err(SpecValidationError::InvalidIdFormat {
                id: id.as_str().to_string(),
            });
        }
        if !seen.insert(id.clone()) {
            return Err(SpecValidationError::DuplicateId { id: id.clone() });
        }
    }
    Ok(())
}
