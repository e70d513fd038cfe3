//! Binding engine.
//!
//! Given a spec, a raw schema, and a binding layer, derive a status for
//! every required source id:
//! - `Bound`: exactly one raw column (present in the schema) maps to it
//! - `MissingBinding`: no valid raw column maps to it
//! - `AmbiguousBinding`: more than one valid raw column maps to it
//!
//! Precedence: ambiguous beats missing beats bound. Ambiguous bindings are
//! terminal: they force `validation_failed` downstream.
//!
//! Bindings whose raw column does not appear in the schema are reported as
//! invalid and excluded from the status count, so a source whose only
//! binding is invalid is missing, not bound.
//!
//! Raw column type drift under a still-present binding is not detected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Bindings, NodeId, RawSchema, ValidatedSpec};

/// Status of one required source id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BindingStatus {
    Bound { raw_column: String },
    MissingBinding,
    AmbiguousBinding { raw_columns: Vec<String> },
}

impl BindingStatus {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, BindingStatus::AmbiguousBinding { .. })
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, BindingStatus::MissingBinding)
    }
}

/// A binding naming a raw column the schema does not contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidBinding {
    pub raw_column: String,
    pub source: NodeId,
}

/// Result of evaluating the binding layer against a spec and raw schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingReport {
    /// Status per required source id, sorted by id.
    pub statuses: BTreeMap<NodeId, BindingStatus>,
    /// Bindings rejected because the raw column is absent from the schema.
    pub invalid: Vec<InvalidBinding>,
}

impl BindingReport {
    pub fn has_ambiguous(&self) -> bool {
        self.statuses.values().any(BindingStatus::is_ambiguous)
    }

    /// Sources with the given predicate, sorted.
    pub fn sources_where<F: Fn(&BindingStatus) -> bool>(&self, pred: F) -> Vec<NodeId> {
        self.statuses
            .iter()
            .filter(|(_, st)| pred(st))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Evaluate binding status for every source the spec declares.
pub fn evaluate_bindings(
    spec: &ValidatedSpec,
    raw_schema: &RawSchema,
    bindings: &Bindings,
) -> BindingReport {
    // source id -> valid raw columns mapping to it, in raw-name order
    let mut by_source: BTreeMap<NodeId, Vec<String>> = BTreeMap::new();
    let mut invalid = Vec::new();

    for (raw_name, source_id) in &bindings.bindings {
        if raw_schema.column(raw_name).is_none() {
            invalid.push(InvalidBinding {
                raw_column: raw_name.clone(),
                source: source_id.clone(),
            });
            continue;
        }
        by_source
            .entry(source_id.clone())
            .or_default()
            .push(raw_name.clone());
    }

    let mut statuses = BTreeMap::new();
    for s in &spec.spec.sources {
        let status = match by_source.get(&s.id) {
            None => BindingStatus::MissingBinding,
            Some(cols) if cols.len() == 1 => BindingStatus::Bound {
                raw_column: cols[0].clone(),
            },
            Some(cols) => BindingStatus::AmbiguousBinding {
                raw_columns: cols.clone(),
            },
        };
        statuses.insert(s.id.clone(), status);
    }

    BindingReport { statuses, invalid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{validate_spec, MappingSpec, RawColumn, SourceColumn};

    fn node(s: &str) -> NodeId {
        NodeId::parse(s).unwrap()
    }

    fn spec_with_sources(ids: &[&str]) -> ValidatedSpec {
        validate_spec(&MappingSpec {
            schema_version: "0.7".to_string(),
            sources: ids
                .iter()
                .map(|id| SourceColumn {
                    id: node(id),
                    name: id[2..].to_string(),
                    ty: "string".to_string(),
                })
                .collect(),
            derived: vec![],
            constraints: vec![],
        })
        .unwrap()
    }

    fn raw_schema(cols: &[&str]) -> RawSchema {
        RawSchema {
            table: "DM".to_string(),
            columns: cols
                .iter()
                .map(|c| RawColumn {
                    name: c.to_string(),
                    ty: "string".to_string(),
                })
                .collect(),
        }
    }

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        Bindings {
            table: "DM".to_string(),
            bindings: pairs
                .iter()
                .map(|(raw, src)| (raw.to_string(), node(src)))
                .collect(),
        }
    }

    #[test]
    fn bound_missing_and_ambiguous() {
        let spec = spec_with_sources(&["s:AGE", "s:SEX", "s:RACE"]);
        let report = evaluate_bindings(
            &spec,
            &raw_schema(&["AGE_A", "AGE_B", "SEX_RAW"]),
            &bindings(&[("AGE_A", "s:AGE"), ("AGE_B", "s:AGE"), ("SEX_RAW", "s:SEX")]),
        );

        assert!(report.statuses[&node("s:AGE")].is_ambiguous());
        assert_eq!(
            report.statuses[&node("s:SEX")],
            BindingStatus::Bound {
                raw_column: "SEX_RAW".to_string()
            }
        );
        assert!(report.statuses[&node("s:RACE")].is_missing());
        assert!(report.has_ambiguous());
    }

    #[test]
    fn invalid_binding_excluded_from_count() {
        let spec = spec_with_sources(&["s:AGE"]);
        let report = evaluate_bindings(
            &spec,
            &raw_schema(&["AGE_REAL"]),
            &bindings(&[("AGE_REAL", "s:AGE"), ("AGE_PHANTOM", "s:AGE")]),
        );
        // The phantom column is invalid; the source is still cleanly bound.
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].raw_column, "AGE_PHANTOM");
        assert_eq!(
            report.statuses[&node("s:AGE")],
            BindingStatus::Bound {
                raw_column: "AGE_REAL".to_string()
            }
        );
    }

    #[test]
    fn only_invalid_binding_means_missing() {
        let spec = spec_with_sources(&["s:AGE"]);
        let report = evaluate_bindings(
            &spec,
            &raw_schema(&[]),
            &bindings(&[("AGE_RAW", "s:AGE")]),
        );
        assert!(report.statuses[&node("s:AGE")].is_missing());
        assert_eq!(report.invalid.len(), 1);
    }
}
