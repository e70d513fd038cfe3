//! Standalone validation of analysis inputs.
//!
//! `validate` surfaces as errors exactly the conditions `diff` would flag
//! with `validation_failed = true` (ambiguous bindings, missing transform
//! references) plus the structural failures under which `diff` would not
//! run at all. Everything else is a warning.

use serde::{Deserialize, Serialize};

use crate::binding::{evaluate_bindings, BindingStatus};
use crate::errors::CoreResult;
use crate::graph::DependencyGraph;
use crate::model::{
    validate_registry, validate_spec, Bindings, MappingSpec, RawSchema, TransformRegistry,
};

/// Inputs to a validation call.
#[derive(Debug, Clone, Copy)]
pub struct ValidateRequest<'a> {
    pub spec: &'a MappingSpec,
    pub registry: Option<&'a TransformRegistry>,
    pub bindings: Option<&'a Bindings>,
    pub raw_schema: Option<&'a RawSchema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Warning,
    Error,
}

/// A structured validation finding with a stable dotted code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub level: FindingLevel,
    pub code: String,
    pub message: String,
}

/// Validation result: findings plus an overall verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.level == FindingLevel::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.level == FindingLevel::Warning)
    }
}

fn push(findings: &mut Vec<Finding>, level: FindingLevel, code: &str, message: String) {
    findings.push(Finding {
        level,
        code: code.to_string(),
        message,
    });
}

/// Validate a spec and its optional collaborators.
pub fn validate(request: &ValidateRequest<'_>) -> CoreResult<ValidationReport> {
    let mut findings = Vec::new();

    let validated = match validate_spec(request.spec) {
        Ok(v) => v,
        Err(e) => {
            push(&mut findings, FindingLevel::Error, "spec.invalid", e.to_string());
            return Ok(ValidationReport {
                ok: false,
                findings,
            });
        }
    };
    for w in &validated.warnings {
        push(&mut findings, FindingLevel::Warning, &w.code, w.message.clone());
    }

    if let Some(registry) = request.registry {
        if let Err(e) = validate_registry(registry) {
            push(&mut findings, FindingLevel::Error, "registry.invalid", e.to_string());
        } else {
            let known = registry.ids();
            for d in &validated.spec.derived {
                if let Some(t) = &d.transform_ref {
                    if !known.contains(t) {
                        push(
                            &mut findings,
                            FindingLevel::Error,
                            "registry.missing_ref",
                            format!("{} references {t}, which the registry does not contain", d.id),
                        );
                    }
                }
            }
        }
    }

    let graph = DependencyGraph::from_spec(&validated);
    for cycle in graph.cycles() {
        let members: Vec<&str> = cycle.iter().map(|n| n.as_str()).collect();
        push(
            &mut findings,
            FindingLevel::Warning,
            "graph.cycle",
            format!("dependency cycle through {}", members.join(" -> ")),
        );
    }

    if let (Some(bindings), Some(raw_schema)) = (request.bindings, request.raw_schema) {
        let report = evaluate_bindings(&validated, raw_schema, bindings);
        for inv in &report.invalid {
            push(
                &mut findings,
                FindingLevel::Warning,
                "binding.invalid",
                format!(
                    "raw column {} bound to {} is not in the schema",
                    inv.raw_column, inv.source
                ),
            );
        }
        for (source, status) in &report.statuses {
            match status {
                BindingStatus::Bound { .. } => {}
                BindingStatus::MissingBinding => push(
                    &mut findings,
                    FindingLevel::Warning,
                    "binding.missing",
                    format!("no binding for {source}"),
                ),
                BindingStatus::AmbiguousBinding { raw_columns } => push(
                    &mut findings,
                    FindingLevel::Error,
                    "binding.ambiguous",
                    format!("{source} is bound by {}", raw_columns.join(", ")),
                ),
            }
        }
    }

    let ok = !findings.iter().any(|f| f.level == FindingLevel::Error);
    Ok(ValidationReport { ok, findings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DerivedVariable, NodeId, RawColumn, SourceColumn};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn node(s: &str) -> NodeId {
        NodeId::parse(s).unwrap()
    }

    fn base_spec() -> MappingSpec {
        MappingSpec {
            schema_version: "0.7".to_string(),
            sources: vec![SourceColumn {
                id: node("s:AGE"),
                name: "AGE".to_string(),
                ty: "integer".to_string(),
            }],
            derived: vec![DerivedVariable {
                id: node("d:AGEGRP"),
                name: "AGEGRP".to_string(),
                ty: "string".to_string(),
                inputs: vec![node("s:AGE")],
                transform_ref: None,
                params: json!({}),
            }],
            constraints: vec![],
        }
    }

    #[test]
    fn clean_spec_ok() {
        let spec = base_spec();
        let report = validate(&ValidateRequest {
            spec: &spec,
            registry: None,
            bindings: None,
            raw_schema: None,
        })
        .unwrap();
        assert!(report.ok, "{:?}", report.findings);
    }

    #[test]
    fn ambiguous_binding_is_error_missing_is_warning() {
        let mut spec = base_spec();
        spec.sources.push(SourceColumn {
            id: node("s:SEX"),
            name: "SEX".to_string(),
            ty: "string".to_string(),
        });
        let raw = RawSchema {
            table: "DM".to_string(),
            columns: vec![
                RawColumn { name: "AGE_A".to_string(), ty: "integer".to_string() },
                RawColumn { name: "AGE_B".to_string(), ty: "integer".to_string() },
            ],
        };
        let bindings = Bindings {
            table: "DM".to_string(),
            bindings: BTreeMap::from([
                ("AGE_A".to_string(), node("s:AGE")),
                ("AGE_B".to_string(), node("s:AGE")),
            ]),
        };
        let report = validate(&ValidateRequest {
            spec: &spec,
            registry: None,
            bindings: Some(&bindings),
            raw_schema: Some(&raw),
        })
        .unwrap();

        assert!(!report.ok);
        assert!(report.errors().any(|f| f.code == "binding.ambiguous"));
        assert!(report.warnings().any(|f| f.code == "binding.missing"));
    }

    #[test]
    fn missing_transform_ref_is_error() {
        let mut spec = base_spec();
        spec.derived[0].transform_ref = Some(node("t:gone"));
        let registry = TransformRegistry {
            registry_version: "1.0.0".to_string(),
            transforms: vec![],
        };
        let report = validate(&ValidateRequest {
            spec: &spec,
            registry: Some(&registry),
            bindings: None,
            raw_schema: None,
        })
        .unwrap();
        assert!(!report.ok);
        assert!(report.errors().any(|f| f.code == "registry.missing_ref"));
    }

    #[test]
    fn cycle_is_warning_not_error() {
        let mut spec = base_spec();
        spec.derived.push(DerivedVariable {
            id: node("d:LOOP"),
            name: "LOOP".to_string(),
            ty: "string".to_string(),
            inputs: vec![node("d:LOOP")],
            transform_ref: None,
            params: json!({}),
        });
        let report = validate(&ValidateRequest {
            spec: &spec,
            registry: None,
            bindings: None,
            raw_schema: None,
        })
        .unwrap();
        assert!(report.ok);
        assert!(report.warnings().any(|f| f.code == "graph.cycle"));
    }

    #[test]
    fn structural_failure_reported_as_error() {
        let mut spec = base_spec();
        spec.sources.push(spec.sources[0].clone());
        let report = validate(&ValidateRequest {
            spec: &spec,
            registry: None,
            bindings: None,
            raw_schema: None,
        })
        .unwrap();
        assert!(!report.ok);
        assert!(report.errors().any(|f| f.code == "spec.invalid"));
    }
}
