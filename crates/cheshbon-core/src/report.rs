//! Witnessed report construction.
//!
//! Three modes consume the same impact result:
//! - `core`: ordered `impacted`, `unaffected`, `events`, `reasons`
//! - `full`: `core` plus per-node paths
//! - `all-details`: `full` plus one witness per impacted node
//!
//! Every report carries `inputs_digest` (each input artifact hashed
//! canonically) and `content_hash` (SHA-256 of the canonical JSON of the
//! report with the `content_hash` field itself excluded). Two invocations
//! with identical inputs produce byte-identical report bodies and digests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::diff::ChangeEvent;
use crate::errors::{CoreError, CoreResult};
use crate::hash::{hash_artifact_hex, hash_canonical_value_hex};
use crate::impact::{ImpactResult, NodeReasons, ReasonCode};
use crate::model::{Bindings, MappingSpec, NodeId, RawSchema, TransformRegistry};

/// Report format version this crate writes.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Report detail mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMode {
    Core,
    Full,
    AllDetails,
}

/// The analysis inputs a report was computed from.
///
/// Borrowed view; the same set is handed to the builder and the verifier.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub from_spec: &'a MappingSpec,
    pub to_spec: &'a MappingSpec,
    pub registry_from: Option<&'a TransformRegistry>,
    pub registry_to: Option<&'a TransformRegistry>,
    pub bindings: Option<&'a Bindings>,
    pub raw_schema: Option<&'a RawSchema>,
}

/// Canonical digests of the input artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputsDigest {
    pub from_spec: String,
    pub to_spec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_v1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_v2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_schema: Option<String>,
}

impl<'a> ReportInputs<'a> {
    /// Hash every supplied artifact canonically.
    pub fn digest(&self) -> CoreResult<InputsDigest> {
        Ok(InputsDigest {
            from_spec: hash_artifact_hex(self.from_spec)?,
            to_spec: hash_artifact_hex(self.to_spec)?,
            registry_v1: self.registry_from.map(hash_artifact_hex).transpose()?,
            registry_v2: self.registry_to.map(hash_artifact_hex).transpose()?,
            bindings: self.bindings.map(hash_artifact_hex).transpose()?,
            raw_schema: self.raw_schema.map(hash_artifact_hex).transpose()?,
        })
    }
}

/// Structured evidence for one impact claim, re-derivable from inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub id: NodeId,
    pub primary_reason: ReasonCode,
    pub all_reasons: Vec<ReasonCode>,
    pub path: Vec<NodeId>,
    pub alt_path_count: usize,
    /// Ids of the change events this claim traces back to, sorted.
    pub source_events: Vec<String>,
}

/// A deterministic impact report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: String,
    pub mode: ReportMode,
    pub inputs_digest: InputsDigest,
    pub events: Vec<ChangeEvent>,
    pub impacted: Vec<NodeId>,
    pub unaffected: Vec<NodeId>,
    pub reasons: BTreeMap<NodeId, NodeReasons>,
    pub validation_failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<BTreeMap<NodeId, Vec<NodeId>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witnesses: Option<Vec<Witness>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Assemble a report from an impact result.
///
/// `Full` and `AllDetails` require the impact result to carry paths.
pub fn build_report(
    mode: ReportMode,
    inputs: &ReportInputs<'_>,
    events: &[ChangeEvent],
    impact: &ImpactResult,
) -> CoreResult<Report> {
    let witnesses = match mode {
        ReportMode::AllDetails => Some(build_witnesses(events, impact)),
        _ => None,
    };
    let paths = match mode {
        ReportMode::Core => None,
        ReportMode::Full | ReportMode::AllDetails => Some(impact.paths.clone()),
    };

    let mut report = Report {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        mode,
        inputs_digest: inputs.digest()?,
        events: events.to_vec(),
        impacted: impact.impacted.clone(),
        unaffected: impact.unaffected.clone(),
        reasons: impact.reasons.clone(),
        validation_failed: impact.validation_failed,
        paths,
        witnesses,
        content_hash: None,
    };
    report.content_hash = Some(content_hash(&report)?);
    Ok(report)
}

fn build_witnesses(events: &[ChangeEvent], impact: &ImpactResult) -> Vec<Witness> {
    let event_ids: BTreeSet<String> = events.iter().map(ChangeEvent::event_id).collect();
    impact
        .impacted
        .iter()
        .map(|id| {
            let reasons = &impact.reasons[id];
            Witness {
                id: id.clone(),
                primary_reason: reasons.primary,
                all_reasons: reasons.all.clone(),
                path: impact
                    .paths
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| vec![id.clone()]),
                alt_path_count: impact.alt_path_counts.get(id).copied().unwrap_or(0),
                source_events: reasons
                    .evidence
                    .iter()
                    .filter(|e| event_ids.contains(*e))
                    .cloned()
                    .collect(),
            }
        })
        .collect()
}

/// SHA-256 of the canonical JSON of the report with `content_hash` excluded.
pub fn content_hash(report: &Report) -> CoreResult<String> {
    let mut stripped = report.clone();
    stripped.content_hash = None;
    let value = serde_json::to_value(&stripped)
        .map_err(|e| CoreError::serialization(format!("cannot serialize report: {e}")))?;
    Ok(hash_canonical_value_hex(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{validate_spec, MappingSpec};
    use crate::{diff, graph::DependencyGraph, impact};

    fn minimal_spec() -> MappingSpec {
        MappingSpec {
            schema_version: "0.7".to_string(),
            sources: vec![],
            derived: vec![],
            constraints: vec![],
        }
    }

    fn build(mode: ReportMode) -> Report {
        let spec = minimal_spec();
        let v = validate_spec(&spec).unwrap();
        let events = diff::diff(&v, &v, None, None);
        let graph = DependencyGraph::from_spec(&v);
        let result = impact::compute_impact(impact::ImpactInputs {
            events: &events,
            graph: &graph,
            to_spec: &v,
            registry_to: None,
            binding_report: None,
            with_paths: true,
        });
        let inputs = ReportInputs {
            from_spec: &spec,
            to_spec: &spec,
            registry_from: None,
            registry_to: None,
            bindings: None,
            raw_schema: None,
        };
        build_report(mode, &inputs, &events, &result).unwrap()
    }

    #[test]
    fn mode_controls_optional_sections() {
        let core = build(ReportMode::Core);
        assert!(core.paths.is_none());
        assert!(core.witnesses.is_none());
        assert!(core.content_hash.is_some());

        let full = build(ReportMode::Full);
        assert!(full.paths.is_some());
        assert!(full.witnesses.is_none());

        let all = build(ReportMode::AllDetails);
        assert!(all.paths.is_some());
        assert!(all.witnesses.is_some());
    }

    #[test]
    fn content_hash_is_reproducible_and_self_excluding() {
        let report = build(ReportMode::AllDetails);
        let stored = report.content_hash.clone().unwrap();
        assert_eq!(content_hash(&report).unwrap(), stored);

        // The hash must not depend on the stored hash itself.
        let mut stripped = report.clone();
        stripped.content_hash = None;
        assert_eq!(content_hash(&stripped).unwrap(), stored);
    }

    #[test]
    fn identical_inputs_identical_bytes() {
        let a = build(ReportMode::AllDetails);
        let b = build(ReportMode::AllDetails);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn mode_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(ReportMode::AllDetails).unwrap(),
            serde_json::json!("all-details")
        );
    }
}
