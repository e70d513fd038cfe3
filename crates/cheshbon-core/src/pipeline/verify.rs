//! Report verification.
//!
//! Given a report and the original input artifacts, re-derive every digest
//! and witness from scratch and compare. The verifier never trusts the
//! report's stored fields; anything that cannot be reproduced is a
//! mismatch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;
use crate::model::NodeId;
use crate::pipeline::diff::{build_report_for, DetailLevel, DiffRequest};
use crate::report::{content_hash, Report, ReportInputs, Witness};

/// Outcome of verifying a report against its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyOutcome {
    Ok,
    DigestMismatch { expected: String, found: String },
    WitnessMismatch { node_id: NodeId, field: String },
    InputsChanged { field: String },
}

/// Verify an all-details (or any-mode) report against the artifacts it
/// claims to describe.
pub fn verify_report(report: &Report, inputs: &ReportInputs<'_>) -> CoreResult<VerifyOutcome> {
    // 1. The inputs on disk must be the inputs the report was built from.
    let fresh = inputs.digest()?;
    let stored = &report.inputs_digest;
    for (field, expected, found) in [
        ("from_spec", Some(&fresh.from_spec), Some(&stored.from_spec)),
        ("to_spec", Some(&fresh.to_spec), Some(&stored.to_spec)),
        ("registry_v1", fresh.registry_v1.as_ref(), stored.registry_v1.as_ref()),
        ("registry_v2", fresh.registry_v2.as_ref(), stored.registry_v2.as_ref()),
        ("bindings", fresh.bindings.as_ref(), stored.bindings.as_ref()),
        ("raw_schema", fresh.raw_schema.as_ref(), stored.raw_schema.as_ref()),
    ] {
        if expected != found {
            return Ok(VerifyOutcome::InputsChanged {
                field: field.to_string(),
            });
        }
    }

    // 2. Recompute the analysis and compare witnesses field-by-field.
    let request = DiffRequest {
        from_spec: inputs.from_spec,
        to_spec: inputs.to_spec,
        registry_from: inputs.registry_from,
        registry_to: inputs.registry_to,
        bindings: inputs.bindings,
        raw_schema: inputs.raw_schema,
        detail: DetailLevel::Full,
    };
    let rebuilt = build_report_for(&request, report.mode)?;

    if let Some(mismatch) = compare_witnesses(rebuilt.witnesses.as_deref(), report.witnesses.as_deref())
    {
        return Ok(mismatch);
    }

    // 3. The stored content hash must match the stored body.
    let over_body = content_hash(report)?;
    let stored_hash = report.content_hash.clone().unwrap_or_default();
    if over_body != stored_hash {
        return Ok(VerifyOutcome::DigestMismatch {
            expected: over_body,
            found: stored_hash,
        });
    }

    // 4. The stored body must match the recomputed body.
    let expected_hash = content_hash(&rebuilt)?;
    if expected_hash != over_body {
        return Ok(VerifyOutcome::DigestMismatch {
            expected: expected_hash,
            found: over_body,
        });
    }

    Ok(VerifyOutcome::Ok)
}

fn compare_witnesses(
    expected: Option<&[Witness]>,
    found: Option<&[Witness]>,
) -> Option<VerifyOutcome> {
    let (expected, found) = match (expected, found) {
        (None, None) => return None,
        (Some(e), Some(f)) => (e, f),
        // One side has a witness section the other lacks; the body digest
        // comparison reports it.
        _ => return None,
    };

    let by_id = |ws: &[Witness]| -> BTreeMap<NodeId, Witness> {
        ws.iter().map(|w| (w.id.clone(), w.clone())).collect()
    };
    let exp = by_id(expected);
    let fnd = by_id(found);

    for (id, e) in &exp {
        let Some(f) = fnd.get(id) else {
            return Some(VerifyOutcome::WitnessMismatch {
                node_id: id.clone(),
                field: "witness".to_string(),
            });
        };
        for (field, matches) in [
            ("primary_reason", e.primary_reason == f.primary_reason),
            ("all_reasons", e.all_reasons == f.all_reasons),
            ("path", e.path == f.path),
            ("alt_path_count", e.alt_path_count == f.alt_path_count),
            ("source_events", e.source_events == f.source_events),
        ] {
            if !matches {
                return Some(VerifyOutcome::WitnessMismatch {
                    node_id: id.clone(),
                    field: field.to_string(),
                });
            }
        }
    }
    for id in fnd.keys() {
        if !exp.contains_key(id) {
            return Some(VerifyOutcome::WitnessMismatch {
                node_id: id.clone(),
                field: "witness".to_string(),
            });
        }
    }
    None
}
