//! Diff orchestration: two spec versions in, impacted set out.

use serde::{Deserialize, Serialize};

use crate::binding::{evaluate_bindings, BindingReport};
use crate::diff as diff_engine;
use crate::diff::ChangeEvent;
use crate::errors::{CoreResult, GraphError};
use crate::graph::DependencyGraph;
use crate::impact::{compute_impact, ImpactInputs, ImpactResult};
use crate::model::{
    validate_registry, validate_spec, Bindings, MappingSpec, RawSchema, TransformRegistry,
};
use crate::report::{build_report, Report, ReportInputs, ReportMode};

/// How much derivation detail the caller wants.
///
/// `Core` skips path computation; `Full` adds the canonical shortest path
/// and alternative-path count per impacted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Core,
    Full,
}

/// Inputs to a diff call. Registries and the binding layer are optional;
/// bindings are evaluated only when both `bindings` and `raw_schema` are
/// supplied.
#[derive(Debug, Clone, Copy)]
pub struct DiffRequest<'a> {
    pub from_spec: &'a MappingSpec,
    pub to_spec: &'a MappingSpec,
    pub registry_from: Option<&'a TransformRegistry>,
    pub registry_to: Option<&'a TransformRegistry>,
    pub bindings: Option<&'a Bindings>,
    pub raw_schema: Option<&'a RawSchema>,
    pub detail: DetailLevel,
}

impl<'a> DiffRequest<'a> {
    pub fn new(from_spec: &'a MappingSpec, to_spec: &'a MappingSpec) -> Self {
        Self {
            from_spec,
            to_spec,
            registry_from: None,
            registry_to: None,
            bindings: None,
            raw_schema: None,
            detail: DetailLevel::Core,
        }
    }

    fn report_inputs(&self) -> ReportInputs<'a> {
        ReportInputs {
            from_spec: self.from_spec,
            to_spec: self.to_spec,
            registry_from: self.registry_from,
            registry_to: self.registry_to,
            bindings: self.bindings,
            raw_schema: self.raw_schema,
        }
    }
}

/// The full outcome of one diff call.
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    /// Ordered change events.
    pub events: Vec<ChangeEvent>,
    pub impact: ImpactResult,
    /// Cycles found in the target spec's graph; reported, never fatal.
    pub cycles: Vec<GraphError>,
    /// Binding evaluation, when the binding layer was supplied.
    pub binding_report: Option<BindingReport>,
}

impl DiffOutcome {
    /// Exit-code semantics: 0 no impact, 1 impact, 2 validation failed.
    pub fn exit_code(&self) -> i32 {
        if self.impact.validation_failed {
            2
        } else if self.impact.impacted.is_empty() {
            0
        } else {
            1
        }
    }
}

/// Diff two spec versions and compute structural impact.
pub fn diff(request: &DiffRequest<'_>) -> CoreResult<DiffOutcome> {
    run(request, request.detail == DetailLevel::Full)
}

/// Diff with paths forced on and assemble a report in the given mode.
pub fn build_report_for(request: &DiffRequest<'_>, mode: ReportMode) -> CoreResult<Report> {
    let outcome = run(request, true)?;
    build_report(mode, &request.report_inputs(), &outcome.events, &outcome.impact)
}

fn run(request: &DiffRequest<'_>, with_paths: bool) -> CoreResult<DiffOutcome> {
    let from = validate_spec(request.from_spec)?;
    let to = validate_spec(request.to_spec)?;
    if let Some(r) = request.registry_from {
        validate_registry(r)?;
    }
    if let Some(r) = request.registry_to {
        validate_registry(r)?;
    }

    let events = diff_engine::diff(&from, &to, request.registry_from, request.registry_to);

    let graph = DependencyGraph::from_spec(&to);
    let cycles = graph
        .cycles()
        .iter()
        .map(|nodes| GraphError::CycleDetected {
            nodes: nodes.clone(),
        })
        .collect();

    let binding_report = match (request.bindings, request.raw_schema) {
        (Some(b), Some(s)) => Some(evaluate_bindings(&to, s, b)),
        _ => None,
    };

    let impact = compute_impact(ImpactInputs {
        events: &events,
        graph: &graph,
        to_spec: &to,
        registry_to: request.registry_to,
        binding_report: binding_report.as_ref(),
        with_paths,
    });

    Ok(DiffOutcome {
        events,
        impact,
        cycles,
        binding_report,
    })
}
