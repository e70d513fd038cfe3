//! Impact propagation.
//!
//! Combines the event stream, the dependency graph, the binding report, and
//! the registry into a deterministic impacted set with typed reasons.
//!
//! Seeding:
//! - structural `DERIVED_*` change events seed the derived variable itself
//!   with `DIRECT_CHANGE`
//! - structural `CONSTRAINT_*` change events seed the constraint's direct
//!   dependents with `TRANSITIVE_DEPENDENCY`
//! - removals seed the removed node's direct dependents with
//!   `MISSING_INPUT`
//! - `TRANSFORM_IMPL_CHANGED` seeds every derived variable referencing the
//!   transform with `TRANSFORM_IMPL_CHANGED`
//! - a referenced transform absent from the target registry seeds the
//!   referencing derived with `MISSING_TRANSFORM_REF` and forces
//!   `validation_failed`
//! - binding statuses seed dependents with `MISSING_BINDING` or
//!   `AMBIGUOUS_BINDING`; ambiguous forces `validation_failed`
//!
//! Propagation marks all transitive dependents with
//! `TRANSITIVE_DEPENDENCY`. A node carries every reason that applies; the
//! primary reason is the highest-precedence one. When a node both changed
//! directly and lost an input, the two reasons fold into
//! `DIRECT_CHANGE_MISSING_INPUT`.
//!
//! Cycle members are treated as one connected component: when any member is
//! impacted, every member is marked with reason `CYCLE` and propagation
//! continues from the whole component.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::binding::{BindingReport, BindingStatus};
use crate::diff::ChangeEvent;
use crate::graph::DependencyGraph;
use crate::model::{NodeId, TransformRegistry, ValidatedSpec};

/// Why a node is impacted.
///
/// Declaration order is precedence order, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    AmbiguousBinding,
    MissingTransformRef,
    MissingBinding,
    MissingInput,
    DirectChangeMissingInput,
    DirectChange,
    TransformImplChanged,
    Cycle,
    TransitiveDependency,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::AmbiguousBinding => "AMBIGUOUS_BINDING",
            ReasonCode::MissingTransformRef => "MISSING_TRANSFORM_REF",
            ReasonCode::MissingBinding => "MISSING_BINDING",
            ReasonCode::MissingInput => "MISSING_INPUT",
            ReasonCode::DirectChangeMissingInput => "DIRECT_CHANGE_MISSING_INPUT",
            ReasonCode::DirectChange => "DIRECT_CHANGE",
            ReasonCode::TransformImplChanged => "TRANSFORM_IMPL_CHANGED",
            ReasonCode::Cycle => "CYCLE",
            ReasonCode::TransitiveDependency => "TRANSITIVE_DEPENDENCY",
        }
    }
}

/// The reasons recorded for one impacted node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReasons {
    /// Highest-precedence reason.
    pub primary: ReasonCode,
    /// Primary first, remaining reasons sorted lexicographically by name.
    pub all: Vec<ReasonCode>,
    /// Supporting evidence: event ids plus `binding:`/`registry:` markers,
    /// sorted.
    pub evidence: Vec<String>,
}

/// Deterministic result of an impact computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactResult {
    /// Impacted node ids, ascending.
    pub impacted: Vec<NodeId>,
    /// Declared-but-unimpacted node ids, ascending.
    pub unaffected: Vec<NodeId>,
    pub reasons: BTreeMap<NodeId, NodeReasons>,
    /// Canonical shortest path from the nearest seed, per impacted node.
    /// Empty unless paths were requested.
    pub paths: BTreeMap<NodeId, Vec<NodeId>>,
    /// Count of alternative paths within the enumeration bound, per
    /// impacted node. Empty unless paths were requested.
    pub alt_path_counts: BTreeMap<NodeId, usize>,
    pub validation_failed: bool,
}

/// Everything the impact engine consumes.
pub struct ImpactInputs<'a> {
    pub events: &'a [ChangeEvent],
    pub graph: &'a DependencyGraph,
    pub to_spec: &'a ValidatedSpec,
    pub registry_to: Option<&'a TransformRegistry>,
    pub binding_report: Option<&'a BindingReport>,
    /// Compute per-node paths and alternative-path counts.
    pub with_paths: bool,
}

#[derive(Default)]
struct Accumulator {
    reasons: BTreeMap<NodeId, BTreeSet<ReasonCode>>,
    evidence: BTreeMap<NodeId, BTreeSet<String>>,
    seeds: BTreeSet<NodeId>,
}

impl Accumulator {
    fn seed(&mut self, node: &NodeId, reason: ReasonCode, evidence: String) {
        self.seeds.insert(node.clone());
        self.mark(node, reason, evidence);
    }

    fn mark(&mut self, node: &NodeId, reason: ReasonCode, evidence: String) {
        self.reasons.entry(node.clone()).or_default().insert(reason);
        self.evidence.entry(node.clone()).or_default().insert(evidence);
    }
}

/// Compute the impacted set.
pub fn compute_impact(inputs: ImpactInputs<'_>) -> ImpactResult {
    let mut acc = Accumulator::default();
    let mut validation_failed = false;

    seed_from_events(&mut acc, &mut validation_failed, &inputs);
    seed_from_registry(&mut acc, &mut validation_failed, &inputs);
    seed_from_bindings(&mut acc, &mut validation_failed, &inputs);

    propagate(&mut acc, inputs.graph);
    fold_combined_reasons(&mut acc);

    let impacted: Vec<NodeId> = acc.reasons.keys().cloned().collect();
    let impacted_set: BTreeSet<NodeId> = impacted.iter().cloned().collect();
    let unaffected: Vec<NodeId> = inputs
        .to_spec
        .spec
        .declared_ids()
        .into_iter()
        .filter(|id| !impacted_set.contains(id))
        .collect();

    let mut reasons = BTreeMap::new();
    for (node, set) in &acc.reasons {
        let primary = *set.iter().min().unwrap_or(&ReasonCode::TransitiveDependency);
        let mut rest: Vec<ReasonCode> = set.iter().copied().filter(|r| *r != primary).collect();
        rest.sort_by_key(|r| r.as_str());
        let mut all = vec![primary];
        all.extend(rest);
        reasons.insert(
            node.clone(),
            NodeReasons {
                primary,
                all,
                evidence: acc.evidence[node].iter().cloned().collect(),
            },
        );
    }

    let (paths, alt_path_counts) = if inputs.with_paths {
        compute_paths(&acc.seeds, &impacted, inputs.graph)
    } else {
        (BTreeMap::new(), BTreeMap::new())
    };

    ImpactResult {
        impacted,
        unaffected,
        reasons,
        paths,
        alt_path_counts,
        validation_failed,
    }
}

fn seed_from_events(
    acc: &mut Accumulator,
    validation_failed: &mut bool,
    inputs: &ImpactInputs<'_>,
) {
    use ChangeEvent::*;
    for event in inputs.events {
        let evid = event.event_id();
        match event {
            DerivedInputsChanged { element_id, .. }
            | DerivedTransformRefChanged { element_id, .. }
            | DerivedTransformParamsChanged { element_id, .. }
            | DerivedTypeChanged { element_id, .. } => {
                acc.seed(element_id, ReasonCode::DirectChange, evid);
            }
            ConstraintInputsChanged { element_id, .. }
            | ConstraintExpressionChanged { element_id } => {
                for dep in inputs.graph.direct_dependents(element_id) {
                    acc.seed(&dep, ReasonCode::TransitiveDependency, evid.clone());
                }
            }
            SourceRemoved { element_id }
            | DerivedRemoved { element_id }
            | ConstraintRemoved { element_id } => {
                for dep in inputs.graph.direct_dependents(element_id) {
                    acc.seed(&dep, ReasonCode::MissingInput, evid.clone());
                }
            }
            TransformImplChanged { element_id, .. } => {
                for d in referencing_deriveds(inputs.to_spec, element_id) {
                    acc.seed(&d, ReasonCode::TransformImplChanged, evid.clone());
                }
            }
            TransformRemoved { element_id } => {
                for d in referencing_deriveds(inputs.to_spec, element_id) {
                    acc.seed(&d, ReasonCode::MissingTransformRef, evid.clone());
                    *validation_failed = true;
                }
            }
            // Additions and renames never seed impact.
            SourceAdded { .. } | DerivedAdded { .. } | ConstraintAdded { .. }
            | TransformAdded { .. } | SourceRenamed { .. } | DerivedRenamed { .. }
            | ConstraintRenamed { .. } => {}
        }
    }
}

fn referencing_deriveds(spec: &ValidatedSpec, transform: &NodeId) -> Vec<NodeId> {
    spec.spec
        .derived
        .iter()
        .filter(|d| d.transform_ref.as_ref() == Some(transform))
        .map(|d| d.id.clone())
        .collect()
}

fn seed_from_registry(
    acc: &mut Accumulator,
    validation_failed: &mut bool,
    inputs: &ImpactInputs<'_>,
) {
    let Some(registry) = inputs.registry_to else {
        return;
    };
    let known = registry.ids();
    for d in &inputs.to_spec.spec.derived {
        if let Some(t) = &d.transform_ref {
            if !known.contains(t) {
                acc.seed(&d.id, ReasonCode::MissingTransformRef, format!("registry:{t}"));
                *validation_failed = true;
            }
        }
    }
}

fn seed_from_bindings(
    acc: &mut Accumulator,
    validation_failed: &mut bool,
    inputs: &ImpactInputs<'_>,
) {
    let Some(report) = inputs.binding_report else {
        return;
    };
    for (source, status) in &report.statuses {
        match status {
            BindingStatus::Bound { .. } => {}
            BindingStatus::MissingBinding => {
                for dep in inputs.graph.direct_dependents(source) {
                    acc.seed(&dep, ReasonCode::MissingBinding, format!("binding:{source}"));
                }
            }
            BindingStatus::AmbiguousBinding { .. } => {
                // Terminal even when the source feeds nothing.
                *validation_failed = true;
                for dep in inputs.graph.direct_dependents(source) {
                    acc.seed(&dep, ReasonCode::AmbiguousBinding, format!("binding:{source}"));
                }
            }
        }
    }
}

/// Worklist propagation: evidence flows downstream and across cycle
/// components until nothing grows.
fn propagate(acc: &mut Accumulator, graph: &DependencyGraph) {
    let mut queue: VecDeque<NodeId> = acc.reasons.keys().cloned().collect();
    while let Some(node) = queue.pop_front() {
        let evidence = acc.evidence.get(&node).cloned().unwrap_or_default();

        if let Some(cycle) = graph.cycle_containing(&node) {
            for member in cycle.clone() {
                if member == node {
                    continue;
                }
                if grow(acc, &member, ReasonCode::Cycle, &evidence) {
                    queue.push_back(member);
                }
            }
        }

        for dep in graph.direct_dependents(&node) {
            if grow(acc, &dep, ReasonCode::TransitiveDependency, &evidence) {
                queue.push_back(dep);
            }
        }
    }
}

/// Add a reason and evidence to a node; true when anything was new.
fn grow(
    acc: &mut Accumulator,
    node: &NodeId,
    reason: ReasonCode,
    evidence: &BTreeSet<String>,
) -> bool {
    let r = acc.reasons.entry(node.clone()).or_default().insert(reason);
    let ev = acc.evidence.entry(node.clone()).or_default();
    let before = ev.len();
    ev.extend(evidence.iter().cloned());
    r || ev.len() > before
}

fn fold_combined_reasons(acc: &mut Accumulator) {
    for set in acc.reasons.values_mut() {
        if set.contains(&ReasonCode::DirectChange) && set.contains(&ReasonCode::MissingInput) {
            set.remove(&ReasonCode::DirectChange);
            set.remove(&ReasonCode::MissingInput);
            set.insert(ReasonCode::DirectChangeMissingInput);
        }
    }
}

fn compute_paths(
    seeds: &BTreeSet<NodeId>,
    impacted: &[NodeId],
    graph: &DependencyGraph,
) -> (BTreeMap<NodeId, Vec<NodeId>>, BTreeMap<NodeId, usize>) {
    let mut paths = BTreeMap::new();
    let mut alt_counts = BTreeMap::new();
    for node in impacted {
        let Some(path) = graph.shortest_path_from(seeds, node) else {
            // Cycle members pulled in without a graph route from any seed.
            paths.insert(node.clone(), vec![node.clone()]);
            alt_counts.insert(node.clone(), 0);
            continue;
        };
        let shortest_len = path.len() - 1;
        let seed = path[0].clone();
        let total = graph.bounded_path_count(&seed, node, shortest_len);
        paths.insert(node.clone(), path);
        alt_counts.insert(node.clone(), total.saturating_sub(1));
    }
    (paths, alt_counts)
}
