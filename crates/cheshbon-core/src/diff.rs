//! Structural diff engine.
//!
//! Reduces two spec versions (and optionally two registry versions) to a
//! normalized, ordered stream of change events drawn from a closed ontology.
//!
//! Semantic rules:
//! - renames (same id, different display name) emit only rename events,
//!   which never cause impact
//! - input lists are compared as sets; reordering alone produces no event
//! - params comparison is digest-based (canonical JSON of `params`)
//! - `TRANSFORM_IMPL_CHANGED` triggers only on a fingerprint digest change;
//!   `ref` churn alone is not a change
//!
//! Events are totally ordered by `(element_id, kind_priority)` with a fixed
//! per-kind priority: removed < added < changed-structural <
//! changed-metadata.

use std::collections::BTreeMap;

use itertools::{EitherOrBoth, Itertools};
use serde::{Deserialize, Serialize};

use crate::model::{NodeId, TransformRegistry, ValidatedSpec};

/// A single structural delta between two artifact versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEvent {
    SourceAdded { element_id: NodeId },
    SourceRemoved { element_id: NodeId },
    SourceRenamed { element_id: NodeId, old: String, new: String },

    DerivedAdded { element_id: NodeId },
    DerivedRemoved { element_id: NodeId },
    DerivedRenamed { element_id: NodeId, old: String, new: String },
    DerivedInputsChanged { element_id: NodeId, old: Vec<NodeId>, new: Vec<NodeId> },
    DerivedTransformRefChanged {
        element_id: NodeId,
        old: Option<NodeId>,
        new: Option<NodeId>,
    },
    DerivedTransformParamsChanged {
        element_id: NodeId,
        old_params_hash: String,
        new_params_hash: String,
    },
    DerivedTypeChanged { element_id: NodeId, old: String, new: String },

    ConstraintAdded { element_id: NodeId },
    ConstraintRemoved { element_id: NodeId },
    ConstraintRenamed { element_id: NodeId, old: String, new: String },
    ConstraintInputsChanged { element_id: NodeId, old: Vec<NodeId>, new: Vec<NodeId> },
    ConstraintExpressionChanged { element_id: NodeId },

    TransformAdded { element_id: NodeId },
    TransformRemoved { element_id: NodeId },
    TransformImplChanged {
        element_id: NodeId,
        old_digest: String,
        new_digest: String,
    },
}

impl ChangeEvent {
    pub fn element_id(&self) -> &NodeId {
        use ChangeEvent::*;
        match self {
            SourceAdded { element_id }
            | SourceRemoved { element_id }
            | SourceRenamed { element_id, .. }
            | DerivedAdded { element_id }
            | DerivedRemoved { element_id }
            | DerivedRenamed { element_id, .. }
            | DerivedInputsChanged { element_id, .. }
            | DerivedTransformRefChanged { element_id, .. }
            | DerivedTransformParamsChanged { element_id, .. }
            | DerivedTypeChanged { element_id, .. }
            | ConstraintAdded { element_id }
            | ConstraintRemoved { element_id }
            | ConstraintRenamed { element_id, .. }
            | ConstraintInputsChanged { element_id, .. }
            | ConstraintExpressionChanged { element_id }
            | TransformAdded { element_id }
            | TransformRemoved { element_id }
            | TransformImplChanged { element_id, .. } => element_id,
        }
    }

    /// Stable event kind name, identical to the serialized `kind` tag.
    pub fn kind_name(&self) -> &'static str {
        use ChangeEvent::*;
        match self {
            SourceAdded { .. } => "SOURCE_ADDED",
            SourceRemoved { .. } => "SOURCE_REMOVED",
            SourceRenamed { .. } => "SOURCE_RENAMED",
            DerivedAdded { .. } => "DERIVED_ADDED",
            DerivedRemoved { .. } => "DERIVED_REMOVED",
            DerivedRenamed { .. } => "DERIVED_RENAMED",
            DerivedInputsChanged { .. } => "DERIVED_INPUTS_CHANGED",
            DerivedTransformRefChanged { .. } => "DERIVED_TRANSFORM_REF_CHANGED",
            DerivedTransformParamsChanged { .. } => "DERIVED_TRANSFORM_PARAMS_CHANGED",
            DerivedTypeChanged { .. } => "DERIVED_TYPE_CHANGED",
            ConstraintAdded { .. } => "CONSTRAINT_ADDED",
            ConstraintRemoved { .. } => "CONSTRAINT_REMOVED",
            ConstraintRenamed { .. } => "CONSTRAINT_RENAMED",
            ConstraintInputsChanged { .. } => "CONSTRAINT_INPUTS_CHANGED",
            ConstraintExpressionChanged { .. } => "CONSTRAINT_EXPRESSION_CHANGED",
            TransformAdded { .. } => "TRANSFORM_ADDED",
            TransformRemoved { .. } => "TRANSFORM_REMOVED",
            TransformImplChanged { .. } => "TRANSFORM_IMPL_CHANGED",
        }
    }

    /// Fixed ordering class: removed < added < changed-structural <
    /// changed-metadata.
    pub fn kind_priority(&self) -> u8 {
        use ChangeEvent::*;
        match self {
            SourceRemoved { .. }
            | DerivedRemoved { .. }
            | ConstraintRemoved { .. }
            | TransformRemoved { .. } => 0,
            SourceAdded { .. }
            | DerivedAdded { .. }
            | ConstraintAdded { .. }
            | TransformAdded { .. } => 1,
            DerivedInputsChanged { .. }
            | DerivedTransformRefChanged { .. }
            | DerivedTransformParamsChanged { .. }
            | DerivedTypeChanged { .. }
            | ConstraintInputsChanged { .. }
            | ConstraintExpressionChanged { .. }
            | TransformImplChanged { .. } => 2,
            SourceRenamed { .. } | DerivedRenamed { .. } | ConstraintRenamed { .. } => 3,
        }
    }

    /// Stable identifier used by report witnesses.
    pub fn event_id(&self) -> String {
        format!("{}:{}", self.kind_name(), self.element_id())
    }
}

/// Diff two validated specs and optionally two registries.
///
/// The returned events are sorted by `(element_id, kind_priority)`.
pub fn diff(
    from: &ValidatedSpec,
    to: &ValidatedSpec,
    registry_from: Option<&TransformRegistry>,
    registry_to: Option<&TransformRegistry>,
) -> Vec<ChangeEvent> {
    let mut events = diff_specs(from, to);
    events.extend(diff_registries(registry_from, registry_to));
    sort_events(&mut events);
    events
}

pub(crate) fn sort_events(events: &mut [ChangeEvent]) {
    events.sort_by(|a, b| {
        (a.element_id(), a.kind_priority()).cmp(&(b.element_id(), b.kind_priority()))
    });
}

fn diff_specs(from: &ValidatedSpec, to: &ValidatedSpec) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    let s1: BTreeMap<&NodeId, &crate::model::SourceColumn> =
        from.spec.sources.iter().map(|s| (&s.id, s)).collect();
    let s2: BTreeMap<&NodeId, &crate::model::SourceColumn> =
        to.spec.sources.iter().map(|s| (&s.id, s)).collect();
    for pair in s1.iter().merge_join_by(s2.iter(), |a, b| a.0.cmp(b.0)) {
        match pair {
            EitherOrBoth::Left((id, _)) => events.push(ChangeEvent::SourceRemoved {
                element_id: (*id).clone(),
            }),
            EitherOrBoth::Right((id, _)) => events.push(ChangeEvent::SourceAdded {
                element_id: (*id).clone(),
            }),
            EitherOrBoth::Both((id, a), (_, b)) => {
                if a.name != b.name {
                    events.push(ChangeEvent::SourceRenamed {
                        element_id: (*id).clone(),
                        old: a.name.clone(),
                        new: b.name.clone(),
                    });
                }
            }
        }
    }

    let d1: BTreeMap<&NodeId, &crate::model::DerivedVariable> =
        from.spec.derived.iter().map(|d| (&d.id, d)).collect();
    let d2: BTreeMap<&NodeId, &crate::model::DerivedVariable> =
        to.spec.derived.iter().map(|d| (&d.id, d)).collect();
    for pair in d1.iter().merge_join_by(d2.iter(), |a, b| a.0.cmp(b.0)) {
        match pair {
            EitherOrBoth::Left((id, _)) => events.push(ChangeEvent::DerivedRemoved {
                element_id: (*id).clone(),
            }),
            EitherOrBoth::Right((id, _)) => events.push(ChangeEvent::DerivedAdded {
                element_id: (*id).clone(),
            }),
            EitherOrBoth::Both((id, a), (_, b)) => {
                let id = (*id).clone();
                if a.name != b.name {
                    events.push(ChangeEvent::DerivedRenamed {
                        element_id: id.clone(),
                        old: a.name.clone(),
                        new: b.name.clone(),
                    });
                }
                let (ins_a, ins_b) = (a.input_set(), b.input_set());
                if ins_a != ins_b {
                    events.push(ChangeEvent::DerivedInputsChanged {
                        element_id: id.clone(),
                        old: ins_a.into_iter().collect(),
                        new: ins_b.into_iter().collect(),
                    });
                }
                if a.transform_ref != b.transform_ref {
                    events.push(ChangeEvent::DerivedTransformRefChanged {
                        element_id: id.clone(),
                        old: a.transform_ref.clone(),
                        new: b.transform_ref.clone(),
                    });
                }
                let (ha, hb) = (&from.params_hash[&id], &to.params_hash[&id]);
                if ha != hb {
                    events.push(ChangeEvent::DerivedTransformParamsChanged {
                        element_id: id.clone(),
                        old_params_hash: ha.clone(),
                        new_params_hash: hb.clone(),
                    });
                }
                if a.ty != b.ty {
                    events.push(ChangeEvent::DerivedTypeChanged {
                        element_id: id,
                        old: a.ty.clone(),
                        new: b.ty.clone(),
                    });
                }
            }
        }
    }

    let c1: BTreeMap<&NodeId, &crate::model::Constraint> =
        from.spec.constraints.iter().map(|c| (&c.id, c)).collect();
    let c2: BTreeMap<&NodeId, &crate::model::Constraint> =
        to.spec.constraints.iter().map(|c| (&c.id, c)).collect();
    for pair in c1.iter().merge_join_by(c2.iter(), |a, b| a.0.cmp(b.0)) {
        match pair {
            EitherOrBoth::Left((id, _)) => events.push(ChangeEvent::ConstraintRemoved {
                element_id: (*id).clone(),
            }),
            EitherOrBoth::Right((id, _)) => events.push(ChangeEvent::ConstraintAdded {
                element_id: (*id).clone(),
            }),
            EitherOrBoth::Both((id, a), (_, b)) => {
                let id = (*id).clone();
                if a.name != b.name {
                    events.push(ChangeEvent::ConstraintRenamed {
                        element_id: id.clone(),
                        old: a.name.clone(),
                        new: b.name.clone(),
                    });
                }
                let (ins_a, ins_b) = (a.input_set(), b.input_set());
                if ins_a != ins_b {
                    events.push(ChangeEvent::ConstraintInputsChanged {
                        element_id: id.clone(),
                        old: ins_a.into_iter().collect(),
                        new: ins_b.into_iter().collect(),
                    });
                }
                if a.expression != b.expression {
                    events.push(ChangeEvent::ConstraintExpressionChanged { element_id: id });
                }
            }
        }
    }

    events
}

fn diff_registries(
    from: Option<&TransformRegistry>,
    to: Option<&TransformRegistry>,
) -> Vec<ChangeEvent> {
    let (from, to) = match (from, to) {
        (None, None) => return Vec::new(),
        _ => (from, to),
    };

    let empty: BTreeMap<&NodeId, &crate::model::TransformEntry> = BTreeMap::new();
    let t1: BTreeMap<&NodeId, &crate::model::TransformEntry> = from
        .map(|r| r.transforms.iter().map(|t| (&t.id, t)).collect())
        .unwrap_or(empty.clone());
    let t2: BTreeMap<&NodeId, &crate::model::TransformEntry> = to
        .map(|r| r.transforms.iter().map(|t| (&t.id, t)).collect())
        .unwrap_or(empty);

    let mut events = Vec::new();
    for pair in t1.iter().merge_join_by(t2.iter(), |a, b| a.0.cmp(b.0)) {
        match pair {
            EitherOrBoth::Left((id, _)) => events.push(ChangeEvent::TransformRemoved {
                element_id: (*id).clone(),
            }),
            EitherOrBoth::Right((id, _)) => events.push(ChangeEvent::TransformAdded {
                element_id: (*id).clone(),
            }),
            EitherOrBoth::Both((id, a), (_, b)) => {
                if a.impl_fingerprint.digest != b.impl_fingerprint.digest {
                    events.push(ChangeEvent::TransformImplChanged {
                        element_id: (*id).clone(),
                        old_digest: a.impl_fingerprint.digest.clone(),
                        new_digest: b.impl_fingerprint.digest.clone(),
                    });
                }
            }
        }
    }
    events
}
