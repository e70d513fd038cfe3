//! cheshbon-core
//!
//! Deterministic, execution-free impact analysis for versioned mapping
//! specifications. Given two versions of a spec (and optionally a transform
//! registry and binding layer), it answers: which derived outputs are
//! structurally impacted by the change, by which dependency path, and for
//! which reason. No transforms are executed; no data is read.
//!
//! Subsystems:
//! - canonical JSON serialization and SHA-256 hashing
//! - typed models for specs, registries, and bindings, with validators
//! - structural diff to an ordered change-event stream
//! - dependency graph with cycle detection and bounded path enumeration
//! - impact propagation with typed, precedence-ordered reasons
//! - witnessed report construction and verification
//!
//! Determinism contract:
//! - the crate performs no filesystem, network, clock, or environment
//!   access; callers pass in-memory artifacts
//! - every returned collection is explicitly ordered; native container
//!   iteration order never leaks into output
//! - identical inputs produce byte-identical outputs across processes and
//!   machines

pub mod binding;
pub mod canonical;
pub mod diff;
pub mod errors;
pub mod graph;
pub mod hash;
pub mod impact;
pub mod model;
pub mod pipeline;
pub mod report;

pub use crate::errors::{CoreError, CoreResult};

/// Hard caps that are part of the semantic contract, not tuning knobs.
pub mod limits {
    /// Params size above which validation records a warning.
    pub const PARAMS_WARN_BYTES: usize = 10 * 1024;
    /// Hard limit on canonical params size.
    pub const PARAMS_MAX_BYTES: usize = 50 * 1024;
    /// Maximum number of paths counted per impacted node.
    pub const ALT_PATH_LIMIT: usize = 10;
    /// Alternative paths may exceed the shortest length by this much.
    pub const ALT_PATH_SLACK: usize = 10;
}

/// The enumerated public surface. Everything a caller needs is exported
/// here; there are no wildcard re-exports.
pub mod prelude {
    pub use crate::binding::{
        evaluate_bindings, BindingReport, BindingStatus, InvalidBinding,
    };
    pub use crate::canonical::{
        canonical_eq, canonical_json_bytes, canonical_json_from_slice, canonical_json_value,
        sort_set_array,
    };
    pub use crate::diff::ChangeEvent;
    pub use crate::errors::{
        BindingError, CanonicalizationError, CoreError, CoreResult, GraphError,
        RegistryValidationError, SpecValidationError, VerifyError,
    };
    pub use crate::graph::{DependencyGraph, EdgeKind};
    pub use crate::hash::{hash_artifact_hex, hash_canonical_value_hex, sha256_hex, HashAlg};
    pub use crate::impact::{ImpactResult, NodeReasons, ReasonCode};
    pub use crate::model::{
        validate_registry, validate_spec, Bindings, Constraint, DerivedVariable, HistoryEntry,
        ImplFingerprint, MappingSpec, NodeId, NodeKind, RawColumn, RawSchema, SourceColumn,
        SpecWarning, TransformEntry, TransformHistory, TransformRegistry, ValidatedSpec,
        REGISTRY_VERSION, SPEC_SCHEMA_VERSION,
    };
    pub use crate::pipeline::{
        build_report_for, diff, validate, verify_report, DetailLevel, DiffOutcome, DiffRequest,
        Finding, FindingLevel, ValidateRequest, ValidationReport, VerifyOutcome,
    };
    pub use crate::report::{
        build_report, content_hash, InputsDigest, Report, ReportInputs, ReportMode, Witness,
        REPORT_SCHEMA_VERSION,
    };
}
