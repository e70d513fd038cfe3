//! Public-surface boundary test.
//!
//! The prelude is the enumerated public API. This test touches every item
//! so that removing or renaming one is a compile failure here rather than a
//! surprise for downstream callers.

#![allow(unused_imports)]

use cheshbon_core::prelude::{
    build_report, build_report_for, canonical_eq, canonical_json_bytes, canonical_json_from_slice,
    canonical_json_value, content_hash, diff, evaluate_bindings, hash_artifact_hex,
    hash_canonical_value_hex, sha256_hex, sort_set_array, validate, validate_registry,
    validate_spec, verify_report, BindingError, BindingReport, BindingStatus, Bindings,
    CanonicalizationError, ChangeEvent, Constraint, CoreError, CoreResult, DependencyGraph,
    DerivedVariable, DetailLevel, DiffOutcome, DiffRequest, EdgeKind, Finding, FindingLevel,
    GraphError, HashAlg, HistoryEntry, ImpactResult, ImplFingerprint, InputsDigest,
    InvalidBinding, MappingSpec, NodeId, NodeKind, NodeReasons, RawColumn, RawSchema, ReasonCode,
    RegistryValidationError, Report, ReportInputs, ReportMode, SourceColumn, SpecValidationError,
    SpecWarning, TransformEntry, TransformHistory, TransformRegistry, ValidateRequest,
    ValidatedSpec, ValidationReport, VerifyError, VerifyOutcome, Witness, REGISTRY_VERSION,
    REPORT_SCHEMA_VERSION, SPEC_SCHEMA_VERSION,
};

#[test]
fn contract_constants_are_fixed() {
    assert_eq!(SPEC_SCHEMA_VERSION, "0.7");
    assert_eq!(REGISTRY_VERSION, "1.0.0");
    assert_eq!(REPORT_SCHEMA_VERSION, "1.0");
    assert_eq!(cheshbon_core::limits::PARAMS_WARN_BYTES, 10 * 1024);
    assert_eq!(cheshbon_core::limits::PARAMS_MAX_BYTES, 50 * 1024);
    assert_eq!(cheshbon_core::limits::ALT_PATH_LIMIT, 10);
    assert_eq!(cheshbon_core::limits::ALT_PATH_SLACK, 10);
}
