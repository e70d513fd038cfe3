//! Error types for cheshbon-core.
//!
//! Errors are structured, explicit, and stable. Each subsystem owns a small
//! error enum whose variants form a closed taxonomy; `CoreError` is the
//! umbrella type returned by the public entry points.
//!
//! Propagation policy:
//! - canonicalization and artifact validation errors terminate the call
//! - detected cycles are reported but impact computation continues
//! - ambiguous bindings and missing transform references are surfaced as
//!   data inside `ImpactResult` (with `validation_failed = true`), never as
//!   errors

use thiserror::Error;

use crate::model::NodeId;

/// Result type used throughout cheshbon-core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Canonical JSON rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalizationError {
    /// Floating-point values are forbidden in canonical JSON. Callers must
    /// encode decimals as strings.
    #[error("canonicalization error: floating-point value forbidden at {path}")]
    FloatForbidden { path: String },

    /// The value contains something that has no canonical JSON form.
    #[error("canonicalization error: non-JSON type at {path}: {message}")]
    NonJsonType { path: String, message: String },

    /// Input bytes were not valid UTF-8.
    #[error("canonicalization error: invalid UTF-8: {message}")]
    InvalidUtf8 { message: String },
}

/// Structural validation failure on a mapping spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecValidationError {
    /// An identifier does not match `<kind>:<name>` with kind in `s d c t`.
    #[error("spec validation error: invalid id format: {id}")]
    InvalidIdFormat { id: String },

    /// Two entities of the same kind share an id.
    #[error("spec validation error: duplicate id: {id}")]
    DuplicateId { id: NodeId },

    /// An input reference does not resolve to a declared entity.
    #[error("spec validation error: unresolved reference {reference} in {owner}")]
    UnresolvedReference { owner: NodeId, reference: NodeId },

    /// Transform params exceed the hard size limit.
    #[error("spec validation error: params of {id} are {size} bytes (limit {limit})")]
    ParamsTooLarge { id: NodeId, size: usize, limit: usize },

    /// Transform params could not be canonicalized.
    #[error("spec validation error: params of {id} are not canonicalizable: {source}")]
    ParamsNotCanonical {
        id: NodeId,
        #[source]
        source: CanonicalizationError,
    },

    /// An implementation fingerprint carries an absolute path.
    #[error("spec validation error: absolute impl ref on {id}: {reference}")]
    AbsoluteImplRef { id: NodeId, reference: String },
}

/// Structural validation failure on a transform registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryValidationError {
    /// Two registry entries share a transform id.
    #[error("registry validation error: duplicate transform id: {id}")]
    DuplicateTransformId { id: NodeId },

    /// A surviving derived variable references a transform the registry does
    /// not contain.
    #[error("registry validation error: missing transform {transform} referenced by {derived}")]
    MissingTransformRef { derived: NodeId, transform: NodeId },
}

/// Dependency graph failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A dependency cycle was found. The participating nodes are reported;
    /// impact computation continues on the non-cyclic subgraph.
    #[error("graph error: cycle detected through {}", nodes.iter().map(NodeId::as_str).collect::<Vec<_>>().join(" -> "))]
    CycleDetected { nodes: Vec<NodeId> },
}

/// Binding layer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// More than one raw column maps to the same source id.
    #[error("binding error: ambiguous binding for {source}: raw columns {}", raw_columns.join(", "))]
    AmbiguousBinding {
        source: NodeId,
        raw_columns: Vec<String>,
    },

    /// A binding names a raw column the schema does not contain.
    #[error("binding error: raw column {raw_column} bound to {source} is not in the schema")]
    InvalidBinding { source: NodeId, raw_column: String },
}

/// Report verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("verify error: content digest mismatch (expected {expected}, found {found})")]
    DigestMismatch { expected: String, found: String },

    #[error("verify error: witness mismatch on {node_id} field {field}")]
    WitnessMismatch { node_id: NodeId, field: String },

    #[error("verify error: inputs changed: {field}")]
    InputsChanged { field: String },
}

/// Top-level error type for cheshbon-core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    #[error(transparent)]
    SpecValidation(#[from] SpecValidationError),

    #[error(transparent)]
    RegistryValidation(#[from] RegistryValidationError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// Serialization or deserialization failure at the artifact boundary.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl CoreError {
    /// Construct a serialization error.
    pub fn serialization<M: Into<String>>(message: M) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_float_forbidden() {
        let e = CanonicalizationError::FloatForbidden {
            path: "params.map".to_string(),
        };
        assert_eq!(
            format!("{e}"),
            "canonicalization error: floating-point value forbidden at params.map"
        );
    }

    #[test]
    fn display_cycle() {
        let e = GraphError::CycleDetected {
            nodes: vec![
                NodeId::parse("d:A").unwrap(),
                NodeId::parse("d:B").unwrap(),
            ],
        };
        assert_eq!(format!("{e}"), "graph error: cycle detected through d:A -> d:B");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CoreError>();
    }
}
