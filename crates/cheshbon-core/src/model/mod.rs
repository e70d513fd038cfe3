//! Cheshbon data models.
//!
//! Strongly-typed representations of the artifact formats: mapping specs,
//! transform registries, and the binding layer. All entities are immutable
//! value objects identified by typed ids.
//!
//! Notes on serde:
//! - Models are serde-friendly, but canonical hashing must never rely on
//!   default `serde_json` formatting. Canonical bytes are produced by
//!   `crate::canonical` only.
//! - `NodeId` validates on deserialization, so a parsed artifact can never
//!   hold a malformed identifier.

mod binding;
mod ident;
mod registry;
mod spec;

pub use binding::{Bindings, RawColumn, RawSchema};
pub use ident::{NodeId, NodeKind};
pub use registry::{
    validate_registry, HistoryEntry, ImplFingerprint, TransformEntry, TransformHistory,
    TransformRegistry, REGISTRY_VERSION,
};
pub use spec::{
    validate_spec, Constraint, DerivedVariable, MappingSpec, SourceColumn, SpecWarning,
    ValidatedSpec, SPEC_SCHEMA_VERSION,
};
