//! Binding layer artifacts.
//!
//! `RawSchema` describes the raw upstream table; `Bindings` maps raw column
//! names to stable source ids. Both are caller-supplied value objects; the
//! binding engine (`crate::binding`) derives per-source status from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::NodeId;

/// A raw upstream column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// The raw upstream table shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSchema {
    pub table: String,
    pub columns: Vec<RawColumn>,
}

impl RawSchema {
    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Mapping from raw column names to source ids.
///
/// Keys are raw names; a `BTreeMap` keeps iteration deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    pub table: String,
    pub bindings: BTreeMap<String, NodeId>,
}
