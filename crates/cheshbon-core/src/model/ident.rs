//! Typed identifiers.
//!
//! Every first-class entity carries a stable identifier with a typed prefix:
//! `s:` source column, `d:` derived variable, `c:` constraint, `t:`
//! transform. Names are opaque and case-sensitive; identity is never
//! inferred from display labels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::SpecValidationError;

/// The kind of entity an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeKind {
    Source,
    Derived,
    Constraint,
    Transform,
}

impl NodeKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            NodeKind::Source => "s",
            NodeKind::Derived => "d",
            NodeKind::Constraint => "c",
            NodeKind::Transform => "t",
        }
    }
}

/// A validated typed identifier such as `d:SEX_CDISC`.
///
/// Ordering and equality are plain byte comparisons on the full string, so
/// sorted collections of ids are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Parse and validate an identifier.
    ///
    /// Format: one of `s d c t`, a colon, then one or more characters drawn
    /// from ASCII alphanumerics, `_`, `.`, and `-`.
    pub fn parse(s: &str) -> Result<Self, SpecValidationError> {
        let invalid = || SpecValidationError::InvalidIdFormat { id: s.to_string() };

        let mut chars = s.chars();
        let kind = chars.next().ok_or_else(invalid)?;
        if !matches!(kind, 's' | 'd' | 'c' | 't') {
            return Err(invalid());
        }
        if chars.next() != Some(':') {
            return Err(invalid());
        }
        let name = &s[2..];
        if name.is_empty() {
            return Err(invalid());
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(invalid());
        }
        Ok(NodeId(s.to_string()))
    }

    pub fn kind(&self) -> NodeKind {
        match self.0.as_bytes()[0] {
            b's' => NodeKind::Source,
            b'd' => NodeKind::Derived,
            b'c' => NodeKind::Constraint,
            _ => NodeKind::Transform,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The opaque name after the prefix.
    pub fn name(&self) -> &str {
        &self.0[2..]
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for NodeId {}

impl TryFrom<String> for NodeId {
    type Error = SpecValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        NodeId::parse(&s)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> String {
        id.0
    }
}
