//! Node domain model.
//!
//! # Responsibility
//! - Define the canonical `Node` shape returned by every node operation.
//! - Define the closed set of node categories used as the type tag.
//!
//! # Invariants
//! - A stored node carries exactly one category tag; changing the category
//!   replaces it.
//! - `id` is caller-supplied and unique across nodes.

use super::{MISSING_ID, NONE_TEXT};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Category of a diagram node.
///
/// Stored as the node's single type tag. Unknown category names are rejected
/// at the write boundary instead of becoming new tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Point where a user interacts with the system.
    AbstractUserInterface,
    /// Request endpoint.
    #[serde(rename = "API")]
    Api,
    /// Durable storage.
    Persistence,
    /// Something that happens and triggers work.
    Event,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::AbstractUserInterface,
        NodeKind::Api,
        NodeKind::Persistence,
        NodeKind::Event,
    ];

    /// Canonical tag name as stored and returned.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AbstractUserInterface => "AbstractUserInterface",
            Self::Api => "API",
            Self::Persistence => "Persistence",
            Self::Event => "Event",
        }
    }

    /// Parses a canonical tag name. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical node shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub story: String,
    /// Category tag name. Serialized as `type`.
    #[serde(rename = "type")]
    pub node_type: String,
    pub synchronous: bool,
    pub unreliable: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            id: MISSING_ID.to_string(),
            label: NONE_TEXT.to_string(),
            story: NONE_TEXT.to_string(),
            node_type: NONE_TEXT.to_string(),
            synchronous: false,
            unreliable: false,
        }
    }
}

/// Optional properties accepted when creating a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeProps {
    pub story: Option<String>,
    pub synchronous: Option<bool>,
    pub unreliable: Option<bool>,
}

/// Property patch for an existing node. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub label: Option<String>,
    pub story: Option<String>,
    /// New category; replaces the previous tag.
    pub node_type: Option<NodeKind>,
    pub synchronous: Option<bool>,
    pub unreliable: Option<bool>,
}
