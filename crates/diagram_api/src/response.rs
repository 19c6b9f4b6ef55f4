//! Response envelopes and request inputs of the request API.
//!
//! Every envelope carries `success` and a diagnostic `message`. Entity fields
//! are present only on success.

use diagram_core::{Link, LinkEnd, LinkEnds, Node, Sequence};
use serde::{Deserialize, Serialize};

/// Optional property changes for `update_node`.
///
/// `node_type` is the category name; unknown names fail the update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeUpdate {
    pub label: Option<String>,
    pub story: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub synchronous: Option<bool>,
    pub unreliable: Option<bool>,
}

/// Optional property changes and re-pointing for `update_link`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkUpdate {
    pub label: Option<String>,
    pub story: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
    pub optional: Option<bool>,
    pub x_id: Option<String>,
    pub y_id: Option<String>,
}

/// Input of `merge_link_end`; `xy` names the side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkEndInput {
    pub xy: String,
    pub note: Option<String>,
    pub arrow: Option<String>,
}

/// Generic outcome without an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub(crate) fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of the edit-lock query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditStatusResponse {
    pub success: bool,
    pub message: String,
    /// `false` whenever the query failed.
    pub is_being_edited: bool,
}

/// Outcome of an edit-rights request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRightsResponse {
    pub success: bool,
    pub message: String,
    /// Token stamped on the project row for this grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_token: Option<String>,
    /// Epoch ms when the grant lapses; absent when it never does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// Merged sequence with its owning link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<Sequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// Merged link end with its owning link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEndResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<LinkEnd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEndsResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends: Option<LinkEnds>,
}

/// Outcome of a delete. Deleting something absent still succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Links removed by a node deletion's orphan sweep.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub swept_links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeListResponse {
    pub success: bool,
    pub message: String,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkListResponse {
    pub success: bool,
    pub message: String,
    pub links: Vec<Link>,
}
