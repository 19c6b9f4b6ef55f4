//! Link domain model and link-owned dependents.
//!
//! # Responsibility
//! - Define the canonical `Link`, `Sequence` and `LinkEnd` shapes.
//! - Define link categories and the two link sides.
//!
//! # Invariants
//! - A persisted link has exactly one X (from) and one Y (to) reference.
//! - A link owns at most one `Sequence` and at most one `LinkEnd` per side;
//!   both go away with the link.

use super::{MISSING_ID, NONE_TEXT};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Default arrow style of a link end.
pub const DEFAULT_ARROW: &str = "default";
/// Sequence number reported when none is stored.
pub const MISSING_SEQ: i64 = -1;

/// Category of a diagram link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    /// Source writes data owned by the target.
    Mutate,
    /// Source causes the target to act.
    Trigger,
    /// Source reads data owned by the target.
    Read,
}

impl LinkKind {
    pub const ALL: [LinkKind; 3] = [LinkKind::Mutate, LinkKind::Trigger, LinkKind::Read];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mutate => "Mutate",
            Self::Trigger => "Trigger",
            Self::Read => "Read",
        }
    }

    /// Parses a canonical tag name. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl Display for LinkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end of a link. X is the source (`from_id`), Y the target (`to_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    X,
    Y,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::X, Side::Y];

    /// Storage key of the side.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
        }
    }

    /// Accepts `x`/`y` in either case, surrounding whitespace ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "x" | "X" => Some(Self::X),
            "y" | "Y" => Some(Self::Y),
            _ => None,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering/grouping metadata owned by one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Store-generated id. Absent on the default shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub group: String,
    pub seq: i64,
    pub label: String,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            id: None,
            group: NONE_TEXT.to_string(),
            seq: MISSING_SEQ,
            label: NONE_TEXT.to_string(),
        }
    }
}

/// Annotation on one side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEnd {
    /// Store-generated id. Absent on the default shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub note: String,
    pub arrow: String,
}

impl Default for LinkEnd {
    fn default() -> Self {
        Self {
            id: None,
            note: NONE_TEXT.to_string(),
            arrow: DEFAULT_ARROW.to_string(),
        }
    }
}

/// Both possible annotations of one link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEnds {
    pub x: Option<LinkEnd>,
    pub y: Option<LinkEnd>,
}

impl LinkEnds {
    pub fn get(&self, side: Side) -> Option<&LinkEnd> {
        match side {
            Side::X => self.x.as_ref(),
            Side::Y => self.y.as_ref(),
        }
    }
}

/// Canonical link shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub label: String,
    /// Node referenced by the X side.
    pub from_id: String,
    /// Node referenced by the Y side.
    pub to_id: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub story: String,
    pub sequence: Sequence,
    pub optional: bool,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            id: MISSING_ID.to_string(),
            label: NONE_TEXT.to_string(),
            from_id: MISSING_ID.to_string(),
            to_id: MISSING_ID.to_string(),
            link_type: NONE_TEXT.to_string(),
            story: NONE_TEXT.to_string(),
            sequence: Sequence::default(),
            optional: false,
        }
    }
}

/// Optional properties accepted when creating a link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkProps {
    pub story: Option<String>,
    pub optional: Option<bool>,
}

/// Property patch for an existing link. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPatch {
    pub label: Option<String>,
    pub story: Option<String>,
    /// New category; replaces the previous tag.
    pub link_type: Option<LinkKind>,
    pub optional: Option<bool>,
    /// Re-points the X reference to this node. Empty means not given.
    pub x_id: Option<String>,
    /// Re-points the Y reference to this node. Empty means not given.
    pub y_id: Option<String>,
}

impl LinkPatch {
    /// Requested new endpoint on `side`; an empty id counts as absent.
    pub(crate) fn endpoint(&self, side: Side) -> Option<&str> {
        let requested = match side {
            Side::X => self.x_id.as_deref(),
            Side::Y => self.y_id.as_deref(),
        };
        requested.filter(|id| !id.is_empty())
    }
}

/// Upsert payload for a link's sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencePatch {
    pub group: Option<String>,
    pub seq: Option<i64>,
    pub label: Option<String>,
}

/// Upsert payload for one link end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkEndPatch {
    pub note: Option<String>,
    pub arrow: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{LinkKind, Side};

    #[test]
    fn side_parse_is_case_insensitive() {
        assert_eq!(Side::parse("x"), Some(Side::X));
        assert_eq!(Side::parse(" Y "), Some(Side::Y));
        assert_eq!(Side::parse("z"), None);
        assert_eq!(Side::parse(""), None);
    }

    #[test]
    fn link_kind_rejects_unknown_tags() {
        assert_eq!(LinkKind::parse("Trigger"), Some(LinkKind::Trigger));
        assert_eq!(LinkKind::parse("Trigger:Node"), None);
    }
}
