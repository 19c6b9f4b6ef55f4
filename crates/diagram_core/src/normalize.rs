//! Entity normalizer: raw store records to canonical shapes.
//!
//! # Responsibility
//! - Overlay the fields a record actually carries onto the documented default
//!   shape, so every response is total and predictable.
//! - Unwrap store-boxed scalars (integers stored as real or text, flags stored
//!   as integers) into plain Rust values.
//!
//! # Invariants
//! - Pure: no I/O, no logging.
//! - Present fields win over defaults, never the reverse.
//! - A value that cannot be coerced counts as absent.

use crate::model::link::{Link, LinkEnd, Sequence};
use crate::model::node::Node;
use rusqlite::types::Value;

/// Node record as read from the store. `None` marks an absent property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNode {
    pub id: Option<String>,
    pub label: Option<String>,
    pub story: Option<String>,
    pub node_type: Option<String>,
    pub synchronous: Option<Value>,
    pub unreliable: Option<Value>,
}

/// Sequence record as read from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSequence {
    pub id: Option<String>,
    pub group: Option<String>,
    pub seq: Option<Value>,
    pub label: Option<String>,
}

/// Link-end record as read from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLinkEnd {
    pub id: Option<String>,
    pub note: Option<String>,
    pub arrow: Option<String>,
}

/// Link record joined with its structural references and sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLink {
    pub id: Option<String>,
    pub label: Option<String>,
    pub story: Option<String>,
    pub link_type: Option<String>,
    pub optional: Option<Value>,
    pub from_id: Option<String>,
    pub to_id: Option<String>,
    pub sequence: Option<RawSequence>,
}

pub fn normalize_node(raw: RawNode) -> Node {
    let mut node = Node::default();
    overlay(&mut node.id, raw.id);
    overlay(&mut node.label, raw.label);
    overlay(&mut node.story, raw.story);
    overlay(&mut node.node_type, raw.node_type);
    overlay(&mut node.synchronous, raw.synchronous.and_then(coerce_bool));
    overlay(&mut node.unreliable, raw.unreliable.and_then(coerce_bool));
    node
}

pub fn normalize_sequence(raw: RawSequence) -> Sequence {
    let mut sequence = Sequence {
        id: raw.id,
        ..Sequence::default()
    };
    overlay(&mut sequence.group, raw.group);
    overlay(&mut sequence.seq, raw.seq.and_then(coerce_int));
    overlay(&mut sequence.label, raw.label);
    sequence
}

pub fn normalize_link_end(raw: RawLinkEnd) -> LinkEnd {
    let mut end = LinkEnd {
        id: raw.id,
        ..LinkEnd::default()
    };
    overlay(&mut end.note, raw.note);
    overlay(&mut end.arrow, raw.arrow);
    end
}

pub fn normalize_link(raw: RawLink) -> Link {
    let mut link = Link::default();
    overlay(&mut link.id, raw.id);
    overlay(&mut link.label, raw.label);
    overlay(&mut link.story, raw.story);
    overlay(&mut link.link_type, raw.link_type);
    overlay(&mut link.optional, raw.optional.and_then(coerce_bool));
    overlay(&mut link.from_id, raw.from_id);
    overlay(&mut link.to_id, raw.to_id);
    if let Some(sequence) = raw.sequence {
        link.sequence = normalize_sequence(sequence);
    }
    link
}

/// Unwraps a stored integer. Reals must be integral; text must parse.
pub fn coerce_int(value: Value) -> Option<i64> {
    match value {
        Value::Integer(number) => Some(number),
        Value::Real(number)
            if number.is_finite()
                && number.fract() == 0.0
                && number >= i64::MIN as f64
                && number <= i64::MAX as f64 =>
        {
            Some(number as i64)
        }
        Value::Text(text) => text.trim().parse().ok(),
        Value::Real(_) | Value::Null | Value::Blob(_) => None,
    }
}

/// Unwraps a stored flag: `0`/`1` integers or `true`/`false` text.
pub fn coerce_bool(value: Value) -> Option<bool> {
    match value {
        Value::Integer(0) => Some(false),
        Value::Integer(1) => Some(true),
        Value::Text(text) => match text.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_records_normalize_to_documented_defaults() {
        assert_eq!(
            normalize_node(RawNode::default()),
            Node {
                id: "-1".to_string(),
                label: "None".to_string(),
                story: "None".to_string(),
                node_type: "None".to_string(),
                synchronous: false,
                unreliable: false,
            }
        );

        let sequence = normalize_sequence(RawSequence::default());
        assert_eq!(sequence.group, "None");
        assert_eq!(sequence.seq, -1);
        assert_eq!(sequence.label, "None");
        assert_eq!(sequence.id, None);

        let end = normalize_link_end(RawLinkEnd::default());
        assert_eq!(end.note, "None");
        assert_eq!(end.arrow, "default");

        let link = normalize_link(RawLink::default());
        assert_eq!(link, Link::default());
        assert_eq!(link.from_id, "-1");
        assert_eq!(link.to_id, "-1");
        assert_eq!(link.sequence, Sequence::default());
        assert!(!link.optional);
    }

    #[test]
    fn present_fields_override_defaults_only_where_set() {
        let node = normalize_node(RawNode {
            id: Some("n1".to_string()),
            node_type: Some("API".to_string()),
            unreliable: Some(Value::Integer(1)),
            ..RawNode::default()
        });
        assert_eq!(node.id, "n1");
        assert_eq!(node.node_type, "API");
        assert_eq!(node.label, "None");
        assert!(node.unreliable);
        assert!(!node.synchronous);
    }

    #[test]
    fn boxed_sequence_numbers_are_unwrapped() {
        let from_real = normalize_sequence(RawSequence {
            seq: Some(Value::Real(3.0)),
            ..RawSequence::default()
        });
        assert_eq!(from_real.seq, 3);

        let from_text = normalize_sequence(RawSequence {
            seq: Some(Value::Text(" 7 ".to_string())),
            ..RawSequence::default()
        });
        assert_eq!(from_text.seq, 7);

        let fractional = normalize_sequence(RawSequence {
            seq: Some(Value::Real(2.5)),
            ..RawSequence::default()
        });
        assert_eq!(fractional.seq, -1);

        let garbage = normalize_sequence(RawSequence {
            seq: Some(Value::Blob(vec![1, 2])),
            ..RawSequence::default()
        });
        assert_eq!(garbage.seq, -1);
    }

    #[test]
    fn flags_accept_integer_and_text_forms() {
        assert_eq!(coerce_bool(Value::Integer(1)), Some(true));
        assert_eq!(coerce_bool(Value::Text("false".to_string())), Some(false));
        assert_eq!(coerce_bool(Value::Integer(2)), None);
        assert_eq!(coerce_bool(Value::Null), None);
    }

    #[test]
    fn link_embeds_normalized_sequence() {
        let link = normalize_link(RawLink {
            id: Some("l1".to_string()),
            from_id: Some("a".to_string()),
            sequence: Some(RawSequence {
                group: Some("G".to_string()),
                seq: Some(Value::Integer(4)),
                ..RawSequence::default()
            }),
            ..RawLink::default()
        });
        assert_eq!(link.from_id, "a");
        assert_eq!(link.to_id, "-1");
        assert_eq!(link.sequence.group, "G");
        assert_eq!(link.sequence.seq, 4);
        assert_eq!(link.sequence.label, "None");
    }
}
