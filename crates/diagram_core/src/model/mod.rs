//! Canonical shapes of the diagram graph.
//!
//! # Responsibility
//! - Define the response shapes for nodes, links and link dependents.
//! - Define the closed sets of node/link categories and link sides.
//! - Define write-side property patches shared by repository and services.
//!
//! # Invariants
//! - Every canonical shape is total: absent store fields are replaced by the
//!   documented defaults (`"-1"` ids, `"None"` text, `false` flags).
//! - A link refers to its endpoint nodes by id only; it never owns them.

pub mod link;
pub mod node;
pub mod project;

/// Placeholder for absent text fields.
pub const NONE_TEXT: &str = "None";
/// Placeholder for absent identifiers.
pub const MISSING_ID: &str = "-1";
