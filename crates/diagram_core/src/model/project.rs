//! Project singleton model.

use serde::{Deserialize, Serialize};

/// Name given to the project provisioned by the seed utility.
pub const DEFAULT_PROJECT_NAME: &str = "Methodical Designer";

/// Process-wide project record holding the edit lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    /// Effective lock state; an expired lease reads as `false`.
    pub is_being_edited: bool,
}
