//! Graph store adapter: repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Express node/link/dependent lifecycle and project-flag access as
//!   repository operations.
//! - Keep SQL details inside the persistence boundary and hand raw records to
//!   the normalizer.
//!
//! # Invariants
//! - Every multi-statement write runs in one immediate transaction.
//! - Repositories refuse connections whose schema is not fully bootstrapped.

pub mod graph_repo;
pub mod project_repo;

use crate::db::migrations::latest_version;
use rusqlite::Connection;
use std::fmt::{Display, Formatter};

/// Reason a connection is not usable by a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaGap {
    /// Connection schema is not at the expected version.
    Version {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingTable(&'static str),
}

impl Display for SchemaGap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Version {
                expected_version,
                actual_version,
            } => write!(
                f,
                "graph store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingTable(table) => write!(f, "graph store requires table `{table}`"),
        }
    }
}

/// Checks schema version and table presence.
///
/// Returns `Ok(None)` when the connection is ready.
pub(crate) fn find_schema_gap(
    conn: &Connection,
    tables: &[&'static str],
) -> rusqlite::Result<Option<SchemaGap>> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Ok(Some(SchemaGap::Version {
            expected_version,
            actual_version,
        }));
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Ok(Some(SchemaGap::MissingTable(table)));
        }
    }

    Ok(None)
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
