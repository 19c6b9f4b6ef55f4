//! Project singleton repository and SQLite implementation.
//!
//! # Responsibility
//! - Read the effective edit-lock state of the project record.
//! - Flip the lock with single conditional writes.
//!
//! # Invariants
//! - Taking the lock is one compare-and-set statement; two sessions racing
//!   for a free lock cannot both succeed.
//! - A lock whose lease has passed reads as free and can be taken.
//! - A missing project row is a store-integrity error, never "unlocked".

use super::{find_schema_gap, SchemaGap};
use crate::db::DbError;
use crate::model::project::Project;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PROJECT_TABLES: &[&str] = &["project"];

pub type ProjectRepoResult<T> = Result<T, ProjectRepoError>;

/// Errors from project repository operations.
#[derive(Debug)]
pub enum ProjectRepoError {
    Db(DbError),
    Schema(SchemaGap),
    /// The singleton row has not been provisioned.
    ProjectMissing,
}

impl Display for ProjectRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Schema(gap) => write!(f, "{gap}"),
            Self::ProjectMissing => write!(f, "project record is missing from the graph store"),
        }
    }
}

impl Error for ProjectRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Schema(_) | Self::ProjectMissing => None,
        }
    }
}

impl From<DbError> for ProjectRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ProjectRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Outcome of one compare-and-set on the lock flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAttempt {
    Acquired,
    /// Someone holds an unexpired lock; nothing was written.
    AlreadyHeld,
}

/// Repository interface for the project record.
pub trait ProjectRepository {
    /// Loads the project with its lock state evaluated at `now_ms`.
    fn load_project(&self, now_ms: i64) -> ProjectRepoResult<Project>;
    /// Takes the lock if it is free or its lease expired before `now_ms`.
    ///
    /// `lease_expires_at_ms = None` takes a lock that never expires.
    fn try_lock(
        &self,
        holder_token: &str,
        now_ms: i64,
        lease_expires_at_ms: Option<i64>,
    ) -> ProjectRepoResult<LockAttempt>;
    /// Clears the lock regardless of holder.
    fn unlock(&self) -> ProjectRepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates repository from a bootstrapped connection.
    pub fn try_new(conn: &'conn Connection) -> ProjectRepoResult<Self> {
        if let Some(gap) = find_schema_gap(conn, PROJECT_TABLES)? {
            return Err(ProjectRepoError::Schema(gap));
        }
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn load_project(&self, now_ms: i64) -> ProjectRepoResult<Project> {
        let row: Option<(Option<String>, i64)> = self
            .conn
            .query_row(
                "SELECT
                    name,
                    CASE
                        WHEN is_being_edited = 1
                         AND (lease_expires_at IS NULL OR lease_expires_at > ?1)
                        THEN 1
                        ELSE 0
                    END AS locked
                 FROM project
                 WHERE singleton_id = 1;",
                [now_ms],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (name, locked) = row.ok_or(ProjectRepoError::ProjectMissing)?;
        Ok(Project {
            name: name.unwrap_or_default(),
            is_being_edited: locked == 1,
        })
    }

    fn try_lock(
        &self,
        holder_token: &str,
        now_ms: i64,
        lease_expires_at_ms: Option<i64>,
    ) -> ProjectRepoResult<LockAttempt> {
        let changed = self.conn.execute(
            "UPDATE project
             SET
                is_being_edited = 1,
                holder_token = ?1,
                lease_expires_at = ?3
             WHERE singleton_id = 1
               AND (
                 is_being_edited = 0
                 OR (lease_expires_at IS NOT NULL AND lease_expires_at <= ?2)
               );",
            params![holder_token, now_ms, lease_expires_at_ms],
        )?;

        if changed == 1 {
            return Ok(LockAttempt::Acquired);
        }
        ensure_project_exists(self.conn)?;
        Ok(LockAttempt::AlreadyHeld)
    }

    fn unlock(&self) -> ProjectRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE project
             SET
                is_being_edited = 0,
                holder_token = NULL,
                lease_expires_at = NULL
             WHERE singleton_id = 1;",
            [],
        )?;
        if changed == 0 {
            return Err(ProjectRepoError::ProjectMissing);
        }
        Ok(())
    }
}

fn ensure_project_exists(conn: &Connection) -> ProjectRepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM project WHERE singleton_id = 1);",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(ProjectRepoError::ProjectMissing);
    }
    Ok(())
}
