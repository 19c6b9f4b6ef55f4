//! Edit-lock coordinator over the project singleton.
//!
//! # Responsibility
//! - Query, acquire and release the single global edit lock.
//! - Confirm every write by re-reading the project record.
//!
//! # Invariants
//! - Acquire never waits: a held lock fails immediately with `Conflict`.
//! - Acquire is one compare-and-set in the store; no read-then-write race.
//! - Release needs no holder token and is idempotent.
//! - With a lease configured, an abandoned lock frees itself once the lease
//!   passes.

use crate::repo::project_repo::{LockAttempt, ProjectRepoError, ProjectRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Errors from edit-lock operations.
#[derive(Debug)]
pub enum EditLockError {
    /// The lock is held by someone else.
    Conflict,
    /// The acquire write did not show up on re-read.
    AcquireNotConfirmed,
    /// The release write did not show up on re-read.
    ReleaseNotConfirmed,
    Repo(ProjectRepoError),
}

impl Display for EditLockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict => write!(f, "Someone else is currently editing the project"),
            Self::AcquireNotConfirmed => {
                write!(f, "There was an error when requesting editing rights.")
            }
            Self::ReleaseNotConfirmed => write!(f, "Couldn't free editing rights"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EditLockError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectRepoError> for EditLockError {
    fn from(value: ProjectRepoError) -> Self {
        Self::Repo(value)
    }
}

/// Grant returned by a successful acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditLease {
    /// Random token identifying this grant in the store.
    pub holder_token: String,
    /// Epoch ms after which the lock reads as free. `None` never expires.
    pub expires_at_ms: Option<i64>,
}

/// Edit-lock coordinator facade.
pub struct EditLockService<R: ProjectRepository> {
    repo: R,
    lease: Option<Duration>,
}

impl<R: ProjectRepository> EditLockService<R> {
    /// Creates a coordinator. `lease = None` keeps locks until released.
    pub fn new(repo: R, lease: Option<Duration>) -> Self {
        Self { repo, lease }
    }

    pub fn is_being_edited(&self) -> Result<bool, EditLockError> {
        self.is_being_edited_at(now_epoch_ms())
    }

    /// Lock state as seen at `now_ms`.
    pub fn is_being_edited_at(&self, now_ms: i64) -> Result<bool, EditLockError> {
        Ok(self.repo.load_project(now_ms)?.is_being_edited)
    }

    pub fn acquire(&self) -> Result<EditLease, EditLockError> {
        self.acquire_at(now_epoch_ms())
    }

    /// Acquires the lock as of `now_ms`.
    ///
    /// # Errors
    /// - `Conflict` when an unexpired lock is held; nothing is written.
    /// - `AcquireNotConfirmed` when the re-read does not show the lock. The
    ///   write is not rolled back.
    pub fn acquire_at(&self, now_ms: i64) -> Result<EditLease, EditLockError> {
        let lease = EditLease {
            holder_token: Uuid::new_v4().to_string(),
            expires_at_ms: self
                .lease
                .map(|lease| now_ms.saturating_add(duration_ms(lease))),
        };

        match self
            .repo
            .try_lock(&lease.holder_token, now_ms, lease.expires_at_ms)?
        {
            LockAttempt::AlreadyHeld => {
                info!("event=edit_lock_acquire module=edit_lock status=conflict");
                return Err(EditLockError::Conflict);
            }
            LockAttempt::Acquired => {}
        }

        if !self.repo.load_project(now_ms)?.is_being_edited {
            warn!("event=edit_lock_acquire module=edit_lock status=error error_code=not_confirmed");
            return Err(EditLockError::AcquireNotConfirmed);
        }

        info!(
            "event=edit_lock_acquire module=edit_lock status=ok expires_at_ms={}",
            lease
                .expires_at_ms
                .map_or_else(|| "never".to_string(), |value| value.to_string())
        );
        Ok(lease)
    }

    pub fn release(&self) -> Result<(), EditLockError> {
        self.release_at(now_epoch_ms())
    }

    /// Clears the lock regardless of holder and confirms as of `now_ms`.
    pub fn release_at(&self, now_ms: i64) -> Result<(), EditLockError> {
        self.repo.unlock()?;
        if self.repo.load_project(now_ms)?.is_being_edited {
            warn!("event=edit_lock_release module=edit_lock status=error error_code=not_confirmed");
            return Err(EditLockError::ReleaseNotConfirmed);
        }
        info!("event=edit_lock_release module=edit_lock status=ok");
        Ok(())
    }
}

/// Wall clock in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

fn duration_ms(value: Duration) -> i64 {
    i64::try_from(value.as_millis()).unwrap_or(i64::MAX)
}
