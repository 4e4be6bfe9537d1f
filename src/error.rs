// Error taxonomy for the check-in core
//
// StoreError  - what the backing store reports
// CheckInError - what callers of the registry, ledger and orchestrator see

use std::time::Duration;

use thiserror::Error;

use crate::entities::Name;

/// Failures reported by a `CheckInStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable, I/O failure, poisoned connection, etc.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store call did not resolve within the configured timeout.
    #[error("store call timed out after {0:?}")]
    TimedOut(Duration),

    /// A store-level unique constraint rejected the write.
    #[error("conflicting row already exists: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(err.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Unavailable(format!("store task failed: {err}"))
    }
}

/// Errors surfaced by the registration core.
#[derive(Debug, Error)]
pub enum CheckInError {
    /// Empty or whitespace-only name. Caught before any store access.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transient backend failure. Nothing was committed by the failing step.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Business-rule rejection, not a system failure.
    #[error("{name} is already registered for today")]
    AlreadyRegisteredToday { name: Name },
}

impl CheckInError {
    /// Whether resubmitting the same request can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckInError::StoreUnavailable(_))
    }
}

impl From<StoreError> for CheckInError {
    fn from(err: StoreError) -> Self {
        CheckInError::StoreUnavailable(err)
    }
}
