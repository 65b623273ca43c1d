//! Shared primitives for all Rust crates in BugZot.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::BearerCredential;

/// Result type used across BugZot crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string. Surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing, malformed, expired or revoked credential.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Valid identity that is blocked by authorization policy or account status.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Requested bug status change is not an edge of the workflow graph.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The audit trail could not be written; the triggering mutation was rolled back.
    #[error("audit write failure: {0}")]
    AuditWriteFailure(String),

    /// Write kept losing serialization races after the store replayed it.
    #[error("serialization conflict: {0}")]
    SerializationConflict(String),

    /// Caller exceeded an attempt budget.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether the failed operation may be retried unchanged.
    ///
    /// A mutation without its audit entry is never committed, so an audit
    /// write failure is safe to replay once the store is reachable again.
    /// Serialization races are replayed inside the store before they surface.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AuditWriteFailure(_))
    }
}
