//! Ports implemented by infrastructure adapters.
//!
//! Every mutating repository method receives the audit entry describing the
//! mutation. Implementations must persist the mutation and the entry in one
//! transaction: both are durable or neither is. A failure to write the entry
//! is reported as [`bugzot_core::AppError::AuditWriteFailure`].

mod attachments;
mod audit;
mod bugs;
mod comments;
mod identity;
mod products;
mod rate_limit;
mod users;

use std::cmp::Ordering;
use std::str::FromStr;

use bugzot_core::AppError;

pub use attachments::AttachmentRepository;
pub use audit::{AuditQuery, AuditRepository};
pub use bugs::{BugChanges, BugListQuery, BugRepository};
pub use comments::CommentRepository;
pub use identity::{ActorCache, IssuedToken, PasswordHasher, TokenClaims, TokenCodec, TokenRevocationStore};
pub use products::{ProductChanges, ProductFilter, ProductMember, ProductRepository};
pub use rate_limit::{AttemptInfo, RateLimitRepository};
pub use users::{
    NewUserRecord, UserCredentials, UserListQuery, UserProfileChanges, UserRepository,
    UserSortField,
};

/// A committed mutation together with the sequence of its audit entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    /// The mutated value as stored.
    pub value: T,
    /// Sequence number assigned to the accompanying audit entry.
    pub audit_sequence: i64,
}

impl<T> Committed<T> {
    /// Pairs a value with its audit sequence.
    #[must_use]
    pub fn new(value: T, audit_sequence: i64) -> Self {
        Self {
            value,
            audit_sequence,
        }
    }
}

/// Sort order of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

impl SortDirection {
    /// Returns the query-string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Orients an ascending comparison.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::Validation(format!(
                "sort direction must be 'asc' or 'desc', got '{value}'"
            ))),
        }
    }
}

/// One page of a listing with the number of rows matching its filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows of the requested window.
    pub items: Vec<T>,
    /// Matching rows across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Cuts a window out of rows that are already filtered and ordered.
    #[must_use]
    pub fn window(matching: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        Self {
            items: matching.into_iter().skip(offset).take(limit).collect(),
            total,
        }
    }
}

/// Case-insensitive substring match used by directory searches.
pub(crate) fn contains_ignoring_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
