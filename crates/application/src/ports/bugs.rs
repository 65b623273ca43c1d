use async_trait::async_trait;
use bugzot_core::AppResult;
use bugzot_domain::{Bug, BugId, BugPriority, BugStatus, NewAuditEntry, ProductId, UserId};

use super::Committed;

/// Partial bug update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugChanges {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New priority.
    pub priority: Option<BugPriority>,
    /// New assignee; `Some(None)` unassigns.
    pub assignee_id: Option<Option<UserId>>,
}

impl BugChanges {
    /// Returns whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.assignee_id.is_none()
    }
}

/// Listing filter for bugs of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BugListQuery {
    /// Restrict to one status.
    pub status: Option<BugStatus>,
    /// Page size.
    pub limit: usize,
    /// Rows to skip.
    pub offset: usize,
}

/// Bug storage.
#[async_trait]
pub trait BugRepository: Send + Sync {
    /// Finds a bug by id.
    async fn find_bug(&self, bug_id: BugId) -> AppResult<Option<Bug>>;

    /// Lists bugs of a product, newest first.
    async fn list_bugs(&self, product_id: ProductId, query: BugListQuery) -> AppResult<Vec<Bug>>;

    /// Inserts a bug.
    async fn create_bug(&self, bug: Bug, audit: NewAuditEntry) -> AppResult<Committed<Bug>>;

    /// Applies a partial update.
    async fn update_bug(
        &self,
        bug_id: BugId,
        changes: BugChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Bug>>;

    /// Moves a bug to `next`.
    ///
    /// The bug is locked and the edge is validated against the locked current
    /// status, so concurrent transitions from the same status cannot both
    /// succeed. Implementations record `from` and `to` in the audit detail.
    async fn transition_status(
        &self,
        bug_id: BugId,
        next: BugStatus,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Bug>>;

    /// Deletes a bug with its comments and attachment metadata.
    async fn delete_bug(&self, bug_id: BugId, audit: NewAuditEntry) -> AppResult<Committed<()>>;
}
