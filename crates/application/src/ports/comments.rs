use async_trait::async_trait;
use bugzot_core::AppResult;
use bugzot_domain::{BugId, Comment, CommentId, NewAuditEntry};

use super::Committed;

/// Comment storage.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Finds a comment, soft-deleted ones included.
    async fn find_comment(&self, comment_id: CommentId) -> AppResult<Option<Comment>>;

    /// Lists live comments of a bug, oldest first.
    async fn list_comments(&self, bug_id: BugId) -> AppResult<Vec<Comment>>;

    /// Inserts a comment.
    async fn create_comment(
        &self,
        comment: Comment,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>>;

    /// Replaces the body of a comment.
    async fn update_comment(
        &self,
        comment_id: CommentId,
        body: String,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>>;

    /// Soft-deletes a comment.
    async fn soft_delete_comment(
        &self,
        comment_id: CommentId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>>;
}
