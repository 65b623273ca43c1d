use async_trait::async_trait;
use bugzot_application::{CommentRepository, Committed};

use super::*;

impl StoreState {
    fn live_comment(&self, comment_id: CommentId) -> AppResult<&Comment> {
        self.comments
            .get(&comment_id)
            .filter(|comment| !comment.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("comment '{comment_id}' not found")))
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn find_comment(&self, comment_id: CommentId) -> AppResult<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&comment_id).cloned())
    }

    async fn list_comments(&self, bug_id: BugId) -> AppResult<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|comment| comment.bug_id == bug_id && !comment.is_deleted)
            .cloned()
            .collect();
        comments.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(comments)
    }

    async fn create_comment(
        &self,
        comment: Comment,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>> {
        let mut state = self.state.write().await;
        state.require_bug(comment.bug_id)?;

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.comments.insert(comment.id, comment.clone());
        Ok(Committed::new(comment, sequence))
    }

    async fn update_comment(
        &self,
        comment_id: CommentId,
        body: String,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>> {
        let mut state = self.state.write().await;
        let mut comment = state.live_comment(comment_id)?.clone();
        comment.body = body;
        comment.updated_at = Utc::now();

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.comments.insert(comment_id, comment.clone());
        Ok(Committed::new(comment, sequence))
    }

    async fn soft_delete_comment(
        &self,
        comment_id: CommentId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>> {
        let mut state = self.state.write().await;
        let mut comment = state.live_comment(comment_id)?.clone();
        comment.is_deleted = true;
        comment.updated_at = Utc::now();

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.comments.insert(comment_id, comment.clone());
        Ok(Committed::new(comment, sequence))
    }
}
