use std::sync::Arc;

use bugzot_core::{AppError, AppResult};
use bugzot_domain::{
    Action, Actor, AuditAction, Bug, BugId, Comment, CommentId, CommentVisibility, NewAuditEntry,
    ResourceKind, ResourceTarget, validate_comment_body,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::{AuthorizationService, BugRepository, CommentRepository};

/// Application service for bug comments.
#[derive(Clone)]
pub struct CommentService {
    comment_repository: Arc<dyn CommentRepository>,
    bug_repository: Arc<dyn BugRepository>,
    authorization_service: AuthorizationService,
}

impl CommentService {
    /// Creates a new comment service.
    #[must_use]
    pub fn new(
        comment_repository: Arc<dyn CommentRepository>,
        bug_repository: Arc<dyn BugRepository>,
        authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            comment_repository,
            bug_repository,
            authorization_service,
        }
    }

    /// Posts a comment. Private comments need maintainer access on the product.
    pub async fn create_comment(
        &self,
        actor: &Actor,
        bug_id: BugId,
        body: String,
        visibility: CommentVisibility,
    ) -> AppResult<Comment> {
        let bug = self.load_bug(bug_id).await?;
        let decision = self
            .authorization_service
            .require(
                actor,
                Action::Comment,
                &ResourceTarget::new_comment(&bug, visibility),
            )
            .await?;

        let now = Utc::now();
        let comment = Comment {
            id: CommentId::new(),
            bug_id,
            author_id: actor.user_id(),
            visibility,
            body: validate_comment_body(body)?,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::CommentCreated,
            ResourceKind::Comment,
            comment.id.as_uuid(),
            decision,
        )
        .with_detail(json!({ "bug_id": bug_id, "visibility": visibility.as_str() }));

        let committed = self
            .comment_repository
            .create_comment(comment, audit)
            .await?;

        info!(
            actor_id = %actor.user_id(),
            bug_id = %bug_id,
            comment_id = %committed.value.id,
            visibility = visibility.as_str(),
            audit_sequence = committed.audit_sequence,
            "comment created"
        );

        Ok(committed.value)
    }

    /// Lists the comments of a bug the actor may read, oldest first.
    ///
    /// Private comments are left out for actors below maintainer.
    pub async fn list_comments(&self, actor: &Actor, bug_id: BugId) -> AppResult<Vec<Comment>> {
        let bug = self.load_bug(bug_id).await?;
        self.authorization_service
            .require_read(actor, &ResourceTarget::comments_of(&bug))
            .await?;

        let comments = self.comment_repository.list_comments(bug_id).await?;
        Ok(comments
            .into_iter()
            .filter(|comment| {
                self.authorization_service
                    .decide(
                        actor,
                        Action::Read,
                        &ResourceTarget::comment(comment, bug.product_id),
                    )
                    .is_allowed()
            })
            .collect())
    }

    /// Returns one live comment.
    pub async fn get_comment(&self, actor: &Actor, comment_id: CommentId) -> AppResult<Comment> {
        let (comment, bug) = self.load_comment(comment_id).await?;
        self.authorization_service
            .require_read(actor, &ResourceTarget::comment(&comment, bug.product_id))
            .await?;

        Ok(comment)
    }

    /// Replaces the body of a comment. Authors may edit their own.
    pub async fn update_comment(
        &self,
        actor: &Actor,
        comment_id: CommentId,
        body: String,
    ) -> AppResult<Comment> {
        let (comment, bug) = self.load_comment(comment_id).await?;
        let decision = self
            .authorization_service
            .require(
                actor,
                Action::Update,
                &ResourceTarget::comment(&comment, bug.product_id),
            )
            .await?;

        let body = validate_comment_body(body)?;
        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::CommentUpdated,
            ResourceKind::Comment,
            comment_id.as_uuid(),
            decision,
        )
        .with_detail(json!({ "bug_id": bug.id }));

        let committed = self
            .comment_repository
            .update_comment(comment_id, body, audit)
            .await?;

        info!(
            actor_id = %actor.user_id(),
            comment_id = %comment_id,
            audit_sequence = committed.audit_sequence,
            "comment updated"
        );

        Ok(committed.value)
    }

    /// Soft-deletes a comment. Authors may delete their own.
    pub async fn delete_comment(&self, actor: &Actor, comment_id: CommentId) -> AppResult<()> {
        let (comment, bug) = self.load_comment(comment_id).await?;
        let decision = self
            .authorization_service
            .require(
                actor,
                Action::Delete,
                &ResourceTarget::comment(&comment, bug.product_id),
            )
            .await?;

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::CommentDeleted,
            ResourceKind::Comment,
            comment_id.as_uuid(),
            decision,
        )
        .with_detail(json!({ "bug_id": bug.id }));

        let committed = self
            .comment_repository
            .soft_delete_comment(comment_id, audit)
            .await?;

        info!(
            actor_id = %actor.user_id(),
            comment_id = %comment_id,
            audit_sequence = committed.audit_sequence,
            "comment deleted"
        );

        Ok(())
    }

    async fn load_bug(&self, bug_id: BugId) -> AppResult<Bug> {
        self.bug_repository
            .find_bug(bug_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bug '{bug_id}' not found")))
    }

    async fn load_comment(&self, comment_id: CommentId) -> AppResult<(Comment, Bug)> {
        let comment = self
            .comment_repository
            .find_comment(comment_id)
            .await?
            .filter(|comment| !comment.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("comment '{comment_id}' not found")))?;
        let bug = self.load_bug(comment.bug_id).await?;

        Ok((comment, bug))
    }
}
