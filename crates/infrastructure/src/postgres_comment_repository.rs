//! PostgreSQL-backed comment repository.

use async_trait::async_trait;
use bugzot_application::{CommentRepository, Committed};
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{BugId, Comment, CommentId, NewAuditEntry, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::postgres_support::{
    append_audit_entry, begin_serializable, commit, map_sqlx_error, retry_serializable,
};

/// PostgreSQL implementation of the comment repository port.
#[derive(Clone)]
pub struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: Uuid,
    bug_id: Uuid,
    author_id: Uuid,
    visibility: String,
    body: String,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = AppError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CommentId::from_uuid(row.id),
            bug_id: BugId::from_uuid(row.bug_id),
            author_id: UserId::from_uuid(row.author_id),
            visibility: row.visibility.parse()?,
            body: row.body,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn find_comment(&self, comment_id: CommentId) -> AppResult<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, bug_id, author_id, visibility, body, is_deleted, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(comment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "find comment"))?;

        row.map(Comment::try_from).transpose()
    }

    async fn list_comments(&self, bug_id: BugId) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, bug_id, author_id, visibility, body, is_deleted, created_at, updated_at
            FROM comments
            WHERE bug_id = $1 AND NOT is_deleted
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(bug_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "list comments"))?;

        rows.into_iter().map(Comment::try_from).collect()
    }

    async fn create_comment(
        &self,
        comment: Comment,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>> {
        retry_serializable("create comment", || {
            self.attempt_create_comment(comment.clone(), audit.clone())
        })
        .await
    }

    async fn update_comment(
        &self,
        comment_id: CommentId,
        body: String,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>> {
        retry_serializable("update comment", || {
            self.attempt_update_comment(comment_id, body.clone(), audit.clone())
        })
        .await
    }

    async fn soft_delete_comment(
        &self,
        comment_id: CommentId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>> {
        retry_serializable("soft delete comment", || {
            self.attempt_soft_delete_comment(comment_id, audit.clone())
        })
        .await
    }
}

impl PostgresCommentRepository {
    async fn attempt_create_comment(
        &self,
        comment: Comment,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (id, bug_id, author_id, visibility, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id, bug_id, author_id, visibility, body, is_deleted, created_at, updated_at
            "#,
        )
        .bind(comment.id.as_uuid())
        .bind(comment.bug_id.as_uuid())
        .bind(comment.author_id.as_uuid())
        .bind(comment.visibility.as_str())
        .bind(&comment.body)
        .bind(comment.created_at)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "create comment"))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit comment creation").await?;

        Ok(Committed::new(Comment::try_from(row)?, sequence))
    }

    async fn attempt_update_comment(
        &self,
        comment_id: CommentId,
        body: String,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            UPDATE comments
            SET body = $2, updated_at = now()
            WHERE id = $1 AND NOT is_deleted
            RETURNING id, bug_id, author_id, visibility, body, is_deleted, created_at, updated_at
            "#,
        )
        .bind(comment_id.as_uuid())
        .bind(body)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "update comment"))?
        .ok_or_else(|| comment_not_found(comment_id))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit comment update").await?;

        Ok(Committed::new(Comment::try_from(row)?, sequence))
    }

    async fn attempt_soft_delete_comment(
        &self,
        comment_id: CommentId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Comment>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            UPDATE comments
            SET is_deleted = TRUE, updated_at = now()
            WHERE id = $1 AND NOT is_deleted
            RETURNING id, bug_id, author_id, visibility, body, is_deleted, created_at, updated_at
            "#,
        )
        .bind(comment_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "delete comment"))?
        .ok_or_else(|| comment_not_found(comment_id))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit comment deletion").await?;

        Ok(Committed::new(Comment::try_from(row)?, sequence))
    }
}

fn comment_not_found(comment_id: CommentId) -> AppError {
    AppError::NotFound(format!("comment '{comment_id}' not found"))
}
