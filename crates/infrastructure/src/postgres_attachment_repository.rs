//! PostgreSQL-backed attachment metadata repository.

use async_trait::async_trait;
use bugzot_application::{AttachmentRepository, Committed};
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{Attachment, AttachmentId, AttachmentUpload, BugId, NewAuditEntry, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::postgres_support::{
    append_audit_entry, begin_serializable, commit, map_sqlx_error, retry_serializable,
};

/// PostgreSQL implementation of the attachment repository port.
#[derive(Clone)]
pub struct PostgresAttachmentRepository {
    pool: PgPool,
}

impl PostgresAttachmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AttachmentRow {
    id: Uuid,
    bug_id: Uuid,
    uploader_id: Uuid,
    filename: String,
    storage_path: String,
    mime_type: Option<String>,
    size_bytes: i64,
    version: i32,
    is_latest: bool,
    is_deleted: bool,
    uploaded_at: DateTime<Utc>,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Self {
            id: AttachmentId::from_uuid(row.id),
            bug_id: BugId::from_uuid(row.bug_id),
            uploader_id: UserId::from_uuid(row.uploader_id),
            filename: row.filename,
            storage_path: row.storage_path,
            mime_type: row.mime_type,
            size_bytes: row.size_bytes,
            version: row.version,
            is_latest: row.is_latest,
            is_deleted: row.is_deleted,
            uploaded_at: row.uploaded_at,
        }
    }
}

#[async_trait]
impl AttachmentRepository for PostgresAttachmentRepository {
    async fn find_attachment(
        &self,
        attachment_id: AttachmentId,
    ) -> AppResult<Option<Attachment>> {
        let row = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT id, bug_id, uploader_id, filename, storage_path, mime_type,
                   size_bytes, version, is_latest, is_deleted, uploaded_at
            FROM attachments
            WHERE id = $1
            "#,
        )
        .bind(attachment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "find attachment"))?;

        Ok(row.map(Attachment::from))
    }

    async fn list_attachments(
        &self,
        bug_id: BugId,
        include_history: bool,
    ) -> AppResult<Vec<Attachment>> {
        let rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT id, bug_id, uploader_id, filename, storage_path, mime_type,
                   size_bytes, version, is_latest, is_deleted, uploaded_at
            FROM attachments
            WHERE bug_id = $1 AND NOT is_deleted AND ($2 OR is_latest)
            ORDER BY filename ASC, version DESC
            "#,
        )
        .bind(bug_id.as_uuid())
        .bind(include_history)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "list attachments"))?;

        Ok(rows.into_iter().map(Attachment::from).collect())
    }

    async fn create_attachment(
        &self,
        attachment_id: AttachmentId,
        bug_id: BugId,
        uploader_id: UserId,
        upload: AttachmentUpload,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Attachment>> {
        retry_serializable("create attachment", || {
            self.attempt_create_attachment(
                attachment_id,
                bug_id,
                uploader_id,
                upload.clone(),
                audit.clone(),
            )
        })
        .await
    }

    async fn soft_delete_attachment(
        &self,
        attachment_id: AttachmentId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Attachment>> {
        retry_serializable("soft delete attachment", || {
            self.attempt_soft_delete_attachment(attachment_id, audit.clone())
        })
        .await
    }
}

impl PostgresAttachmentRepository {
    async fn attempt_create_attachment(
        &self,
        attachment_id: AttachmentId,
        bug_id: BugId,
        uploader_id: UserId,
        upload: AttachmentUpload,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Attachment>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        // Uploads to one bug are serialized so version numbers stay dense.
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM bugs WHERE id = $1 FOR UPDATE")
            .bind(bug_id.as_uuid())
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| map_sqlx_error(error, "lock bug"))?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("bug '{bug_id}' not found")));
        }

        let version = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT COALESCE(MAX(version), 0) + 1
            FROM attachments
            WHERE bug_id = $1 AND filename = $2
            "#,
        )
        .bind(bug_id.as_uuid())
        .bind(upload.filename())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "compute attachment version"))?;

        sqlx::query(
            r#"
            UPDATE attachments
            SET is_latest = FALSE
            WHERE bug_id = $1 AND filename = $2 AND is_latest
            "#,
        )
        .bind(bug_id.as_uuid())
        .bind(upload.filename())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "demote previous attachment versions"))?;

        let row = sqlx::query_as::<_, AttachmentRow>(
            r#"
            INSERT INTO attachments (
                id, bug_id, uploader_id, filename, storage_path, mime_type,
                size_bytes, version, is_latest
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            RETURNING id, bug_id, uploader_id, filename, storage_path, mime_type,
                      size_bytes, version, is_latest, is_deleted, uploaded_at
            "#,
        )
        .bind(attachment_id.as_uuid())
        .bind(bug_id.as_uuid())
        .bind(uploader_id.as_uuid())
        .bind(upload.filename())
        .bind(upload.storage_path())
        .bind(upload.mime_type())
        .bind(upload.size_bytes())
        .bind(version)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "create attachment"))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit attachment upload").await?;

        Ok(Committed::new(Attachment::from(row), sequence))
    }

    async fn attempt_soft_delete_attachment(
        &self,
        attachment_id: AttachmentId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Attachment>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let row = sqlx::query_as::<_, AttachmentRow>(
            r#"
            UPDATE attachments
            SET is_deleted = TRUE, is_latest = FALSE
            WHERE id = $1 AND NOT is_deleted
            RETURNING id, bug_id, uploader_id, filename, storage_path, mime_type,
                      size_bytes, version, is_latest, is_deleted, uploaded_at
            "#,
        )
        .bind(attachment_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "delete attachment"))?
        .ok_or_else(|| {
            AppError::NotFound(format!("attachment '{attachment_id}' not found"))
        })?;

        sqlx::query(
            r#"
            UPDATE attachments
            SET is_latest = TRUE
            WHERE id = (
                SELECT id FROM attachments
                WHERE bug_id = $1 AND filename = $2 AND NOT is_deleted
                ORDER BY version DESC
                LIMIT 1
            )
            AND NOT EXISTS (
                SELECT 1 FROM attachments
                WHERE bug_id = $1 AND filename = $2 AND is_latest
            )
            "#,
        )
        .bind(row.bug_id)
        .bind(&row.filename)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "promote attachment version"))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit attachment deletion").await?;

        Ok(Committed::new(Attachment::from(row), sequence))
    }
}
