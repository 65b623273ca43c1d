//! PostgreSQL-backed bug repository.

use async_trait::async_trait;
use bugzot_application::{BugChanges, BugListQuery, BugRepository, Committed};
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{Bug, BugId, BugStatus, NewAuditEntry, ProductId, UserId};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::postgres_support::{
    append_audit_entry, begin_serializable, commit, map_sqlx_error, page_bound, retry_serializable,
};

/// PostgreSQL implementation of the bug repository port.
#[derive(Clone)]
pub struct PostgresBugRepository {
    pool: PgPool,
}

impl PostgresBugRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BugRow {
    id: Uuid,
    product_id: Uuid,
    reporter_id: Uuid,
    assignee_id: Option<Uuid>,
    title: String,
    description: String,
    status: String,
    priority: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BugRow> for Bug {
    type Error = AppError;

    fn try_from(row: BugRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BugId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            reporter_id: UserId::from_uuid(row.reporter_id),
            assignee_id: row.assignee_id.map(UserId::from_uuid),
            title: row.title,
            description: row.description,
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl BugRepository for PostgresBugRepository {
    async fn find_bug(&self, bug_id: BugId) -> AppResult<Option<Bug>> {
        let row = sqlx::query_as::<_, BugRow>(
            r#"
            SELECT id, product_id, reporter_id, assignee_id, title, description,
                   status, priority, created_at, updated_at
            FROM bugs
            WHERE id = $1
            "#,
        )
        .bind(bug_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "find bug"))?;

        row.map(Bug::try_from).transpose()
    }

    async fn list_bugs(&self, product_id: ProductId, query: BugListQuery) -> AppResult<Vec<Bug>> {
        let rows = sqlx::query_as::<_, BugRow>(
            r#"
            SELECT id, product_id, reporter_id, assignee_id, title, description,
                   status, priority, created_at, updated_at
            FROM bugs
            WHERE product_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC, id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(query.status.map(|status| status.as_str()))
        .bind(page_bound(query.limit))
        .bind(page_bound(query.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "list bugs"))?;

        rows.into_iter().map(Bug::try_from).collect()
    }

    async fn create_bug(&self, bug: Bug, audit: NewAuditEntry) -> AppResult<Committed<Bug>> {
        retry_serializable("create bug", || {
            self.attempt_create_bug(bug.clone(), audit.clone())
        })
        .await
    }

    async fn update_bug(
        &self,
        bug_id: BugId,
        changes: BugChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Bug>> {
        retry_serializable("update bug", || {
            self.attempt_update_bug(bug_id, changes.clone(), audit.clone())
        })
        .await
    }

    async fn transition_status(
        &self,
        bug_id: BugId,
        next: BugStatus,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Bug>> {
        retry_serializable("transition status", || {
            self.attempt_transition_status(bug_id, next, audit.clone())
        })
        .await
    }

    async fn delete_bug(&self, bug_id: BugId, audit: NewAuditEntry) -> AppResult<Committed<()>> {
        retry_serializable("delete bug", || self.attempt_delete_bug(bug_id, audit.clone())).await
    }
}

impl PostgresBugRepository {
    async fn attempt_create_bug(
        &self,
        bug: Bug,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Bug>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        // Blocks a concurrent soft delete or deactivation until this insert commits.
        let is_active = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT is_active FROM products
            WHERE id = $1 AND NOT is_deleted
            FOR SHARE
            "#,
        )
        .bind(bug.product_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "lock product"))?
        .ok_or_else(|| {
            AppError::NotFound(format!("product '{}' not found", bug.product_id))
        })?;
        if !is_active {
            return Err(AppError::Conflict(format!(
                "product '{}' is not accepting new bugs",
                bug.product_id
            )));
        }

        let row = sqlx::query_as::<_, BugRow>(
            r#"
            INSERT INTO bugs (
                id, product_id, reporter_id, assignee_id, title, description,
                status, priority, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id, product_id, reporter_id, assignee_id, title, description,
                      status, priority, created_at, updated_at
            "#,
        )
        .bind(bug.id.as_uuid())
        .bind(bug.product_id.as_uuid())
        .bind(bug.reporter_id.as_uuid())
        .bind(bug.assignee_id.map(|assignee_id| assignee_id.as_uuid()))
        .bind(&bug.title)
        .bind(&bug.description)
        .bind(bug.status.as_str())
        .bind(bug.priority.as_str())
        .bind(bug.created_at)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "create bug"))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit bug creation").await?;

        Ok(Committed::new(Bug::try_from(row)?, sequence))
    }

    async fn attempt_update_bug(
        &self,
        bug_id: BugId,
        changes: BugChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Bug>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let changes_assignee = changes.assignee_id.is_some();
        let row = sqlx::query_as::<_, BugRow>(
            r#"
            UPDATE bugs
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                assignee_id = CASE WHEN $5 THEN $6 ELSE assignee_id END,
                updated_at = now()
            WHERE id = $1
            RETURNING id, product_id, reporter_id, assignee_id, title, description,
                      status, priority, created_at, updated_at
            "#,
        )
        .bind(bug_id.as_uuid())
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.priority.map(|priority| priority.as_str()))
        .bind(changes_assignee)
        .bind(
            changes
                .assignee_id
                .flatten()
                .map(|assignee_id| assignee_id.as_uuid()),
        )
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "update bug"))?
        .ok_or_else(|| bug_not_found(bug_id))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit bug update").await?;

        Ok(Committed::new(Bug::try_from(row)?, sequence))
    }

    async fn attempt_transition_status(
        &self,
        bug_id: BugId,
        next: BugStatus,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Bug>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let current = sqlx::query_scalar::<_, String>(
            r#"
            SELECT status FROM bugs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(bug_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "lock bug"))?
        .ok_or_else(|| bug_not_found(bug_id))?
        .parse::<BugStatus>()?;

        let next = current.transition_to(next)?;

        let row = sqlx::query_as::<_, BugRow>(
            r#"
            UPDATE bugs
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, product_id, reporter_id, assignee_id, title, description,
                      status, priority, created_at, updated_at
            "#,
        )
        .bind(bug_id.as_uuid())
        .bind(next.as_str())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "transition bug status"))?;

        let audit = audit.with_detail(json!({ "from": current.as_str(), "to": next.as_str() }));
        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit bug status transition").await?;

        Ok(Committed::new(Bug::try_from(row)?, sequence))
    }

    async fn attempt_delete_bug(
        &self,
        bug_id: BugId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<()>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        // Comments and attachments cascade.
        let deleted = sqlx::query("DELETE FROM bugs WHERE id = $1")
            .bind(bug_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| map_sqlx_error(error, "delete bug"))?;
        if deleted.rows_affected() == 0 {
            return Err(bug_not_found(bug_id));
        }

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit bug deletion").await?;

        Ok(Committed::new((), sequence))
    }
}

fn bug_not_found(bug_id: BugId) -> AppError {
    AppError::NotFound(format!("bug '{bug_id}' not found"))
}
