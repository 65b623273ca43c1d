//! PostgreSQL-backed append-only audit log.

use async_trait::async_trait;
use bugzot_application::{AuditQuery, AuditRepository};
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{AuditEntry, NewAuditEntry, UserId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::postgres_support::{append_audit_entry, map_sqlx_error, page_bound};

/// PostgreSQL implementation of the audit repository port.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditRow {
    sequence: i64,
    actor_id: Option<Uuid>,
    action: String,
    target_type: String,
    target_id: Option<Uuid>,
    decision: String,
    reason: String,
    detail: Option<Value>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = AppError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(Self {
            sequence: row.sequence,
            actor_id: row.actor_id.map(UserId::from_uuid),
            action: row.action,
            target_type: row.target_type.parse()?,
            target_id: row.target_id,
            decision: row.decision.parse()?,
            reason: row.reason,
            detail: row.detail,
            recorded_at: row.recorded_at,
        })
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_entry(&self, entry: NewAuditEntry) -> AppResult<i64> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::AuditWriteFailure(format!("failed to begin: {error}")))?;

        let sequence = append_audit_entry(&mut transaction, &entry).await?;

        transaction
            .commit()
            .await
            .map_err(|error| AppError::AuditWriteFailure(format!("failed to commit: {error}")))?;

        Ok(sequence)
    }

    async fn list_entries(&self, query: &AuditQuery) -> AppResult<Vec<AuditEntry>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT sequence, actor_id, action, target_type, target_id, decision, reason, detail, recorded_at FROM audit_entries WHERE TRUE",
        );

        if let Some(target_type) = query.target_type {
            builder.push(" AND target_type = ");
            builder.push_bind(target_type.as_str());
        }
        if let Some(target_id) = query.target_id {
            builder.push(" AND target_id = ");
            builder.push_bind(target_id);
        }
        if let Some(actor_id) = query.actor_id {
            builder.push(" AND actor_id = ");
            builder.push_bind(actor_id.as_uuid());
        }
        if let Some(action) = &query.action {
            builder.push(" AND action = ");
            builder.push_bind(action.clone());
        }
        if let Some(decision) = query.decision {
            builder.push(" AND decision = ");
            builder.push_bind(decision.as_str());
        }
        if let Some(after_sequence) = query.after_sequence {
            builder.push(" AND sequence > ");
            builder.push_bind(after_sequence);
        }

        builder.push(" ORDER BY sequence ASC LIMIT ");
        builder.push_bind(page_bound(query.limit));

        let rows = builder
            .build_query_as::<AuditRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| map_sqlx_error(error, "list audit entries"))?;

        rows.into_iter().map(AuditEntry::try_from).collect()
    }
}
