use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bugzot_application::AuditQuery;
use bugzot_core::AppError;
use bugzot_domain::{AuditDecision, ResourceKind, UserId};
use futures::StreamExt;
use tracing::warn;
use uuid::Uuid;

use super::*;
use crate::dto::{AuditEntryResponse, AuditPageResponse};

/// Filters accepted by the audit endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct AuditQueryParams {
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub decision: Option<String>,
    pub after: Option<i64>,
    pub limit: Option<usize>,
}

impl AuditQueryParams {
    fn into_query(self) -> Result<AuditQuery, AppError> {
        let target_id = self
            .target_id
            .as_deref()
            .map(|value| {
                Uuid::parse_str(value).map_err(|error| {
                    AppError::Validation(format!("invalid target_id '{value}': {error}"))
                })
            })
            .transpose()?;

        Ok(AuditQuery {
            target_type: self
                .target_type
                .as_deref()
                .map(str::parse::<ResourceKind>)
                .transpose()?,
            target_id,
            actor_id: self
                .actor_id
                .as_deref()
                .map(str::parse::<UserId>)
                .transpose()?,
            action: self.action,
            decision: self
                .decision
                .as_deref()
                .map(str::parse::<AuditDecision>)
                .transpose()?,
            after_sequence: self.after,
            limit: self.limit.unwrap_or_default(),
        })
    }
}

pub async fn list_audit_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<AuditQueryParams>,
) -> ApiResult<Json<AuditPageResponse>> {
    let page = state
        .audit_service
        .query_page(&actor, params.into_query()?)
        .await?;

    Ok(Json(AuditPageResponse::from(page)))
}

/// Streams every matching entry as newline-delimited JSON.
pub async fn export_audit_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<AuditQueryParams>,
) -> ApiResult<Response> {
    let entries = state
        .audit_service
        .query_audit_for(&actor, params.into_query()?)
        .await?;

    let lines = entries.map(|entry| {
        let entry = entry.inspect_err(|error| warn!(error = %error, "audit export aborted"))?;
        let mut line = serde_json::to_vec(&AuditEntryResponse::from(entry))
            .map_err(|error| AppError::Internal(format!("failed to encode audit entry: {error}")))?;
        line.push(b'\n');
        Ok::<_, AppError>(Bytes::from(line))
    });

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}
