use bugzot_domain::{AttachmentId, AttachmentUpload, BugId};

use super::*;
use crate::dto::{AttachmentResponse, CreateAttachmentRequest};

#[derive(Debug, Default, Deserialize)]
pub struct ListAttachmentsQuery {
    #[serde(default)]
    pub include_history: bool,
}

pub async fn list_attachments_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bug_id): Path<String>,
    Query(query): Query<ListAttachmentsQuery>,
) -> ApiResult<Json<Vec<AttachmentResponse>>> {
    let attachments = state
        .attachment_service
        .list_attachments(&actor, bug_id.parse::<BugId>()?, query.include_history)
        .await?
        .into_iter()
        .map(AttachmentResponse::from)
        .collect();

    Ok(Json(attachments))
}

pub async fn create_attachment_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bug_id): Path<String>,
    Json(payload): Json<CreateAttachmentRequest>,
) -> ApiResult<(StatusCode, Json<AttachmentResponse>)> {
    let upload = AttachmentUpload::new(
        payload.filename,
        payload.storage_path,
        payload.mime_type,
        payload.size_bytes,
    )?;
    let attachment = state
        .attachment_service
        .create_attachment(&actor, bug_id.parse::<BugId>()?, upload)
        .await?;

    Ok((StatusCode::CREATED, Json(AttachmentResponse::from(attachment))))
}

pub async fn get_attachment_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(attachment_id): Path<String>,
) -> ApiResult<Json<AttachmentResponse>> {
    let attachment = state
        .attachment_service
        .get_attachment(&actor, attachment_id.parse::<AttachmentId>()?)
        .await?;

    Ok(Json(AttachmentResponse::from(attachment)))
}

pub async fn delete_attachment_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(attachment_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .attachment_service
        .delete_attachment(&actor, attachment_id.parse::<AttachmentId>()?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
