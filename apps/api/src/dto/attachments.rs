use bugzot_domain::Attachment;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Metadata of an uploaded file. The bytes live wherever `storage_path` points.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-attachment-request.ts"
)]
pub struct CreateAttachmentRequest {
    pub filename: String,
    pub storage_path: String,
    pub mime_type: Option<String>,
    #[ts(type = "number")]
    pub size_bytes: i64,
}

/// API representation of one attachment version.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/attachment-response.ts"
)]
pub struct AttachmentResponse {
    pub id: String,
    pub bug_id: String,
    pub uploader_id: String,
    pub filename: String,
    pub storage_path: String,
    pub mime_type: Option<String>,
    #[ts(type = "number")]
    pub size_bytes: i64,
    pub version: i32,
    pub is_latest: bool,
    pub uploaded_at: String,
}

impl From<Attachment> for AttachmentResponse {
    fn from(value: Attachment) -> Self {
        Self {
            id: value.id.to_string(),
            bug_id: value.bug_id.to_string(),
            uploader_id: value.uploader_id.to_string(),
            filename: value.filename,
            storage_path: value.storage_path,
            mime_type: value.mime_type,
            size_bytes: value.size_bytes,
            version: value.version,
            is_latest: value.is_latest,
            uploaded_at: value.uploaded_at.to_rfc3339(),
        }
    }
}
