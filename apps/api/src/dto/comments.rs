use bugzot_domain::Comment;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for posting a comment. Visibility defaults to public.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-comment-request.ts"
)]
pub struct CreateCommentRequest {
    pub body: String,
    pub visibility: Option<String>,
}

/// Incoming payload for editing a comment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-comment-request.ts"
)]
pub struct UpdateCommentRequest {
    pub body: String,
}

/// API representation of a comment.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/comment-response.ts"
)]
pub struct CommentResponse {
    pub id: String,
    pub bug_id: String,
    pub author_id: String,
    pub visibility: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(value: Comment) -> Self {
        Self {
            id: value.id.to_string(),
            bug_id: value.bug_id.to_string(),
            author_id: value.author_id.to_string(),
            visibility: value.visibility.as_str().to_owned(),
            body: value.body,
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}
