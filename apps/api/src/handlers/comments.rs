use bugzot_domain::{BugId, CommentId, CommentVisibility};

use super::*;
use crate::dto::{CommentResponse, CreateCommentRequest, UpdateCommentRequest};

pub async fn list_comments_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bug_id): Path<String>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let comments = state
        .comment_service
        .list_comments(&actor, bug_id.parse::<BugId>()?)
        .await?
        .into_iter()
        .map(CommentResponse::from)
        .collect();

    Ok(Json(comments))
}

pub async fn create_comment_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bug_id): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    let visibility = payload
        .visibility
        .as_deref()
        .map(str::parse::<CommentVisibility>)
        .transpose()?
        .unwrap_or(CommentVisibility::Public);

    let comment = state
        .comment_service
        .create_comment(&actor, bug_id.parse::<BugId>()?, payload.body, visibility)
        .await?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

pub async fn get_comment_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(comment_id): Path<String>,
) -> ApiResult<Json<CommentResponse>> {
    let comment = state
        .comment_service
        .get_comment(&actor, comment_id.parse::<CommentId>()?)
        .await?;

    Ok(Json(CommentResponse::from(comment)))
}

pub async fn update_comment_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(comment_id): Path<String>,
    Json(payload): Json<UpdateCommentRequest>,
) -> ApiResult<Json<CommentResponse>> {
    let comment = state
        .comment_service
        .update_comment(&actor, comment_id.parse::<CommentId>()?, payload.body)
        .await?;

    Ok(Json(CommentResponse::from(comment)))
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(comment_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .comment_service
        .delete_comment(&actor, comment_id.parse::<CommentId>()?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
