use bugzot_application::{BugChanges, BugListQuery, NewBugParams};
use bugzot_domain::{BugId, BugPriority, BugStatus, ProductId, UserId};

use super::*;
use crate::dto::{BugResponse, CreateBugRequest, TransitionStatusRequest, UpdateBugRequest};

#[derive(Debug, Deserialize)]
pub struct ListBugsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list_bugs_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
    Query(query): Query<ListBugsQuery>,
) -> ApiResult<Json<Vec<BugResponse>>> {
    let bugs = state
        .bug_service
        .list_bugs(
            &actor,
            product_id.parse::<ProductId>()?,
            BugListQuery {
                status: query
                    .status
                    .as_deref()
                    .map(str::parse::<BugStatus>)
                    .transpose()?,
                limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
                offset: query.offset.unwrap_or(0),
            },
        )
        .await?
        .into_iter()
        .map(BugResponse::from)
        .collect();

    Ok(Json(bugs))
}

pub async fn create_bug_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
    Json(payload): Json<CreateBugRequest>,
) -> ApiResult<(StatusCode, Json<BugResponse>)> {
    let bug = state
        .bug_service
        .create_bug(
            &actor,
            product_id.parse::<ProductId>()?,
            NewBugParams {
                title: payload.title,
                description: payload.description,
                priority: payload
                    .priority
                    .as_deref()
                    .map(str::parse::<BugPriority>)
                    .transpose()?,
                assignee_id: payload
                    .assignee_id
                    .as_deref()
                    .map(str::parse::<UserId>)
                    .transpose()?,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(BugResponse::from(bug))))
}

pub async fn get_bug_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bug_id): Path<String>,
) -> ApiResult<Json<BugResponse>> {
    let bug = state
        .bug_service
        .get_bug(&actor, bug_id.parse::<BugId>()?)
        .await?;

    Ok(Json(BugResponse::from(bug)))
}

pub async fn update_bug_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bug_id): Path<String>,
    Json(payload): Json<UpdateBugRequest>,
) -> ApiResult<Json<BugResponse>> {
    let assignee_id = match payload.assignee_id {
        Some(Some(value)) => Some(Some(value.parse::<UserId>()?)),
        Some(None) => Some(None),
        None => None,
    };

    let bug = state
        .bug_service
        .update_bug(
            &actor,
            bug_id.parse::<BugId>()?,
            BugChanges {
                title: payload.title,
                description: payload.description,
                priority: payload
                    .priority
                    .as_deref()
                    .map(str::parse::<BugPriority>)
                    .transpose()?,
                assignee_id,
            },
        )
        .await?;

    Ok(Json(BugResponse::from(bug)))
}

pub async fn transition_status_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bug_id): Path<String>,
    Json(payload): Json<TransitionStatusRequest>,
) -> ApiResult<Json<BugResponse>> {
    let bug = state
        .bug_service
        .transition_status(
            &actor,
            bug_id.parse::<BugId>()?,
            payload.status.parse::<BugStatus>()?,
        )
        .await?;

    Ok(Json(BugResponse::from(bug)))
}

pub async fn delete_bug_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bug_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .bug_service
        .delete_bug(&actor, bug_id.parse::<BugId>()?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
