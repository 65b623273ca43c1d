use bugzot_application::{
    ProfileUpdateParams, SortDirection, USER_PAGE_MAX, UserListQuery, UserSortField,
};
use bugzot_domain::{Role, UserId, UserStatus};

use super::*;
use crate::dto::{
    RoleResponse, UpdateRoleRequest, UpdateUserRequest, UserPageResponse, UserResponse,
};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<UserPageResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, USER_PAGE_MAX);
    let offset = query.offset.unwrap_or(0);
    let list_query = UserListQuery {
        limit,
        offset,
        search: query.search,
        status: query.is_active.map(|is_active| {
            if is_active {
                UserStatus::Active
            } else {
                UserStatus::Disabled
            }
        }),
        sort_by: query
            .sort_by
            .as_deref()
            .map(str::parse::<UserSortField>)
            .transpose()?
            .unwrap_or_default(),
        sort_dir: query
            .sort_dir
            .as_deref()
            .map(str::parse::<SortDirection>)
            .transpose()?
            .unwrap_or(SortDirection::Desc),
    };

    let page = state.user_service.list_users(&actor, list_query).await?;

    Ok(Json(UserPageResponse::new(page, limit, offset)))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .user_service
        .update_profile(
            &actor,
            user_id.parse::<UserId>()?,
            ProfileUpdateParams {
                email: payload.email,
                display_name: payload.display_name,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn list_roles_handler() -> Json<Vec<RoleResponse>> {
    Json(Role::all().iter().copied().map(RoleResponse::from).collect())
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .user_service
        .get_user(&actor, user_id.parse::<UserId>()?)
        .await?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn update_user_role_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .user_service
        .set_role(
            &actor,
            user_id.parse::<UserId>()?,
            payload.role.parse::<Role>()?,
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn disable_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .user_service
        .disable_user(&actor, user_id.parse::<UserId>()?)
        .await?;

    Ok(Json(UserResponse::from(user)))
}
