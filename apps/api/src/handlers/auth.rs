use axum::http::HeaderMap;
use bugzot_application::{Authenticated, LoginParams, RegisterParams};

use super::*;
use crate::dto::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};

pub async fn register_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .user_service
        .register(RegisterParams {
            email: payload.email,
            password: payload.password,
            display_name: payload.display_name,
            client_ip: client_ip(&headers),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let outcome = state
        .user_service
        .login(LoginParams {
            email: payload.email,
            password: payload.password,
            client_ip: client_ip(&headers),
        })
        .await?;

    Ok(Json(LoginResponse::from(outcome)))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(authenticated): Extension<Authenticated>,
) -> ApiResult<StatusCode> {
    state.user_service.logout(&authenticated).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.user_service.me(&actor).await?;
    Ok(Json(UserResponse::from(user)))
}

/// First hop of `x-forwarded-for`, as set by the fronting proxy.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
