use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use bugzot_core::BearerCredential;
use http::HeaderName;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const REQUEST_ID_MAX_LENGTH: usize = 128;

/// Validates the bearer token and injects the `Authenticated` identity and
/// its `Actor` as request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let credential = BearerCredential::from_authorization_header(header_value)?;
    let authenticated = state.identity_service.validate(&credential).await?;

    request
        .extensions_mut()
        .insert(authenticated.actor.clone());
    request.extensions_mut().insert(authenticated);
    Ok(next.run(request).await)
}

/// Tags the request span with a request id, reusing a sane client-supplied one.
pub async fn request_id(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= REQUEST_ID_MAX_LENGTH)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
