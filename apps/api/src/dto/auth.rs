use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::UserResponse;

/// Incoming payload for self-registration.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/register-request.ts"
)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Incoming payload for password login.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/login-request.ts"
)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued access token and the authenticated profile.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/login-response.ts"
)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: String,
    pub user: UserResponse,
}

impl From<bugzot_application::LoginOutcome> for LoginResponse {
    fn from(value: bugzot_application::LoginOutcome) -> Self {
        Self {
            access_token: value.token.token,
            token_type: "Bearer",
            expires_at: value.token.claims.expires_at.to_rfc3339(),
            user: UserResponse::from(value.user),
        }
    }
}
