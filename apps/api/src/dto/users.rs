use bugzot_application::Page;
use bugzot_domain::{Role, User};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::MembershipResponse;

/// API representation of a user account.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-response.ts"
)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub status: String,
    pub memberships: Vec<MembershipResponse>,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        Self {
            id: value.id.to_string(),
            email: value.email.as_str().to_owned(),
            display_name: value.display_name,
            role: value.role.as_str().to_owned(),
            status: value.status.as_str().to_owned(),
            memberships: value
                .memberships
                .into_iter()
                .map(MembershipResponse::from)
                .collect(),
            last_login_at: value.last_login_at.map(|timestamp| timestamp.to_rfc3339()),
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

/// Incoming payload for a global role change.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-role-request.ts"
)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// One page of the user directory.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-page-response.ts"
)]
pub struct UserPageResponse {
    pub data: Vec<UserResponse>,
    #[ts(type = "number")]
    pub total: u64,
    #[ts(type = "number")]
    pub limit: usize,
    #[ts(type = "number")]
    pub offset: usize,
}

impl UserPageResponse {
    pub fn new(page: Page<User>, limit: usize, offset: usize) -> Self {
        Self {
            data: page.items.into_iter().map(UserResponse::from).collect(),
            total: page.total,
            limit,
            offset,
        }
    }
}

/// Administrator edit of a profile; absent fields stay unchanged.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-user-request.ts"
)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// A role of the hierarchy, lowest `rank` first.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub name: &'static str,
    pub rank: u8,
    pub description: &'static str,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            name: value.as_str(),
            rank: value.rank(),
            description: value.description(),
        }
    }
}
