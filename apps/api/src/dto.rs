use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

mod attachments;
mod audit;
mod auth;
mod bugs;
mod comments;
mod products;
mod users;

pub use attachments::{AttachmentResponse, CreateAttachmentRequest};
pub use audit::{AuditEntryResponse, AuditPageResponse};
pub use auth::{LoginRequest, LoginResponse, RegisterRequest};
pub use bugs::{BugResponse, CreateBugRequest, TransitionStatusRequest, UpdateBugRequest};
pub use comments::{CommentResponse, CreateCommentRequest, UpdateCommentRequest};
pub use products::{
    CreateProductRequest, MemberResponse, MembershipResponse, ProductPageResponse,
    ProductResponse, SetMemberRequest, UpdateProductRequest,
};
pub use users::{
    RoleResponse, UpdateRoleRequest, UpdateUserRequest, UserPageResponse, UserResponse,
};

/// Status of one backing service.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
    pub redis: HealthDependencyStatus,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
