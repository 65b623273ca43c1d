use bugzot_application::{
    AttachmentService, AuditService, BugService, CommentService, IdentityService, ProductService,
    UserService,
};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub identity_service: IdentityService,
    pub user_service: UserService,
    pub product_service: ProductService,
    pub bug_service: BugService,
    pub comment_service: CommentService,
    pub attachment_service: AttachmentService,
    pub audit_service: AuditService,
    pub postgres_pool: Option<PgPool>,
    pub redis_client: Option<redis::Client>,
}
