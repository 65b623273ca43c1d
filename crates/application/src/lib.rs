//! Application services and ports.
//!
//! Services enforce the access policy through [`AuthorizationService`] and
//! hand every mutation to a repository port together with its audit entry.

#![forbid(unsafe_code)]

mod attachment_service;
mod audit_service;
mod authorization_service;
mod bug_service;
mod comment_service;
mod identity_service;
mod ports;
mod product_service;
mod rate_limit_service;
mod user_service;

#[cfg(test)]
mod test_support;

pub use attachment_service::AttachmentService;
pub use audit_service::{AUDIT_PAGE_DEFAULT, AUDIT_PAGE_MAX, AuditPage, AuditService};
pub use authorization_service::AuthorizationService;
pub use bug_service::{BUG_PAGE_MAX, BugService, NewBugParams};
pub use comment_service::CommentService;
pub use identity_service::{Authenticated, IdentityService};
pub use ports::{
    ActorCache, AttachmentRepository, AttemptInfo, AuditQuery, AuditRepository, BugChanges,
    BugListQuery, BugRepository, CommentRepository, Committed, IssuedToken, NewUserRecord, Page,
    PasswordHasher, ProductChanges, ProductFilter, ProductMember, ProductRepository,
    RateLimitRepository, SortDirection, TokenClaims, TokenCodec, TokenRevocationStore,
    UserCredentials, UserListQuery, UserProfileChanges, UserRepository, UserSortField,
};
pub use product_service::{PRODUCT_PAGE_MAX, ProductListQuery, ProductService};
pub use rate_limit_service::{RateLimitRule, RateLimitService};
pub use user_service::{
    AuthRateLimits, LoginOutcome, LoginParams, ProfileUpdateParams, RegisterParams, USER_PAGE_MAX,
    UserService,
};
