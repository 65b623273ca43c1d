//! Domain entities, the role hierarchy, the bug workflow graph and the
//! access policy.

#![forbid(unsafe_code)]

mod attachment;
mod audit;
mod bug;
mod comment;
mod ids;
mod policy;
mod product;
mod role;
mod security;
mod user;

pub use attachment::{ATTACHMENT_FILENAME_MAX_LENGTH, Attachment, AttachmentUpload};
pub use audit::{AuditAction, AuditDecision, AuditEntry, NewAuditEntry};
pub use bug::{BUG_TITLE_MAX_LENGTH, Bug, BugPriority, BugStatus, validate_bug_title};
pub use comment::{
    COMMENT_BODY_MAX_LENGTH, Comment, CommentVisibility, validate_comment_body,
};
pub use ids::{AttachmentId, BugId, CommentId, ProductId, UserId};
pub use policy::{POLICY_RULES, PolicyRule, authorize, select_rule};
pub use product::{NewProduct, PRODUCT_NAME_MAX_LENGTH, Product};
pub use role::Role;
pub use security::{AccessDecision, Action, Actor, DecisionReason, ResourceKind, ResourceTarget};
pub use user::{
    DISPLAY_NAME_MAX_LENGTH, EmailAddress, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH,
    ProductMembership, User, UserStatus, normalize_display_name, validate_password,
};
