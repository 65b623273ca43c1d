use std::str::FromStr;

use bugzot_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Attachment, Bug, Comment, CommentVisibility, ProductId, ProductMembership, Role, UserId,
};

/// Operations subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read a resource.
    Read,
    /// Create a resource.
    Create,
    /// Modify a resource.
    Update,
    /// Remove a resource.
    Delete,
    /// Add a comment.
    Comment,
    /// Move a bug along the workflow graph.
    TransitionStatus,
    /// Add, change or remove product members.
    ManageMembers,
}

impl Action {
    /// Returns a stable storage value for the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Comment => "comment",
            Self::TransitionStatus => "transition_status",
            Self::ManageMembers => "manage_members",
        }
    }

    /// Returns all actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Action] = &[
            Action::Read,
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::Comment,
            Action::TransitionStatus,
            Action::ManageMembers,
        ];

        ALL
    }
}

/// Kinds of protected resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Product records and their memberships.
    Product,
    /// Bug records.
    Bug,
    /// Bug comments.
    Comment,
    /// Attachment metadata.
    Attachment,
    /// User accounts.
    User,
    /// The audit log itself.
    AuditLog,
}

impl ResourceKind {
    /// Returns a stable storage value for the resource kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Bug => "bug",
            Self::Comment => "comment",
            Self::Attachment => "attachment",
            Self::User => "user",
            Self::AuditLog => "audit_log",
        }
    }

    /// Returns all resource kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[ResourceKind] = &[
            ResourceKind::Product,
            ResourceKind::Bug,
            ResourceKind::Comment,
            ResourceKind::Attachment,
            ResourceKind::User,
            ResourceKind::AuditLog,
        ];

        ALL
    }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "product" => Ok(Self::Product),
            "bug" => Ok(Self::Bug),
            "comment" => Ok(Self::Comment),
            "attachment" => Ok(Self::Attachment),
            "user" => Ok(Self::User),
            "audit_log" => Ok(Self::AuditLog),
            _ => Err(AppError::Validation(format!(
                "unknown resource type '{value}'"
            ))),
        }
    }
}

/// The authenticated caller as seen by the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user_id: UserId,
    role: Role,
    memberships: Vec<ProductMembership>,
}

impl Actor {
    /// Creates an actor from resolved identity data.
    #[must_use]
    pub fn new(user_id: UserId, role: Role, memberships: Vec<ProductMembership>) -> Self {
        Self {
            user_id,
            role,
            memberships,
        }
    }

    /// Returns the user id.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the global role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns product memberships.
    #[must_use]
    pub fn memberships(&self) -> &[ProductMembership] {
        &self.memberships
    }

    /// Returns whether the actor holds the global admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns the membership for a product, if any.
    #[must_use]
    pub fn membership(&self, product_id: ProductId) -> Option<&ProductMembership> {
        self.memberships
            .iter()
            .find(|membership| membership.product_id == product_id)
    }

    /// Returns the per-product override if present, otherwise the global role.
    #[must_use]
    pub fn effective_role(&self, product_id: Option<ProductId>) -> Role {
        product_id
            .and_then(|product_id| self.membership(product_id))
            .and_then(|membership| membership.role_override)
            .unwrap_or(self.role)
    }
}

/// What an authorization check is evaluated against.
///
/// `id` is `None` for resources that do not exist yet (creation checks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceTarget {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource identifier when the resource exists.
    pub id: Option<Uuid>,
    /// Product scoping the resource, if any.
    pub owning_product: Option<ProductId>,
    /// Reporter, author, uploader or account holder.
    pub owner: Option<UserId>,
    /// Comment visibility, for comment resources.
    pub visibility: Option<CommentVisibility>,
}

impl ResourceTarget {
    /// Targets the product collection (product creation).
    #[must_use]
    pub fn product_collection() -> Self {
        Self::unscoped(ResourceKind::Product)
    }

    /// Targets an existing product. A product is scoped to itself.
    #[must_use]
    pub fn product(product_id: ProductId) -> Self {
        Self {
            kind: ResourceKind::Product,
            id: Some(product_id.as_uuid()),
            owning_product: Some(product_id),
            owner: None,
            visibility: None,
        }
    }

    /// Targets the bug collection of a product (bug creation and listing).
    #[must_use]
    pub fn bugs_of(product_id: ProductId) -> Self {
        Self {
            kind: ResourceKind::Bug,
            id: None,
            owning_product: Some(product_id),
            owner: None,
            visibility: None,
        }
    }

    /// Targets an existing bug owned by its reporter.
    #[must_use]
    pub fn bug(bug: &Bug) -> Self {
        Self {
            kind: ResourceKind::Bug,
            id: Some(bug.id.as_uuid()),
            owning_product: Some(bug.product_id),
            owner: Some(bug.reporter_id),
            visibility: None,
        }
    }

    /// Targets a new comment of the given visibility on a bug.
    #[must_use]
    pub fn new_comment(bug: &Bug, visibility: CommentVisibility) -> Self {
        Self {
            kind: ResourceKind::Comment,
            id: None,
            owning_product: Some(bug.product_id),
            owner: None,
            visibility: Some(visibility),
        }
    }

    /// Targets the comment thread of a bug. Reading the thread needs the
    /// same access as reading its public comments.
    #[must_use]
    pub fn comments_of(bug: &Bug) -> Self {
        Self {
            kind: ResourceKind::Comment,
            id: None,
            owning_product: Some(bug.product_id),
            owner: None,
            visibility: Some(CommentVisibility::Public),
        }
    }

    /// Targets an existing comment owned by its author.
    #[must_use]
    pub fn comment(comment: &Comment, product_id: ProductId) -> Self {
        Self {
            kind: ResourceKind::Comment,
            id: Some(comment.id.as_uuid()),
            owning_product: Some(product_id),
            owner: Some(comment.author_id),
            visibility: Some(comment.visibility),
        }
    }

    /// Targets the attachment collection of a bug.
    #[must_use]
    pub fn attachments_of(bug: &Bug) -> Self {
        Self {
            kind: ResourceKind::Attachment,
            id: None,
            owning_product: Some(bug.product_id),
            owner: None,
            visibility: None,
        }
    }

    /// Targets existing attachment metadata owned by its uploader.
    #[must_use]
    pub fn attachment(attachment: &Attachment, product_id: ProductId) -> Self {
        Self {
            kind: ResourceKind::Attachment,
            id: Some(attachment.id.as_uuid()),
            owning_product: Some(product_id),
            owner: Some(attachment.uploader_id),
            visibility: None,
        }
    }

    /// Targets a user account owned by its holder.
    #[must_use]
    pub fn user(user_id: UserId) -> Self {
        Self {
            kind: ResourceKind::User,
            id: Some(user_id.as_uuid()),
            owning_product: None,
            owner: Some(user_id),
            visibility: None,
        }
    }

    /// Targets the user directory.
    #[must_use]
    pub fn user_collection() -> Self {
        Self::unscoped(ResourceKind::User)
    }

    /// Targets the audit log.
    #[must_use]
    pub fn audit_log() -> Self {
        Self::unscoped(ResourceKind::AuditLog)
    }

    fn unscoped(kind: ResourceKind) -> Self {
        Self {
            kind,
            id: None,
            owning_product: None,
            owner: None,
            visibility: None,
        }
    }
}

/// Stable reason codes attached to every authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Actor is a global admin.
    AdminOverride,
    /// Effective role meets the rule minimum.
    RoleSufficient,
    /// Actor owns the resource and meets the owner minimum.
    OwnerAccess,
    /// Resource belongs to a product the actor is not a member of.
    NotProductMember,
    /// No rule covers the resource, action and visibility.
    NoMatchingRule,
    /// Effective role is below every applicable minimum.
    InsufficientRole,
}

impl DecisionReason {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdminOverride => "admin_override",
            Self::RoleSufficient => "role_sufficient",
            Self::OwnerAccess => "owner_access",
            Self::NotProductMember => "not_product_member",
            Self::NoMatchingRule => "no_matching_rule",
            Self::InsufficientRole => "insufficient_role",
        }
    }
}

/// Outcome of a policy evaluation. A denial is a normal value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum AccessDecision {
    /// Permitted.
    Allow(DecisionReason),
    /// Rejected.
    Deny(DecisionReason),
}

impl AccessDecision {
    /// Returns whether the decision permits the action.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// Returns the reason code.
    #[must_use]
    pub fn reason(&self) -> DecisionReason {
        match self {
            Self::Allow(reason) | Self::Deny(reason) => *reason,
        }
    }
}
