//! Declarative access rules and the pure authorization function.
//!
//! Evaluation order:
//! 1. global admins are always allowed,
//! 2. product-scoped resources require product membership,
//! 3. the effective role is the membership override or the global role,
//! 4. the most specific rule for (resource, action, visibility) applies,
//! 5. the effective role must meet the rule minimum, or the owner minimum
//!    when the actor owns the resource.

use serde::Serialize;

use crate::{
    AccessDecision, Action, Actor, CommentVisibility, DecisionReason, ResourceKind,
    ResourceTarget, Role,
};

/// One row of the access rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PolicyRule {
    /// Resource kind the rule covers.
    pub resource: ResourceKind,
    /// Action the rule covers.
    pub action: Action,
    /// Visibility the rule is restricted to; `None` matches any.
    pub visibility: Option<CommentVisibility>,
    /// Minimum effective role.
    pub min_role: Role,
    /// Minimum effective role when the actor owns the resource.
    pub owner_min_role: Option<Role>,
}

const fn rule(resource: ResourceKind, action: Action, min_role: Role) -> PolicyRule {
    PolicyRule {
        resource,
        action,
        visibility: None,
        min_role,
        owner_min_role: None,
    }
}

const fn owned_rule(
    resource: ResourceKind,
    action: Action,
    min_role: Role,
    owner_min_role: Role,
) -> PolicyRule {
    PolicyRule {
        resource,
        action,
        visibility: None,
        min_role,
        owner_min_role: Some(owner_min_role),
    }
}

const fn visibility_rule(
    resource: ResourceKind,
    action: Action,
    visibility: CommentVisibility,
    min_role: Role,
) -> PolicyRule {
    PolicyRule {
        resource,
        action,
        visibility: Some(visibility),
        min_role,
        owner_min_role: None,
    }
}

/// The access rule table.
pub const POLICY_RULES: &[PolicyRule] = &[
    rule(ResourceKind::Product, Action::Read, Role::Viewer),
    rule(ResourceKind::Product, Action::Create, Role::Admin),
    rule(ResourceKind::Product, Action::Update, Role::Admin),
    rule(ResourceKind::Product, Action::Delete, Role::Admin),
    rule(ResourceKind::Product, Action::ManageMembers, Role::Admin),
    rule(ResourceKind::Bug, Action::Read, Role::Viewer),
    rule(ResourceKind::Bug, Action::Create, Role::Reporter),
    owned_rule(ResourceKind::Bug, Action::Update, Role::Maintainer, Role::Reporter),
    rule(ResourceKind::Bug, Action::TransitionStatus, Role::Maintainer),
    rule(ResourceKind::Bug, Action::Delete, Role::Maintainer),
    visibility_rule(
        ResourceKind::Comment,
        Action::Read,
        CommentVisibility::Public,
        Role::Viewer,
    ),
    visibility_rule(
        ResourceKind::Comment,
        Action::Read,
        CommentVisibility::Private,
        Role::Maintainer,
    ),
    visibility_rule(
        ResourceKind::Comment,
        Action::Comment,
        CommentVisibility::Public,
        Role::Reporter,
    ),
    visibility_rule(
        ResourceKind::Comment,
        Action::Comment,
        CommentVisibility::Private,
        Role::Maintainer,
    ),
    owned_rule(ResourceKind::Comment, Action::Update, Role::Maintainer, Role::Reporter),
    owned_rule(ResourceKind::Comment, Action::Delete, Role::Maintainer, Role::Reporter),
    rule(ResourceKind::Attachment, Action::Read, Role::Viewer),
    rule(ResourceKind::Attachment, Action::Create, Role::Reporter),
    owned_rule(ResourceKind::Attachment, Action::Delete, Role::Maintainer, Role::Reporter),
    owned_rule(ResourceKind::User, Action::Read, Role::Admin, Role::Viewer),
    rule(ResourceKind::User, Action::Update, Role::Admin),
    rule(ResourceKind::AuditLog, Action::Read, Role::Admin),
];

/// Selects the most specific rule for a resource, action and visibility.
///
/// A rule naming the target's visibility wins over a rule that matches any
/// visibility.
#[must_use]
pub fn select_rule(
    resource: ResourceKind,
    action: Action,
    visibility: Option<CommentVisibility>,
) -> Option<&'static PolicyRule> {
    let mut fallback = None;
    for candidate in POLICY_RULES
        .iter()
        .filter(|candidate| candidate.resource == resource && candidate.action == action)
    {
        match candidate.visibility {
            Some(rule_visibility) if Some(rule_visibility) == visibility => {
                return Some(candidate);
            }
            Some(_) => {}
            None => {
                if fallback.is_none() {
                    fallback = Some(candidate);
                }
            }
        }
    }

    fallback
}

/// Decides whether `actor` may perform `action` on `target`.
///
/// Pure and deterministic: the result depends only on the arguments.
#[must_use]
pub fn authorize(actor: &Actor, action: Action, target: &ResourceTarget) -> AccessDecision {
    if actor.is_admin() {
        return AccessDecision::Allow(DecisionReason::AdminOverride);
    }

    if let Some(product_id) = target.owning_product
        && actor.membership(product_id).is_none()
    {
        return AccessDecision::Deny(DecisionReason::NotProductMember);
    }

    let effective_role = actor.effective_role(target.owning_product);

    let Some(rule) = select_rule(target.kind, action, target.visibility) else {
        return AccessDecision::Deny(DecisionReason::NoMatchingRule);
    };

    if effective_role.satisfies(rule.min_role) {
        return AccessDecision::Allow(DecisionReason::RoleSufficient);
    }

    let is_owner = target.owner == Some(actor.user_id());
    if let Some(owner_min_role) = rule.owner_min_role
        && is_owner
        && effective_role.satisfies(owner_min_role)
    {
        return AccessDecision::Allow(DecisionReason::OwnerAccess);
    }

    AccessDecision::Deny(DecisionReason::InsufficientRole)
}
