//! Audit trail entries.

use std::str::FromStr;

use bugzot_core::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{AccessDecision, Action, ResourceKind, ResourceTarget, UserId};

/// Recorded outcome of an audited step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
    /// The step was permitted.
    Allow,
    /// The step was rejected.
    Deny,
}

impl AuditDecision {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl FromStr for AuditDecision {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            _ => Err(AppError::Validation(format!(
                "unknown audit decision '{value}'"
            ))),
        }
    }
}

impl From<AccessDecision> for AuditDecision {
    fn from(value: AccessDecision) -> Self {
        if value.is_allowed() {
            Self::Allow
        } else {
            Self::Deny
        }
    }
}

/// Stable audit action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// An authorization decision without an accompanying mutation.
    Access(ResourceKind, Action),
    /// A new account was registered.
    UserRegistered,
    /// A login attempt succeeded.
    UserLoginSucceeded,
    /// A login attempt failed against an existing account.
    UserLoginFailed,
    /// A token was revoked by logging out.
    UserLoggedOut,
    /// Profile fields of an account were edited by an administrator.
    UserProfileUpdated,
    /// A user's global role changed.
    UserRoleChanged,
    /// A user account was disabled.
    UserDisabled,
    /// A product was created.
    ProductCreated,
    /// Product fields were edited.
    ProductUpdated,
    /// A product was soft-deleted.
    ProductDeleted,
    /// A product membership was added or changed.
    ProductMemberSet,
    /// A product membership was removed.
    ProductMemberRemoved,
    /// A bug was filed.
    BugCreated,
    /// Bug fields were edited.
    BugUpdated,
    /// A bug moved along the workflow graph.
    BugStatusChanged,
    /// A bug was deleted.
    BugDeleted,
    /// A comment was posted.
    CommentCreated,
    /// A comment was edited.
    CommentUpdated,
    /// A comment was soft-deleted.
    CommentDeleted,
    /// Attachment metadata was recorded.
    AttachmentCreated,
    /// Attachment metadata was soft-deleted.
    AttachmentDeleted,
}

impl AuditAction {
    /// Returns the stable storage name, e.g. `bug.status_changed` or `comment.read`.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Access(kind, action) => format!("{}.{}", kind.as_str(), action.as_str()),
            Self::UserRegistered => "user.registered".to_owned(),
            Self::UserLoginSucceeded => "user.login_succeeded".to_owned(),
            Self::UserLoginFailed => "user.login_failed".to_owned(),
            Self::UserLoggedOut => "user.logged_out".to_owned(),
            Self::UserProfileUpdated => "user.profile_updated".to_owned(),
            Self::UserRoleChanged => "user.role_changed".to_owned(),
            Self::UserDisabled => "user.disabled".to_owned(),
            Self::ProductCreated => "product.created".to_owned(),
            Self::ProductUpdated => "product.updated".to_owned(),
            Self::ProductDeleted => "product.deleted".to_owned(),
            Self::ProductMemberSet => "product.member_set".to_owned(),
            Self::ProductMemberRemoved => "product.member_removed".to_owned(),
            Self::BugCreated => "bug.created".to_owned(),
            Self::BugUpdated => "bug.updated".to_owned(),
            Self::BugStatusChanged => "bug.status_changed".to_owned(),
            Self::BugDeleted => "bug.deleted".to_owned(),
            Self::CommentCreated => "comment.created".to_owned(),
            Self::CommentUpdated => "comment.updated".to_owned(),
            Self::CommentDeleted => "comment.deleted".to_owned(),
            Self::AttachmentCreated => "attachment.created".to_owned(),
            Self::AttachmentDeleted => "attachment.deleted".to_owned(),
        }
    }
}

/// Audit entry waiting to be appended. The store assigns sequence and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    /// Acting user; `None` for anonymous attempts.
    pub actor_id: Option<UserId>,
    /// Stable action name.
    pub action: String,
    /// Target resource kind.
    pub target_type: ResourceKind,
    /// Target resource id, when it exists.
    pub target_id: Option<Uuid>,
    /// Outcome.
    pub decision: AuditDecision,
    /// Stable reason code.
    pub reason: String,
    /// Optional structured detail.
    pub detail: Option<Value>,
}

impl NewAuditEntry {
    /// Builds an entry for a policy decision on a target.
    #[must_use]
    pub fn for_decision(
        actor_id: UserId,
        action: Action,
        target: &ResourceTarget,
        decision: AccessDecision,
    ) -> Self {
        Self {
            actor_id: Some(actor_id),
            action: AuditAction::Access(target.kind, action).name(),
            target_type: target.kind,
            target_id: target.id,
            decision: decision.into(),
            reason: decision.reason().as_str().to_owned(),
            detail: None,
        }
    }

    /// Builds an allow entry for a committed mutation.
    #[must_use]
    pub fn mutation(
        actor_id: UserId,
        action: AuditAction,
        target_type: ResourceKind,
        target_id: Uuid,
        decision: AccessDecision,
    ) -> Self {
        Self {
            actor_id: Some(actor_id),
            action: action.name(),
            target_type,
            target_id: Some(target_id),
            decision: decision.into(),
            reason: decision.reason().as_str().to_owned(),
            detail: None,
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Immutable, sequenced audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Globally strictly increasing sequence number.
    pub sequence: i64,
    /// Acting user; `None` for anonymous attempts.
    pub actor_id: Option<UserId>,
    /// Stable action name.
    pub action: String,
    /// Target resource kind.
    pub target_type: ResourceKind,
    /// Target resource id, when it exists.
    pub target_id: Option<Uuid>,
    /// Outcome.
    pub decision: AuditDecision,
    /// Stable reason code.
    pub reason: String,
    /// Optional structured detail.
    pub detail: Option<Value>,
    /// Time the entry was appended.
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Materializes a pending entry with its assigned sequence and timestamp.
    #[must_use]
    pub fn from_new(sequence: i64, entry: NewAuditEntry, recorded_at: DateTime<Utc>) -> Self {
        Self {
            sequence,
            actor_id: entry.actor_id,
            action: entry.action,
            target_type: entry.target_type,
            target_id: entry.target_id,
            decision: entry.decision,
            reason: entry.reason,
            detail: entry.detail,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AuditAction, AuditDecision, NewAuditEntry};
    use crate::{
        AccessDecision, Action, DecisionReason, ResourceKind, ResourceTarget, UserId,
    };

    #[test]
    fn access_actions_are_named_by_resource_and_action() {
        assert_eq!(
            AuditAction::Access(ResourceKind::Comment, Action::Read).name(),
            "comment.read"
        );
        assert_eq!(
            AuditAction::Access(ResourceKind::AuditLog, Action::Read).name(),
            "audit_log.read"
        );
        assert_eq!(AuditAction::BugStatusChanged.name(), "bug.status_changed");
    }

    #[test]
    fn decision_entries_carry_reason_codes() {
        let actor_id = UserId::new();
        let entry = NewAuditEntry::for_decision(
            actor_id,
            Action::Read,
            &ResourceTarget::audit_log(),
            AccessDecision::Deny(DecisionReason::InsufficientRole),
        );

        assert_eq!(entry.actor_id, Some(actor_id));
        assert_eq!(entry.decision, AuditDecision::Deny);
        assert_eq!(entry.reason, "insufficient_role");
        assert_eq!(entry.target_type, ResourceKind::AuditLog);
        assert!(entry.target_id.is_none());
    }
}
