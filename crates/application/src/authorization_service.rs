use std::sync::Arc;

use bugzot_core::{AppError, AppResult};
use bugzot_domain::{AccessDecision, Action, Actor, NewAuditEntry, ResourceTarget, authorize};
use tracing::{error, warn};

use crate::AuditRepository;

/// Enforces the access policy and records decisions in the audit log.
#[derive(Clone)]
pub struct AuthorizationService {
    audit_repository: Arc<dyn AuditRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(audit_repository: Arc<dyn AuditRepository>) -> Self {
        Self { audit_repository }
    }

    /// Evaluates the policy without side effects.
    #[must_use]
    pub fn decide(&self, actor: &Actor, action: Action, target: &ResourceTarget) -> AccessDecision {
        authorize(actor, action, target)
    }

    /// Requires permission for a mutation.
    ///
    /// An allow decision is returned to the caller, which records it together
    /// with the mutation. A deny decision is logged, audited on its own and
    /// turned into `AppError::Forbidden`.
    pub async fn require(
        &self,
        actor: &Actor,
        action: Action,
        target: &ResourceTarget,
    ) -> AppResult<AccessDecision> {
        let decision = authorize(actor, action, target);
        if decision.is_allowed() {
            return Ok(decision);
        }

        Err(self.reject(actor, action, target, decision).await)
    }

    /// Requires permission for a read and records the allow decision.
    pub async fn require_read(&self, actor: &Actor, target: &ResourceTarget) -> AppResult<()> {
        let decision = authorize(actor, Action::Read, target);
        if !decision.is_allowed() {
            return Err(self.reject(actor, Action::Read, target, decision).await);
        }

        self.audit_repository
            .append_entry(NewAuditEntry::for_decision(
                actor.user_id(),
                Action::Read,
                target,
                decision,
            ))
            .await?;

        Ok(())
    }

    async fn reject(
        &self,
        actor: &Actor,
        action: Action,
        target: &ResourceTarget,
        decision: AccessDecision,
    ) -> AppError {
        let reason = decision.reason().as_str();
        warn!(
            actor_id = %actor.user_id(),
            action = action.as_str(),
            target_type = target.kind.as_str(),
            target_id = ?target.id,
            reason,
            "authorization denied"
        );

        let entry = NewAuditEntry::for_decision(actor.user_id(), action, target, decision);
        if let Err(audit_error) = self.audit_repository.append_entry(entry).await {
            error!(
                actor_id = %actor.user_id(),
                action = action.as_str(),
                target_type = target.kind.as_str(),
                error = %audit_error,
                "failed to record authorization denial"
            );
        }

        AppError::Forbidden(format!(
            "{} on {} denied: {reason}",
            action.as_str(),
            target.kind.as_str()
        ))
    }
}
