use bugzot_core::{AppError, AppResult};
use bugzot_domain::{
    AuditAction, AuditDecision, EmailAddress, NewAuditEntry, ResourceKind, UserId,
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use super::{LoginOutcome, LoginParams, UserService};
use crate::Authenticated;

const INVALID_CREDENTIALS: &str = "invalid credentials";

impl UserService {
    /// Authenticates with email and password and issues a token.
    ///
    /// Unknown email, disabled account and wrong password all fail with the
    /// same `Unauthenticated` error.
    pub async fn login(&self, params: LoginParams) -> AppResult<LoginOutcome> {
        self.check_rate_limit(&self.rate_limits.login, params.client_ip.as_deref())
            .await?;

        let Ok(email) = EmailAddress::new(&params.email) else {
            let _ = self.password_hasher.hash_password(&params.password);
            return Err(invalid_credentials());
        };

        let Some(credentials) = self.user_repository.find_credentials_by_email(&email).await?
        else {
            let _ = self.password_hasher.hash_password(&params.password);
            warn!(client_ip = ?params.client_ip, "login failed: unknown account");
            self.record_failure_entry(None, "unknown_account", json!({ "email": email.as_str() }))
                .await;
            return Err(invalid_credentials());
        };

        let user = credentials.user;
        if !user.is_active() {
            let _ = self.password_hasher.hash_password(&params.password);
            warn!(user_id = %user.id, "login failed: account disabled");
            self.record_failure_entry(Some(user.id), "account_disabled", json!({}))
                .await;
            return Err(invalid_credentials());
        }

        let password_valid = self
            .password_hasher
            .verify_password(&params.password, &credentials.password_hash)?;

        if !password_valid {
            let audit = login_entry(
                user.id,
                AuditAction::UserLoginFailed,
                AuditDecision::Deny,
                "invalid_credentials",
            );
            match self.user_repository.record_login_failure(user.id, audit).await {
                Ok(committed) => warn!(
                    user_id = %user.id,
                    failed_login_count = committed.value,
                    "login failed: wrong password"
                ),
                Err(record_error) => error!(
                    user_id = %user.id,
                    error = %record_error,
                    "failed to record login failure"
                ),
            }
            return Err(invalid_credentials());
        }

        let token = self.identity_service.issue_token(&user)?;
        let audit = login_entry(
            user.id,
            AuditAction::UserLoginSucceeded,
            AuditDecision::Allow,
            "valid_credentials",
        )
        .with_detail(json!({ "token_id": token.claims.token_id }));

        let committed = self
            .user_repository
            .record_login_success(user.id, Utc::now(), audit)
            .await?;

        info!(user_id = %user.id, audit_sequence = committed.audit_sequence, "login succeeded");

        Ok(LoginOutcome {
            user: committed.value,
            token,
        })
    }

    /// Revokes the presented token.
    pub async fn logout(&self, authenticated: &Authenticated) -> AppResult<()> {
        self.identity_service.revoke(&authenticated.claims).await?;

        let user_id = authenticated.actor.user_id();
        self.audit_service
            .record_audit(
                login_entry(
                    user_id,
                    AuditAction::UserLoggedOut,
                    AuditDecision::Allow,
                    "token_revoked",
                )
                .with_detail(json!({ "token_id": authenticated.claims.token_id })),
            )
            .await?;

        info!(user_id = %user_id, "logged out");
        Ok(())
    }

    async fn record_failure_entry(
        &self,
        user_id: Option<UserId>,
        reason: &str,
        detail: serde_json::Value,
    ) {
        let entry = NewAuditEntry {
            actor_id: user_id,
            action: AuditAction::UserLoginFailed.name(),
            target_type: ResourceKind::User,
            target_id: user_id.map(|user_id| user_id.as_uuid()),
            decision: AuditDecision::Deny,
            reason: reason.to_owned(),
            detail: Some(detail),
        };

        if let Err(audit_error) = self.audit_service.record_audit(entry).await {
            error!(error = %audit_error, reason, "failed to record login failure");
        }
    }
}

fn login_entry(
    user_id: UserId,
    action: AuditAction,
    decision: AuditDecision,
    reason: &str,
) -> NewAuditEntry {
    NewAuditEntry {
        actor_id: Some(user_id),
        action: action.name(),
        target_type: ResourceKind::User,
        target_id: Some(user_id.as_uuid()),
        decision,
        reason: reason.to_owned(),
        detail: None,
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthenticated(INVALID_CREDENTIALS.to_owned())
}
