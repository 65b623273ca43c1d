use bugzot_core::{AppError, AppResult};
use bugzot_domain::{
    AuditAction, AuditDecision, EmailAddress, NewAuditEntry, ResourceKind, Role, User, UserId,
    normalize_display_name, validate_password,
};
use serde_json::json;
use tracing::{info, warn};

use super::{RegisterParams, UserService};
use crate::NewUserRecord;

impl UserService {
    /// Registers a new account with the default reporter role.
    pub async fn register(&self, params: RegisterParams) -> AppResult<User> {
        self.check_rate_limit(&self.rate_limits.register, params.client_ip.as_deref())
            .await?;

        let email = EmailAddress::new(&params.email)?;
        if email.is_disposable() {
            warn!(domain = email.domain(), "registration with disposable email rejected");
            return Err(AppError::Validation(
                "disposable email addresses are not allowed".to_owned(),
            ));
        }

        let display_name = normalize_display_name(&params.display_name)?;
        validate_password(&params.password)?;

        if self
            .user_repository
            .find_credentials_by_email(&email)
            .await?
            .is_some()
        {
            // Keep response timing independent of account existence.
            let _ = self.password_hasher.hash_password(&params.password);
            warn!("registration for an already registered email rejected");
            return Err(AppError::Conflict("email already registered".to_owned()));
        }

        self.create_account(email, display_name, &params.password, Role::default(), "self_registration")
            .await
    }

    /// Creates the first administrator when no account uses the email yet.
    ///
    /// Returns `None` when the account already exists.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> AppResult<Option<User>> {
        let email = EmailAddress::new(email)?;
        if let Some(existing) = self.user_repository.find_credentials_by_email(&email).await? {
            if existing.user.role != Role::Admin {
                warn!(
                    user_id = %existing.user.id,
                    "bootstrap admin email belongs to a non-admin account; leaving it unchanged"
                );
            }
            return Ok(None);
        }

        validate_password(password)?;
        let user = self
            .create_account(email, "Administrator".to_owned(), password, Role::Admin, "bootstrap")
            .await?;

        Ok(Some(user))
    }

    async fn create_account(
        &self,
        email: EmailAddress,
        display_name: String,
        password: &str,
        role: Role,
        reason: &str,
    ) -> AppResult<User> {
        let password_hash = self.password_hasher.hash_password(password)?;
        let user_id = UserId::new();
        let audit = NewAuditEntry {
            actor_id: Some(user_id),
            action: AuditAction::UserRegistered.name(),
            target_type: ResourceKind::User,
            target_id: Some(user_id.as_uuid()),
            decision: AuditDecision::Allow,
            reason: reason.to_owned(),
            detail: Some(json!({ "email": email.as_str(), "role": role.as_str() })),
        };

        let committed = self
            .user_repository
            .create_user(
                NewUserRecord {
                    id: user_id,
                    email,
                    display_name,
                    password_hash,
                    role,
                },
                audit,
            )
            .await?;

        info!(
            user_id = %committed.value.id,
            role = committed.value.role.as_str(),
            audit_sequence = committed.audit_sequence,
            "account created"
        );

        Ok(committed.value)
    }
}
