use bugzot_core::{AppError, AppResult};
use bugzot_domain::{
    Action, Actor, AuditAction, EmailAddress, NewAuditEntry, ResourceKind, ResourceTarget, Role,
    User, UserId, UserStatus, normalize_display_name,
};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::{ProfileUpdateParams, UserService};
use crate::{Page, UserListQuery, UserProfileChanges};

/// Largest user directory page.
pub const USER_PAGE_MAX: usize = 200;

impl UserService {
    /// Lists accounts matching the query. Administrators only.
    pub async fn list_users(&self, actor: &Actor, query: UserListQuery) -> AppResult<Page<User>> {
        self.authorization_service
            .require_read(actor, &ResourceTarget::user_collection())
            .await?;

        let search = query
            .search
            .map(|search| search.trim().to_owned())
            .filter(|search| !search.is_empty());
        self.user_repository
            .list_users(&UserListQuery {
                limit: query.limit.clamp(1, USER_PAGE_MAX),
                search,
                ..query
            })
            .await
    }

    /// Returns one account. Users may read their own; administrators any.
    pub async fn get_user(&self, actor: &Actor, user_id: UserId) -> AppResult<User> {
        self.authorization_service
            .require_read(actor, &ResourceTarget::user(user_id))
            .await?;

        self.load_user(user_id).await
    }

    /// Edits the email or display name of an account. Administrators only.
    pub async fn update_profile(
        &self,
        actor: &Actor,
        user_id: UserId,
        params: ProfileUpdateParams,
    ) -> AppResult<User> {
        let decision = self
            .authorization_service
            .require(actor, Action::Update, &ResourceTarget::user(user_id))
            .await?;

        let user = self.load_user(user_id).await?;
        let email = params
            .email
            .as_deref()
            .map(EmailAddress::new)
            .transpose()?
            .filter(|email| email != &user.email);
        let display_name = params
            .display_name
            .as_deref()
            .map(normalize_display_name)
            .transpose()?
            .filter(|display_name| display_name != &user.display_name);

        if let Some(email) = &email
            && let Some(existing) = self.user_repository.find_credentials_by_email(email).await?
            && existing.user.id != user_id
        {
            warn!(user_id = %user_id, "profile update to an already registered email rejected");
            return Err(AppError::Conflict("email already registered".to_owned()));
        }

        let changes = UserProfileChanges {
            email,
            display_name,
        };
        if changes.is_empty() {
            return Ok(user);
        }

        let mut detail = Map::new();
        if let Some(email) = &changes.email {
            detail.insert(
                "email".to_owned(),
                json!({ "from": user.email.as_str(), "to": email.as_str() }),
            );
        }
        if let Some(display_name) = &changes.display_name {
            detail.insert(
                "display_name".to_owned(),
                json!({ "from": user.display_name, "to": display_name }),
            );
        }
        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::UserProfileUpdated,
            ResourceKind::User,
            user_id.as_uuid(),
            decision,
        )
        .with_detail(Value::Object(detail));

        let committed = self
            .user_repository
            .update_profile(user_id, changes, audit)
            .await?;
        self.identity_service.invalidate_actor(user_id).await;

        info!(
            actor_id = %actor.user_id(),
            user_id = %user_id,
            audit_sequence = committed.audit_sequence,
            "user profile updated"
        );

        Ok(committed.value)
    }

    /// Changes the global role of another account.
    pub async fn set_role(&self, actor: &Actor, user_id: UserId, role: Role) -> AppResult<User> {
        let target = ResourceTarget::user(user_id);
        let decision = self
            .authorization_service
            .require(actor, Action::Update, &target)
            .await?;

        if user_id == actor.user_id() {
            return Err(AppError::Conflict(
                "administrators cannot change their own role".to_owned(),
            ));
        }

        let user = self.load_user(user_id).await?;
        if user.role == role {
            return Ok(user);
        }

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::UserRoleChanged,
            ResourceKind::User,
            user_id.as_uuid(),
            decision,
        )
        .with_detail(json!({ "from": user.role.as_str(), "to": role.as_str() }));

        let committed = self.user_repository.set_role(user_id, role, audit).await?;
        self.identity_service.invalidate_actor(user_id).await;

        info!(
            actor_id = %actor.user_id(),
            user_id = %user_id,
            role = role.as_str(),
            audit_sequence = committed.audit_sequence,
            "user role changed"
        );

        Ok(committed.value)
    }

    /// Disables another account. Accounts are never deleted.
    pub async fn disable_user(&self, actor: &Actor, user_id: UserId) -> AppResult<User> {
        let target = ResourceTarget::user(user_id);
        let decision = self
            .authorization_service
            .require(actor, Action::Update, &target)
            .await?;

        if user_id == actor.user_id() {
            return Err(AppError::Conflict(
                "administrators cannot disable their own account".to_owned(),
            ));
        }

        let user = self.load_user(user_id).await?;
        if user.status == UserStatus::Disabled {
            return Ok(user);
        }

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::UserDisabled,
            ResourceKind::User,
            user_id.as_uuid(),
            decision,
        );

        let committed = self.user_repository.disable_user(user_id, audit).await?;
        self.identity_service.invalidate_actor(user_id).await;

        info!(
            actor_id = %actor.user_id(),
            user_id = %user_id,
            audit_sequence = committed.audit_sequence,
            "user disabled"
        );

        Ok(committed.value)
    }

    async fn load_user(&self, user_id: UserId) -> AppResult<User> {
        self.user_repository
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' not found")))
    }
}
