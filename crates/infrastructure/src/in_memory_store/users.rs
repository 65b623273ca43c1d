use async_trait::async_trait;
use bugzot_application::{
    Committed, NewUserRecord, Page, UserCredentials, UserListQuery, UserProfileChanges,
    UserRepository,
};
use bugzot_domain::{EmailAddress, UserStatus};
use chrono::DateTime;

use super::*;

impl InMemoryStore {
    /// Applies a change to a stored user after its audit entry is appended.
    async fn mutate_user(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
        change: impl FnOnce(&mut User) + Send,
    ) -> AppResult<Committed<User>> {
        let mut state = self.state.write().await;
        state.stored_user(user_id)?;
        let sequence = state.append_audit(self.audit_offline(), audit)?;

        if let Some(stored) = state.users.get_mut(&user_id) {
            change(&mut stored.user);
            stored.user.updated_at = Utc::now();
        }

        let user = state.hydrate_user(state.stored_user(user_id)?);
        Ok(Committed::new(user, sequence))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(&user_id)
            .map(|stored| state.hydrate_user(stored)))
    }

    async fn find_credentials_by_email(
        &self,
        email: &EmailAddress,
    ) -> AppResult<Option<UserCredentials>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|stored| &stored.user.email == email)
            .map(|stored| UserCredentials {
                user: state.hydrate_user(stored),
                password_hash: stored.password_hash.clone(),
            }))
    }

    async fn list_users(&self, query: &UserListQuery) -> AppResult<Page<User>> {
        let state = self.state.read().await;
        Ok(query.select(state.users.values().map(|stored| state.hydrate_user(stored))))
    }

    async fn create_user(
        &self,
        record: NewUserRecord,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|stored| stored.user.email == record.email)
        {
            return Err(AppError::Conflict("email already registered".to_owned()));
        }

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        let now = Utc::now();
        let user = User {
            id: record.id,
            email: record.email,
            display_name: record.display_name,
            role: record.role,
            status: UserStatus::Active,
            memberships: Vec::new(),
            failed_login_count: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: record.password_hash,
            },
        );

        Ok(Committed::new(user, sequence))
    }

    async fn record_login_failure(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<i32>> {
        let committed = self
            .mutate_user(user_id, audit, |user| {
                user.failed_login_count = user.failed_login_count.saturating_add(1);
            })
            .await?;

        Ok(Committed::new(
            committed.value.failed_login_count,
            committed.audit_sequence,
        ))
    }

    async fn record_login_success(
        &self,
        user_id: UserId,
        logged_in_at: DateTime<Utc>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.mutate_user(user_id, audit, move |user| {
            user.failed_login_count = 0;
            user.last_login_at = Some(logged_in_at);
        })
        .await
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        changes: UserProfileChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        let mut state = self.state.write().await;
        state.stored_user(user_id)?;
        if let Some(email) = &changes.email
            && state
                .users
                .values()
                .any(|stored| &stored.user.email == email && stored.user.id != user_id)
        {
            return Err(AppError::Conflict("email already registered".to_owned()));
        }

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        if let Some(stored) = state.users.get_mut(&user_id) {
            if let Some(email) = changes.email {
                stored.user.email = email;
            }
            if let Some(display_name) = changes.display_name {
                stored.user.display_name = display_name;
            }
            stored.user.updated_at = Utc::now();
        }

        let user = state.hydrate_user(state.stored_user(user_id)?);
        Ok(Committed::new(user, sequence))
    }

    async fn set_role(
        &self,
        user_id: UserId,
        role: Role,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.mutate_user(user_id, audit, move |user| user.role = role)
            .await
    }

    async fn disable_user(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.mutate_user(user_id, audit, |user| user.status = UserStatus::Disabled)
            .await
    }
}
