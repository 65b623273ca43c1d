//! PostgreSQL-backed user repository.

use std::collections::HashMap;

use async_trait::async_trait;
use bugzot_application::{
    Committed, NewUserRecord, Page, SortDirection, UserCredentials, UserListQuery,
    UserProfileChanges, UserRepository, UserSortField,
};
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{EmailAddress, NewAuditEntry, ProductId, ProductMembership, Role, User, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::postgres_support::{
    append_audit_entry, begin_serializable, commit, map_sqlx_error, page_bound, retry_serializable,
};

/// PostgreSQL implementation of the user repository port.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    password_hash: String,
    role: String,
    status: String,
    failed_login_count: i32,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_credentials(self, memberships: Vec<ProductMembership>) -> AppResult<UserCredentials> {
        let user = User {
            id: UserId::from_uuid(self.id),
            email: EmailAddress::new(self.email)?,
            display_name: self.display_name,
            role: self.role.parse()?,
            status: self.status.parse()?,
            memberships,
            failed_login_count: self.failed_login_count,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };

        Ok(UserCredentials {
            user,
            password_hash: self.password_hash,
        })
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    user_id: Uuid,
    product_id: Uuid,
    role_override: Option<String>,
}

impl TryFrom<MembershipRow> for ProductMembership {
    type Error = AppError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::from_uuid(row.product_id),
            role_override: row.role_override.as_deref().map(str::parse::<Role>).transpose()?,
        })
    }
}

mod account;
mod lookup;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        self.find_user_impl(user_id).await
    }

    async fn find_credentials_by_email(
        &self,
        email: &EmailAddress,
    ) -> AppResult<Option<UserCredentials>> {
        self.find_credentials_by_email_impl(email).await
    }

    async fn list_users(&self, query: &UserListQuery) -> AppResult<Page<User>> {
        self.list_users_impl(query).await
    }

    async fn create_user(
        &self,
        record: NewUserRecord,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.create_user_impl(record, audit).await
    }

    async fn record_login_failure(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<i32>> {
        self.record_login_failure_impl(user_id, audit).await
    }

    async fn record_login_success(
        &self,
        user_id: UserId,
        logged_in_at: DateTime<Utc>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.record_login_success_impl(user_id, logged_in_at, audit)
            .await
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        changes: UserProfileChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.update_profile_impl(user_id, changes, audit).await
    }

    async fn set_role(
        &self,
        user_id: UserId,
        role: Role,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.set_role_impl(user_id, role, audit).await
    }

    async fn disable_user(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.disable_user_impl(user_id, audit).await
    }
}
