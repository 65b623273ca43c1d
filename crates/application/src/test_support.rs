use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{
    Actor, AuditEntry, EmailAddress, NewAuditEntry, Role, User, UserId, UserStatus,
};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::{
    ActorCache, AttemptInfo, AuditQuery, AuditRepository, Committed, IssuedToken,
    NewUserRecord, Page, PasswordHasher, RateLimitRepository, TokenClaims, TokenCodec,
    TokenRevocationStore, UserCredentials, UserListQuery, UserProfileChanges, UserRepository,
};

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    entries: Mutex<Vec<AuditEntry>>,
    last_limit: Mutex<Option<usize>>,
    failing: AtomicBool,
}

impl FakeAuditRepository {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }

    pub(crate) async fn last_limit(&self) -> Option<usize> {
        *self.last_limit.lock().await
    }

    pub(crate) async fn push(&self, entry: NewAuditEntry) -> AppResult<i64> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::AuditWriteFailure("audit store offline".to_owned()));
        }

        let mut entries = self.entries.lock().await;
        let sequence = i64::try_from(entries.len()).unwrap_or(i64::MAX) + 1;
        entries.push(AuditEntry::from_new(sequence, entry, Utc::now()));
        Ok(sequence)
    }
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_entry(&self, entry: NewAuditEntry) -> AppResult<i64> {
        self.push(entry).await
    }

    async fn list_entries(&self, query: &AuditQuery) -> AppResult<Vec<AuditEntry>> {
        *self.last_limit.lock().await = Some(query.limit);
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .filter(|entry| query.after_sequence.is_none_or(|after| entry.sequence > after))
            .filter(|entry| query.matches(entry))
            .take(query.limit)
            .cloned()
            .collect())
    }
}

pub(crate) struct StoredUser {
    pub(crate) user: User,
    pub(crate) password_hash: String,
}

#[derive(Default)]
pub(crate) struct FakeUserRepository {
    pub(crate) users: Mutex<HashMap<UserId, StoredUser>>,
    pub(crate) audit: Arc<FakeAuditRepository>,
}

impl FakeUserRepository {
    pub(crate) async fn insert(&self, email: &str, role: Role, password_hash: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: EmailAddress::new(email).unwrap_or_else(|_| panic!("invalid test email")),
            display_name: "Test User".to_owned(),
            role,
            status: UserStatus::Active,
            memberships: Vec::new(),
            failed_login_count: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().await.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
            },
        );
        user
    }

    async fn mutate<T>(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
        change: impl FnOnce(&mut User) -> T,
    ) -> AppResult<Committed<T>> {
        let mut users = self.users.lock().await;
        let stored = users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' not found")))?;
        let sequence = self.audit.push(audit).await?;
        Ok(Committed::new(change(&mut stored.user), sequence))
    }
}

#[async_trait]
impl UserRepository for FakeUserRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .get(&user_id)
            .map(|stored| stored.user.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &EmailAddress,
    ) -> AppResult<Option<UserCredentials>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|stored| &stored.user.email == email)
            .map(|stored| UserCredentials {
                user: stored.user.clone(),
                password_hash: stored.password_hash.clone(),
            }))
    }

    async fn list_users(&self, query: &UserListQuery) -> AppResult<Page<User>> {
        let users = self.users.lock().await;
        Ok(query.select(users.values().map(|stored| stored.user.clone())))
    }

    async fn create_user(
        &self,
        record: NewUserRecord,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        let mut users = self.users.lock().await;
        if users.values().any(|stored| stored.user.email == record.email) {
            return Err(AppError::Conflict("email already registered".to_owned()));
        }

        let sequence = self.audit.push(audit).await?;
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
        users.insert(
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
        self.mutate(user_id, audit, |user| {
            user.failed_login_count += 1;
            user.failed_login_count
        })
        .await
    }

    async fn record_login_success(
        &self,
        user_id: UserId,
        logged_in_at: DateTime<Utc>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.mutate(user_id, audit, |user| {
            user.failed_login_count = 0;
            user.last_login_at = Some(logged_in_at);
            user.clone()
        })
        .await
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        changes: UserProfileChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        if let Some(email) = &changes.email
            && self
                .users
                .lock()
                .await
                .values()
                .any(|stored| &stored.user.email == email && stored.user.id != user_id)
        {
            return Err(AppError::Conflict("email already registered".to_owned()));
        }

        self.mutate(user_id, audit, |user| {
            if let Some(email) = changes.email {
                user.email = email;
            }
            if let Some(display_name) = changes.display_name {
                user.display_name = display_name;
            }
            user.clone()
        })
        .await
    }

    async fn set_role(
        &self,
        user_id: UserId,
        role: Role,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.mutate(user_id, audit, |user| {
            user.role = role;
            user.clone()
        })
        .await
    }

    async fn disable_user(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        self.mutate(user_id, audit, |user| {
            user.status = UserStatus::Disabled;
            user.clone()
        })
        .await
    }
}

/// Stores the password reversed; enough to tell right from wrong.
pub(crate) struct ReversingPasswordHasher;

impl PasswordHasher for ReversingPasswordHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(password.chars().rev().collect())
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(password.chars().rev().collect::<String>() == hash)
    }
}

/// Encodes claims as `user_id|role|token_id|expires_at`.
pub(crate) struct FakeTokenCodec {
    pub(crate) ttl: Duration,
}

impl Default for FakeTokenCodec {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(30),
        }
    }
}

impl TokenCodec for FakeTokenCodec {
    fn issue(&self, user_id: UserId, role: Role) -> AppResult<IssuedToken> {
        let issued_at = Utc::now();
        let claims = TokenClaims {
            user_id,
            role,
            token_id: uuid::Uuid::new_v4().to_string(),
            issued_at,
            expires_at: issued_at + self.ttl,
        };
        let token = format!(
            "{}|{}|{}|{}",
            user_id,
            role.as_str(),
            claims.token_id,
            claims.expires_at.timestamp()
        );
        Ok(IssuedToken { token, claims })
    }

    fn decode(&self, token: &str) -> AppResult<TokenClaims> {
        let invalid = || AppError::Unauthenticated("invalid token".to_owned());
        let parts: Vec<&str> = token.split('|').collect();
        let [user_id, role, token_id, expires_at] = parts.as_slice() else {
            return Err(invalid());
        };

        let expires_at = expires_at
            .parse::<i64>()
            .ok()
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .ok_or_else(invalid)?;
        if expires_at <= Utc::now() {
            return Err(AppError::Unauthenticated("token expired".to_owned()));
        }

        Ok(TokenClaims {
            user_id: user_id.parse().map_err(|_| invalid())?,
            role: role.parse().map_err(|_| invalid())?,
            token_id: (*token_id).to_owned(),
            issued_at: expires_at - self.ttl,
            expires_at,
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeRevocationStore {
    pub(crate) revoked: Mutex<HashMap<String, u64>>,
}

#[async_trait]
impl TokenRevocationStore for FakeRevocationStore {
    async fn revoke(&self, token_id: &str, ttl_seconds: u64) -> AppResult<()> {
        self.revoked
            .lock()
            .await
            .insert(token_id.to_owned(), ttl_seconds);
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> AppResult<bool> {
        Ok(self.revoked.lock().await.contains_key(token_id))
    }
}

#[derive(Default)]
pub(crate) struct FakeActorCache {
    pub(crate) actors: Mutex<HashMap<UserId, Actor>>,
}

#[async_trait]
impl ActorCache for FakeActorCache {
    async fn get_actor(&self, user_id: UserId) -> AppResult<Option<Actor>> {
        Ok(self.actors.lock().await.get(&user_id).cloned())
    }

    async fn put_actor(&self, actor: &Actor) -> AppResult<()> {
        self.actors
            .lock()
            .await
            .insert(actor.user_id(), actor.clone());
        Ok(())
    }

    async fn invalidate(&self, user_id: UserId) -> AppResult<()> {
        self.actors.lock().await.remove(&user_id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeRateLimitRepository {
    counts: Mutex<HashMap<String, u64>>,
}

#[async_trait]
impl RateLimitRepository for FakeRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: u64) -> AppResult<AttemptInfo> {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(key.to_owned()).or_insert(0);
        *count += 1;
        Ok(AttemptInfo {
            attempt_count: *count,
            retry_after_seconds: window_seconds,
        })
    }
}
