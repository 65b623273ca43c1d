//! Bearer token validation and issuance.

use std::sync::Arc;

use bugzot_core::{AppError, AppResult, BearerCredential};
use bugzot_domain::{Actor, User, UserId};
use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    ActorCache, IssuedToken, TokenClaims, TokenCodec, TokenRevocationStore, UserRepository,
};

/// A validated request identity.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Resolved actor used for authorization.
    pub actor: Actor,
    /// Claims of the presented token.
    pub claims: TokenClaims,
}

/// Validates bearer credentials and resolves them to actors.
#[derive(Clone)]
pub struct IdentityService {
    user_repository: Arc<dyn UserRepository>,
    token_codec: Arc<dyn TokenCodec>,
    revocation_store: Arc<dyn TokenRevocationStore>,
    actor_cache: Option<Arc<dyn ActorCache>>,
}

impl IdentityService {
    /// Creates a new identity service. Pass `None` to disable actor caching.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        token_codec: Arc<dyn TokenCodec>,
        revocation_store: Arc<dyn TokenRevocationStore>,
        actor_cache: Option<Arc<dyn ActorCache>>,
    ) -> Self {
        Self {
            user_repository,
            token_codec,
            revocation_store,
            actor_cache,
        }
    }

    /// Validates a credential and returns the caller's actor.
    ///
    /// Fails with `Unauthenticated` for malformed, expired or revoked tokens
    /// and unknown users, and with `Forbidden` for disabled accounts.
    pub async fn validate(&self, credential: &BearerCredential) -> AppResult<Authenticated> {
        let claims = self.token_codec.decode(credential.as_str())?;

        if self.revocation_store.is_revoked(&claims.token_id).await? {
            return Err(AppError::Unauthenticated("token has been revoked".to_owned()));
        }

        if let Some(actor) = self.cached_actor(claims.user_id).await {
            return Ok(Authenticated { actor, claims });
        }

        let user = self
            .user_repository
            .find_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("unknown user".to_owned()))?;

        if !user.is_active() {
            return Err(AppError::Forbidden("account is disabled".to_owned()));
        }

        let actor = user.to_actor();
        self.cache_actor(&actor).await;

        Ok(Authenticated { actor, claims })
    }

    /// Issues an access token for an active user.
    pub fn issue_token(&self, user: &User) -> AppResult<IssuedToken> {
        self.token_codec.issue(user.id, user.role)
    }

    /// Revokes a token for the rest of its lifetime. Expired tokens are ignored.
    pub async fn revoke(&self, claims: &TokenClaims) -> AppResult<()> {
        let remaining = (claims.expires_at - Utc::now()).num_seconds();
        let Ok(ttl_seconds) = u64::try_from(remaining) else {
            debug!(user_id = %claims.user_id, "token already expired; nothing to revoke");
            return Ok(());
        };
        if ttl_seconds == 0 {
            return Ok(());
        }

        self.revocation_store
            .revoke(&claims.token_id, ttl_seconds)
            .await
    }

    /// Drops any cached actor for a user whose role, memberships or status changed.
    pub async fn invalidate_actor(&self, user_id: UserId) {
        let Some(cache) = &self.actor_cache else {
            return;
        };

        if let Err(error) = cache.invalidate(user_id).await {
            warn!(user_id = %user_id, error = %error, "failed to invalidate cached actor");
        }
    }

    async fn cached_actor(&self, user_id: UserId) -> Option<Actor> {
        let cache = self.actor_cache.as_ref()?;
        match cache.get_actor(user_id).await {
            Ok(actor) => actor,
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "actor cache read failed");
                None
            }
        }
    }

    async fn cache_actor(&self, actor: &Actor) {
        let Some(cache) = &self.actor_cache else {
            return;
        };

        if let Err(error) = cache.put_actor(actor).await {
            warn!(user_id = %actor.user_id(), error = %error, "actor cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bugzot_core::{AppError, BearerCredential};
    use bugzot_domain::{AccessDecision, DecisionReason, NewAuditEntry, ResourceKind, Role};
    use chrono::{Duration, Utc};

    use super::IdentityService;
    use crate::test_support::{
        FakeActorCache, FakeRevocationStore, FakeTokenCodec, FakeUserRepository,
    };
    use crate::{TokenClaims, TokenCodec, UserRepository};

    struct Fixture {
        users: Arc<FakeUserRepository>,
        cache: Arc<FakeActorCache>,
        service: IdentityService,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(FakeUserRepository::default());
        let cache = Arc::new(FakeActorCache::default());
        let service = IdentityService::new(
            users.clone(),
            Arc::new(FakeTokenCodec::default()),
            Arc::new(FakeRevocationStore::default()),
            Some(cache.clone()),
        );
        Fixture {
            users,
            cache,
            service,
        }
    }

    fn credential(token: &str) -> BearerCredential {
        BearerCredential::new(token).unwrap_or_else(|_| panic!("invalid test token"))
    }

    #[tokio::test]
    async fn valid_token_resolves_stored_role() {
        let fixture = fixture();
        let user = fixture
            .users
            .insert("dev@example.com", Role::Maintainer, "hash")
            .await;
        // The claim says viewer; the stored role wins.
        let token = FakeTokenCodec::default()
            .issue(user.id, Role::Viewer)
            .unwrap_or_else(|_| panic!("issue"));

        let authenticated = fixture.service.validate(&credential(&token.token)).await;

        assert_eq!(
            authenticated.map(|value| value.actor.role()).ok(),
            Some(Role::Maintainer)
        );
        assert!(fixture.cache.actors.lock().await.contains_key(&user.id));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let fixture = fixture();
        let result = fixture.service.validate(&credential("garbage")).await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn unknown_user_is_unauthenticated() {
        let fixture = fixture();
        let token = FakeTokenCodec::default()
            .issue(bugzot_domain::UserId::new(), Role::Admin)
            .unwrap_or_else(|_| panic!("issue"));

        let result = fixture.service.validate(&credential(&token.token)).await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn revoked_token_is_unauthenticated() {
        let fixture = fixture();
        let user = fixture.users.insert("dev@example.com", Role::Reporter, "hash").await;
        let token = fixture
            .service
            .issue_token(&user)
            .unwrap_or_else(|_| panic!("issue"));

        assert!(fixture.service.revoke(&token.claims).await.is_ok());
        let result = fixture.service.validate(&credential(&token.token)).await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn revoking_expired_token_is_a_no_op() {
        let fixture = fixture();
        let now = Utc::now();
        let claims = TokenClaims {
            user_id: bugzot_domain::UserId::new(),
            role: Role::Reporter,
            token_id: "expired".to_owned(),
            issued_at: now - Duration::hours(2),
            expires_at: now - Duration::hours(1),
        };

        assert!(fixture.service.revoke(&claims).await.is_ok());
    }

    #[tokio::test]
    async fn disabled_account_is_forbidden_after_invalidation() {
        let fixture = fixture();
        let user = fixture.users.insert("dev@example.com", Role::Reporter, "hash").await;
        let token = fixture
            .service
            .issue_token(&user)
            .unwrap_or_else(|_| panic!("issue"));
        assert!(fixture.service.validate(&credential(&token.token)).await.is_ok());

        let disabled = fixture
            .users
            .disable_user(
                user.id,
                NewAuditEntry::mutation(
                    user.id,
                    bugzot_domain::AuditAction::UserDisabled,
                    ResourceKind::User,
                    user.id.as_uuid(),
                    AccessDecision::Allow(DecisionReason::AdminOverride),
                ),
            )
            .await;
        assert!(disabled.is_ok());
        fixture.service.invalidate_actor(user.id).await;

        let result = fixture.service.validate(&credential(&token.token)).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
