use async_trait::async_trait;
use bugzot_core::AppResult;
use bugzot_domain::{Actor, Role, UserId};
use chrono::{DateTime, Utc};

/// Verified claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Authenticated user.
    pub user_id: UserId,
    /// Role at issue time. Informational; the stored role is authoritative.
    pub role: Role,
    /// Unique token id used for revocation.
    pub token_id: String,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded token.
    pub token: String,
    /// Claims encoded in the token.
    pub claims: TokenClaims,
}

/// Signs and verifies access tokens.
pub trait TokenCodec: Send + Sync {
    /// Issues a token for a user.
    fn issue(&self, user_id: UserId, role: Role) -> AppResult<IssuedToken>;

    /// Verifies signature and expiry and returns the claims.
    ///
    /// Any failure is `AppError::Unauthenticated`.
    fn decode(&self, token: &str) -> AppResult<TokenClaims>;
}

/// Stores ids of tokens revoked before their expiry.
#[async_trait]
pub trait TokenRevocationStore: Send + Sync {
    /// Revokes a token id for the given number of seconds.
    async fn revoke(&self, token_id: &str, ttl_seconds: u64) -> AppResult<()>;

    /// Returns whether a token id is revoked.
    async fn is_revoked(&self, token_id: &str) -> AppResult<bool>;
}

/// Short-lived, non-authoritative cache of resolved actors.
#[async_trait]
pub trait ActorCache: Send + Sync {
    /// Returns a cached actor.
    async fn get_actor(&self, user_id: UserId) -> AppResult<Option<Actor>>;

    /// Stores an actor.
    async fn put_actor(&self, actor: &Actor) -> AppResult<()>;

    /// Drops a cached actor after role, membership or status changes.
    async fn invalidate(&self, user_id: UserId) -> AppResult<()>;
}

/// Port for password hashing operations. Keeps domain and application free
/// of direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}
