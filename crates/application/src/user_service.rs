//! Account lifecycle and user administration.
//!
//! Registration, login and logout follow OWASP guidelines: generic login
//! failures, a password hash computed even for unknown accounts, and per-IP
//! attempt budgets.

mod administration;
mod login;
mod registration;

pub use administration::USER_PAGE_MAX;

use std::sync::Arc;

use bugzot_core::AppResult;
use bugzot_domain::{Actor, User};

use crate::{
    AuditService, AuthorizationService, IdentityService, IssuedToken, PasswordHasher,
    RateLimitRule, RateLimitService, UserRepository,
};

/// Parameters for user registration.
#[derive(Debug, Clone)]
pub struct RegisterParams {
    /// Email address for the new account.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Display name.
    pub display_name: String,
    /// Client address used for rate limiting.
    pub client_ip: Option<String>,
}

/// Parameters for a login attempt.
#[derive(Debug, Clone)]
pub struct LoginParams {
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Client address used for rate limiting.
    pub client_ip: Option<String>,
}

/// Administrator edit of another account's profile. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateParams {
    /// New login email.
    pub email: Option<String>,
    /// New display name.
    pub display_name: Option<String>,
}

/// Successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Account after the login was recorded.
    pub user: User,
    /// Freshly issued access token.
    pub token: IssuedToken,
}

/// Attempt budgets for credential endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRateLimits {
    /// Login budget per client.
    pub login: RateLimitRule,
    /// Registration budget per client.
    pub register: RateLimitRule,
}

impl Default for AuthRateLimits {
    fn default() -> Self {
        Self {
            login: RateLimitRule::login_default(),
            register: RateLimitRule::register_default(),
        }
    }
}

/// Application service for accounts.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    identity_service: IdentityService,
    authorization_service: AuthorizationService,
    audit_service: AuditService,
    rate_limit_service: RateLimitService,
    rate_limits: AuthRateLimits,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        identity_service: IdentityService,
        authorization_service: AuthorizationService,
        audit_service: AuditService,
        rate_limit_service: RateLimitService,
        rate_limits: AuthRateLimits,
    ) -> Self {
        Self {
            user_repository,
            password_hasher,
            identity_service,
            authorization_service,
            audit_service,
            rate_limit_service,
            rate_limits,
        }
    }

    /// Returns the caller's own profile.
    pub async fn me(&self, actor: &Actor) -> AppResult<User> {
        self.get_user(actor, actor.user_id()).await
    }

    async fn check_rate_limit(&self, rule: &RateLimitRule, client_ip: Option<&str>) -> AppResult<()> {
        self.rate_limit_service
            .check_rate_limit(rule, client_ip.unwrap_or("unknown"))
            .await
    }
}

#[cfg(test)]
mod tests;
