//! User account types and registration rules.

use std::str::FromStr;

use bugzot_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Actor, ProductId, Role, UserId};

/// Validated, lowercase email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs structural validation only: exactly one `@`, non-empty local
    /// part, and a domain containing at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let normalized = value.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        };

        if domain.contains('@') {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if normalized.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(normalized))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0
            .split_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or_default()
    }

    /// Returns whether the address belongs to a known throwaway mail provider.
    #[must_use]
    pub fn is_disposable(&self) -> bool {
        let domain = self.domain();
        DISPOSABLE_EMAIL_DOMAINS.contains(&domain)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

static DISPOSABLE_EMAIL_DOMAINS: &[&str] = &["tempmail.com", "10minutemail.com", "mailinator.com"];

/// Minimum password length (NIST SP800-63B, no second factor).
pub const PASSWORD_MIN_LENGTH: usize = 10;

/// Maximum password length. Bounds Argon2id work per login attempt.
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Maximum display name length.
pub const DISPLAY_NAME_MAX_LENGTH: usize = 100;

/// Validates a plaintext password for a new account.
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.trim().is_empty() {
        return Err(AppError::Validation(
            "password must not be blank".to_owned(),
        ));
    }

    let char_count = password.chars().count();
    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    if is_common_password(password) {
        return Err(AppError::Validation(
            "this password is too common and has appeared in data breaches".to_owned(),
        ));
    }

    Ok(())
}

/// Normalizes a display name: strips markup and control characters, trims,
/// and enforces the length bound.
pub fn normalize_display_name(value: &str) -> AppResult<String> {
    let mut cleaned = String::with_capacity(value.len());
    let mut in_tag = false;
    for character in value.chars() {
        match character {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ if character.is_control() => {}
            _ => cleaned.push(character),
        }
    }

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(AppError::Validation(
            "display name must not be empty".to_owned(),
        ));
    }

    if cleaned.chars().count() > DISPLAY_NAME_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "display name must not exceed {DISPLAY_NAME_MAX_LENGTH} characters"
        )));
    }

    Ok(cleaned.to_owned())
}

fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|entry| *entry == lowered)
}

// Entries shorter than the minimum length are already rejected by length.
static COMMON_PASSWORDS: &[&str] = &[
    "1234567890",
    "qwertyuiop",
    "password123",
    "password12",
    "iloveyou12",
    "1q2w3e4r5t",
    "qwerty1234",
    "letmein123",
    "welcome123",
    "passw0rd12",
    "admin12345",
    "abc1234567",
    "football12",
    "baseball12",
    "sunshine12",
    "princess12",
    "0987654321",
    "1111111111",
    "trustno1234",
    "superman123",
];

/// Account status. Users are disabled, never deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Account may authenticate.
    #[default]
    Active,
    /// Account is blocked from authenticating and acting.
    Disabled,
}

impl UserStatus {
    /// Returns a stable storage value for the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }
}

impl FromStr for UserStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            _ => Err(AppError::Validation(format!(
                "unknown user status '{value}'"
            ))),
        }
    }
}

/// Membership of a user in a product, with an optional role override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductMembership {
    /// Product the user belongs to.
    pub product_id: ProductId,
    /// Role used on this product instead of the global role.
    pub role_override: Option<Role>,
}

/// Persisted user account, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Login email, unique and lowercase.
    pub email: EmailAddress,
    /// Human-friendly name.
    pub display_name: String,
    /// Global role.
    pub role: Role,
    /// Account status.
    pub status: UserStatus,
    /// Product memberships with optional overrides.
    pub memberships: Vec<ProductMembership>,
    /// Consecutive failed login attempts since the last success.
    pub failed_login_count: i32,
    /// Timestamp of the last successful login.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns whether the account may authenticate.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Builds the authorization identity for this user.
    #[must_use]
    pub fn to_actor(&self) -> Actor {
        Actor::new(self.id, self.role, self.memberships.clone())
    }
}
