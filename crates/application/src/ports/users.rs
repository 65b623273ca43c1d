use std::cmp::Ordering;
use std::str::FromStr;

use async_trait::async_trait;
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{EmailAddress, NewAuditEntry, Role, User, UserId, UserStatus};
use chrono::{DateTime, Utc};

use super::{Committed, Page, SortDirection, contains_ignoring_case};

/// User together with the stored password hash. Never leaves the service layer.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// Account data.
    pub user: User,
    /// Argon2id PHC string.
    pub password_hash: String,
}

/// Data for inserting a new account.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    /// Pre-generated id, so the audit entry can reference it.
    pub id: UserId,
    /// Normalized email.
    pub email: EmailAddress,
    /// Normalized display name.
    pub display_name: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Initial global role.
    pub role: Role,
}

/// Column the user directory is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSortField {
    /// Login email.
    Email,
    /// Display name.
    DisplayName,
    /// Registration time.
    #[default]
    CreatedAt,
}

impl UserSortField {
    /// Returns the query-string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::DisplayName => "display_name",
            Self::CreatedAt => "created_at",
        }
    }
}

impl FromStr for UserSortField {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "email" => Ok(Self::Email),
            "display_name" => Ok(Self::DisplayName),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(AppError::Validation(format!(
                "users cannot be sorted by '{value}'"
            ))),
        }
    }
}

/// Filters, ordering and paging for the user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListQuery {
    /// Page size.
    pub limit: usize,
    /// Rows to skip.
    pub offset: usize,
    /// Case-insensitive substring of the email or display name.
    pub search: Option<String>,
    /// Only accounts in this status.
    pub status: Option<UserStatus>,
    /// Sort column; ties are broken by id.
    pub sort_by: UserSortField,
    /// Sort order.
    pub sort_dir: SortDirection,
}

impl UserListQuery {
    /// First page of all accounts, newest first.
    #[must_use]
    pub fn first_page(limit: usize) -> Self {
        Self {
            limit,
            offset: 0,
            search: None,
            status: None,
            sort_by: UserSortField::default(),
            sort_dir: SortDirection::Desc,
        }
    }

    /// Returns whether an account passes the search and status filters.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        let status_matches = self.status.is_none_or(|status| user.status == status);
        let search_matches = self.search.as_deref().is_none_or(|needle| {
            contains_ignoring_case(user.email.as_str(), needle)
                || contains_ignoring_case(&user.display_name, needle)
        });
        status_matches && search_matches
    }

    /// Orders two accounts the way the directory lists them.
    #[must_use]
    pub fn compare(&self, left: &User, right: &User) -> Ordering {
        let by_field = match self.sort_by {
            UserSortField::Email => left.email.as_str().cmp(right.email.as_str()),
            UserSortField::DisplayName => left.display_name.cmp(&right.display_name),
            UserSortField::CreatedAt => left.created_at.cmp(&right.created_at),
        };
        self.sort_dir.apply(by_field.then_with(|| left.id.cmp(&right.id)))
    }

    /// Applies filters, ordering and the page window to in-memory accounts.
    #[must_use]
    pub fn select(&self, users: impl IntoIterator<Item = User>) -> Page<User> {
        let mut matching: Vec<User> = users.into_iter().filter(|user| self.matches(user)).collect();
        matching.sort_by(|left, right| self.compare(left, right));
        Page::window(matching, self.offset, self.limit)
    }
}

/// Profile edit applied by an administrator. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfileChanges {
    /// New login email; must stay unique.
    pub email: Option<EmailAddress>,
    /// New normalized display name.
    pub display_name: Option<String>,
}

impl UserProfileChanges {
    /// Returns whether no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.display_name.is_none()
    }
}

/// User account storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by id, memberships included.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Finds credentials by normalized email.
    async fn find_credentials_by_email(
        &self,
        email: &EmailAddress,
    ) -> AppResult<Option<UserCredentials>>;

    /// Lists one page of users matching the query, with the total match count.
    async fn list_users(&self, query: &UserListQuery) -> AppResult<Page<User>>;

    /// Inserts a user. A duplicate email is `AppError::Conflict`.
    async fn create_user(
        &self,
        record: NewUserRecord,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>>;

    /// Increments the failed login counter and returns the new count.
    async fn record_login_failure(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<i32>>;

    /// Resets the failed login counter and stamps the last login time.
    async fn record_login_success(
        &self,
        user_id: UserId,
        logged_in_at: DateTime<Utc>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>>;

    /// Edits profile fields. A duplicate email is `AppError::Conflict`.
    async fn update_profile(
        &self,
        user_id: UserId,
        changes: UserProfileChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>>;

    /// Changes the global role.
    async fn set_role(
        &self,
        user_id: UserId,
        role: Role,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>>;

    /// Marks the account disabled.
    async fn disable_user(&self, user_id: UserId, audit: NewAuditEntry)
    -> AppResult<Committed<User>>;
}
