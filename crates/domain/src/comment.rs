use std::str::FromStr;

use bugzot_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BugId, CommentId, UserId};

/// Maximum comment body length.
pub const COMMENT_BODY_MAX_LENGTH: usize = 10_000;

/// Who may read a comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentVisibility {
    /// Readable by any member of the owning product.
    #[default]
    Public,
    /// Readable by maintainers of the owning product and admins.
    Private,
}

impl CommentVisibility {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl FromStr for CommentVisibility {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            _ => Err(AppError::Validation(format!(
                "unknown comment visibility '{value}'"
            ))),
        }
    }
}

/// Persisted comment on a bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Stable identifier.
    pub id: CommentId,
    /// Bug the comment belongs to.
    pub bug_id: BugId,
    /// Comment author.
    pub author_id: UserId,
    /// Read visibility.
    pub visibility: CommentVisibility,
    /// Comment text.
    pub body: String,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last edit timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Validates and normalizes a comment body.
pub fn validate_comment_body(value: impl Into<String>) -> AppResult<String> {
    let body = NonEmptyString::new(value)?;
    if body.as_str().chars().count() > COMMENT_BODY_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "comment must not exceed {COMMENT_BODY_MAX_LENGTH} characters"
        )));
    }

    Ok(body.into())
}
