//! Bug records and the status workflow graph.

use std::str::FromStr;

use bugzot_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BugId, ProductId, UserId};

/// Maximum bug title length.
pub const BUG_TITLE_MAX_LENGTH: usize = 200;

/// Bug lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugStatus {
    /// Newly filed.
    #[default]
    Open,
    /// Being worked on.
    InProgress,
    /// Fix delivered, awaiting confirmation.
    Resolved,
    /// Confirmed fixed.
    Closed,
    /// Closed bug that resurfaced.
    Reopened,
}

impl BugStatus {
    /// Returns a stable storage value for the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Reopened => "reopened",
        }
    }

    /// Returns all statuses.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[BugStatus] = &[
            BugStatus::Open,
            BugStatus::InProgress,
            BugStatus::Resolved,
            BugStatus::Closed,
            BugStatus::Reopened,
        ];

        ALL
    }

    /// Returns the statuses reachable from this one in a single step.
    #[must_use]
    pub fn next_statuses(&self) -> &'static [Self] {
        match self {
            Self::Open | Self::Reopened => &[Self::InProgress],
            Self::InProgress => &[Self::Resolved],
            Self::Resolved => &[Self::Closed],
            Self::Closed => &[Self::Reopened],
        }
    }

    /// Returns whether `next` is an edge of the workflow graph.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Validates a transition and returns the new status.
    pub fn transition_to(self, next: Self) -> AppResult<Self> {
        if self.can_transition_to(next) {
            return Ok(next);
        }

        Err(AppError::InvalidTransition(format!(
            "bug status cannot change from '{}' to '{}'",
            self.as_str(),
            next.as_str()
        )))
    }

    /// Returns whether the bug still counts as open work.
    #[must_use]
    pub fn is_open_work(&self) -> bool {
        *self != Self::Closed
    }
}

impl FromStr for BugStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            "reopened" => Ok(Self::Reopened),
            _ => Err(AppError::Validation(format!(
                "unknown bug status '{value}'"
            ))),
        }
    }
}

/// Triage priority.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BugPriority {
    /// Cosmetic or minor.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Important, schedule soon.
    High,
    /// Drop everything.
    Critical,
}

impl BugPriority {
    /// Returns a stable storage value for the priority.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for BugPriority {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(AppError::Validation(format!(
                "unknown bug priority '{value}'"
            ))),
        }
    }
}

/// Persisted bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    /// Stable identifier.
    pub id: BugId,
    /// Owning product.
    pub product_id: ProductId,
    /// User who filed the bug.
    pub reporter_id: UserId,
    /// User currently responsible for the bug.
    pub assignee_id: Option<UserId>,
    /// Short summary.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// Workflow status.
    pub status: BugStatus,
    /// Triage priority.
    pub priority: BugPriority,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Validates and normalizes a bug title.
pub fn validate_bug_title(value: impl Into<String>) -> AppResult<String> {
    let title = NonEmptyString::new(value)?;
    if title.as_str().chars().count() > BUG_TITLE_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "bug title must not exceed {BUG_TITLE_MAX_LENGTH} characters"
        )));
    }

    Ok(title.into())
}

#[cfg(test)]
mod tests;
