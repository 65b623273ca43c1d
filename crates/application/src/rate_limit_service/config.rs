use bugzot_core::{AppError, AppResult};

/// Configuration for a rate limit rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    /// The category name (e.g., "login", "register").
    pub category: String,
    /// Maximum number of attempts allowed in the window.
    pub max_attempts: u64,
    /// Window duration in seconds.
    pub window_seconds: u64,
}

impl RateLimitRule {
    /// Creates a new rate limit rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: u64, window_seconds: u64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_seconds,
        }
    }

    /// Default login budget: 5 attempts per minute.
    #[must_use]
    pub fn login_default() -> Self {
        Self::new("login", 5, 60)
    }

    /// Default registration budget: 5 attempts per hour.
    #[must_use]
    pub fn register_default() -> Self {
        Self::new("register", 5, 3600)
    }

    /// Parses a `"max/window_seconds"` setting such as `"5/60"`.
    pub fn parse(category: impl Into<String>, value: &str) -> AppResult<Self> {
        let invalid = || {
            AppError::Validation(format!(
                "rate limit '{value}' must look like '<max_attempts>/<window_seconds>'"
            ))
        };

        let (max_attempts, window_seconds) = value.trim().split_once('/').ok_or_else(invalid)?;
        let max_attempts = max_attempts.trim().parse::<u64>().map_err(|_| invalid())?;
        let window_seconds = window_seconds.trim().parse::<u64>().map_err(|_| invalid())?;
        if max_attempts == 0 || window_seconds == 0 {
            return Err(invalid());
        }

        Ok(Self::new(category, max_attempts, window_seconds))
    }
}
