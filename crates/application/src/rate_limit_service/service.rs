use std::sync::Arc;

use bugzot_core::{AppError, AppResult};
use tracing::warn;

use super::config::RateLimitRule;
use crate::RateLimitRepository;

/// Application service for rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Records an attempt and checks it against the rule.
    ///
    /// Returns `Err(AppError::RateLimited)` once the budget of the current
    /// window is spent. The key is typically the client IP address.
    pub async fn check_rate_limit(&self, rule: &RateLimitRule, key: &str) -> AppResult<()> {
        let composite_key = format!("{}:{key}", rule.category);
        let info = self
            .repository
            .record_attempt(&composite_key, rule.window_seconds)
            .await?;

        if info.attempt_count > rule.max_attempts {
            warn!(
                category = %rule.category,
                client = %key,
                retry_after_seconds = info.retry_after_seconds,
                "rate limit exceeded"
            );
            return Err(AppError::RateLimited(format!(
                "too many requests, retry in {} seconds",
                info.retry_after_seconds
            )));
        }

        Ok(())
    }
}
