use async_trait::async_trait;
use bugzot_core::AppResult;

/// Repository port for fixed-window attempt counters.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Records an attempt for the given key.
    ///
    /// Starts a new window when none is active. Returns the attempt count
    /// within the active window, this attempt included.
    async fn record_attempt(&self, key: &str, window_seconds: u64) -> AppResult<AttemptInfo>;
}

/// Information about the current rate limit window for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptInfo {
    /// Number of attempts in the current window (including this one).
    pub attempt_count: u64,
    /// Seconds until the window resets.
    pub retry_after_seconds: u64,
}
