use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bugzot_application::{AttemptInfo, RateLimitRepository};
use bugzot_core::{AppError, AppResult};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    attempt_count: u64,
}

/// In-process fixed-window attempt counter.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitRepository {
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimitRepository {
    /// Creates an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: u64) -> AppResult<AttemptInfo> {
        if window_seconds == 0 {
            return Err(AppError::Validation(
                "rate limit window must be greater than zero".to_owned(),
            ));
        }

        let window_length = Duration::from_secs(window_seconds);
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_owned()).or_insert(Window {
            started_at: now,
            attempt_count: 0,
        });

        if now.duration_since(window.started_at) >= window_length {
            *window = Window {
                started_at: now,
                attempt_count: 0,
            };
        }
        window.attempt_count += 1;

        let elapsed = now.duration_since(window.started_at);
        let remaining = window_length.saturating_sub(elapsed).as_secs().max(1);

        Ok(AttemptInfo {
            attempt_count: window.attempt_count,
            retry_after_seconds: remaining,
        })
    }
}
