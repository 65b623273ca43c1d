//! Redis-backed fixed-window attempt counters.

use async_trait::async_trait;
use bugzot_application::{AttemptInfo, RateLimitRepository};
use bugzot_core::{AppError, AppResult};
use redis::Script;

// Opens the window with its expiry before counting, so a counter never
// outlives its window even if the script is interrupted between calls.
const RECORD_ATTEMPT_SCRIPT: &str = r#"
redis.call('SET', KEYS[1], 0, 'EX', ARGV[1], 'NX')
local attempts = redis.call('INCR', KEYS[1])
local remaining = redis.call('TTL', KEYS[1])
return {attempts, remaining}
"#;

/// Counts login and registration attempts in Redis so every API replica
/// shares one budget per client.
#[derive(Clone)]
pub struct RedisRateLimitRepository {
    client: redis::Client,
    key_prefix: String,
    script: Script,
}

impl RedisRateLimitRepository {
    /// Creates a repository; keys are stored as `{key_prefix}:{key}`.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            script: Script::new(RECORD_ATTEMPT_SCRIPT),
        }
    }
}

#[async_trait]
impl RateLimitRepository for RedisRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: u64) -> AppResult<AttemptInfo> {
        if window_seconds == 0 {
            return Err(AppError::Validation(
                "rate limit window must be greater than zero".to_owned(),
            ));
        }

        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        let (attempts, remaining): (i64, i64) = self
            .script
            .key(format!("{}:{key}", self.key_prefix))
            .arg(window_seconds)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to count attempt for '{key}': {error}"))
            })?;

        Ok(AttemptInfo {
            attempt_count: u64::try_from(attempts).unwrap_or(u64::MAX),
            retry_after_seconds: u64::try_from(remaining)
                .unwrap_or(window_seconds)
                .clamp(1, window_seconds),
        })
    }
}
