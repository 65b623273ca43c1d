//! PostgreSQL-backed rate limit repository using the `rate_limit_attempts` table.

use async_trait::async_trait;
use sqlx::PgPool;

use bugzot_application::{AttemptInfo, RateLimitRepository};
use bugzot_core::{AppError, AppResult};

use crate::postgres_support::map_sqlx_error;

/// PostgreSQL implementation of the rate limit repository port.
#[derive(Clone)]
pub struct PostgresRateLimitRepository {
    pool: PgPool,
}

impl PostgresRateLimitRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitRepository for PostgresRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: u64) -> AppResult<AttemptInfo> {
        if window_seconds == 0 {
            return Err(AppError::Validation(
                "rate limit window must be greater than zero".to_owned(),
            ));
        }

        let window = f64::from(u32::try_from(window_seconds).map_err(|error| {
            AppError::Validation(format!("invalid rate limit window: {error}"))
        })?);

        // Expired windows restart at one attempt.
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO rate_limit_attempts (key, window_started_at, attempt_count)
            VALUES ($1, now(), 1)
            ON CONFLICT (key) DO UPDATE
            SET
                attempt_count = CASE
                    WHEN rate_limit_attempts.window_started_at + make_interval(secs => $2) <= now()
                    THEN 1
                    ELSE rate_limit_attempts.attempt_count + 1
                END,
                window_started_at = CASE
                    WHEN rate_limit_attempts.window_started_at + make_interval(secs => $2) <= now()
                    THEN now()
                    ELSE rate_limit_attempts.window_started_at
                END
            RETURNING
                attempt_count,
                CEIL(EXTRACT(EPOCH FROM (
                    window_started_at + make_interval(secs => $2) - now()
                )))::BIGINT AS retry_after_seconds
            "#,
        )
        .bind(key)
        .bind(window)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "record rate limit attempt"))?;

        Ok(AttemptInfo {
            attempt_count: u64::try_from(row.attempt_count).unwrap_or_default(),
            retry_after_seconds: u64::try_from(row.retry_after_seconds)
                .unwrap_or_default()
                .max(1),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptRow {
    attempt_count: i64,
    retry_after_seconds: i64,
}
