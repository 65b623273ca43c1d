//! Transaction, error and audit helpers shared by the PostgreSQL repositories.

use bugzot_core::{AppError, AppResult};
use bugzot_domain::NewAuditEntry;
use std::future::Future;
use std::time::Duration;

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{error, warn};

const SERIALIZATION_FAILURE: &str = "40001";
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Attempts per mutation before a serialization failure reaches the caller.
pub(crate) const SERIALIZABLE_ATTEMPTS: u32 = 5;

const SERIALIZABLE_BACKOFF: Duration = Duration::from_millis(10);

/// Advisory lock key held while appending audit entries.
///
/// Appenders queue on this lock until the holder commits, so identity values
/// become visible in sequence order and an `after_sequence` cursor never
/// skips a late-committing entry.
const AUDIT_APPEND_LOCK: i64 = 0x6275_677a_6f74;

/// Opens a transaction at SERIALIZABLE isolation.
pub(crate) async fn begin_serializable(pool: &PgPool) -> AppResult<Transaction<'static, Postgres>> {
    let mut transaction = pool
        .begin()
        .await
        .map_err(|error| map_sqlx_error(error, "begin transaction"))?;

    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "set transaction isolation"))?;

    Ok(transaction)
}

/// Runs a whole serializable transaction again while PostgreSQL aborts it
/// with a serialization failure.
///
/// Each attempt re-reads current state, so a request that lost a race is
/// decided against the winner's committed rows. Only after
/// [`SERIALIZABLE_ATTEMPTS`] aborts does `SerializationConflict` escape.
pub(crate) async fn retry_serializable<T, F, Fut>(context: &str, mut attempt: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt_number = 1;
    loop {
        match attempt().await {
            Err(AppError::SerializationConflict(message))
                if attempt_number < SERIALIZABLE_ATTEMPTS =>
            {
                warn!(
                    context,
                    attempt = attempt_number,
                    reason = %message,
                    "serialization failure, retrying transaction"
                );
                tokio::time::sleep(SERIALIZABLE_BACKOFF * attempt_number).await;
                attempt_number += 1;
            }
            Err(AppError::SerializationConflict(message)) => {
                error!(
                    context,
                    attempts = attempt_number,
                    reason = %message,
                    "serialization failures exhausted transaction retries"
                );
                return Err(AppError::SerializationConflict(message));
            }
            other => return other,
        }
    }
}

/// Commits a transaction; a serialization failure here aborts the attempt.
pub(crate) async fn commit(transaction: Transaction<'_, Postgres>, context: &str) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| map_sqlx_error(error, context))
}

/// Maps a sqlx error onto the application error taxonomy.
pub(crate) fn map_sqlx_error(error: sqlx::Error, context: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some(SERIALIZATION_FAILURE) => {
                return AppError::SerializationConflict(format!(
                    "{context}: concurrent update detected"
                ));
            }
            Some(UNIQUE_VIOLATION) => {
                return AppError::Conflict(format!("{context}: {}", database_error.message()));
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return AppError::NotFound(format!(
                    "{context}: referenced record does not exist"
                ));
            }
            _ => {}
        }
    }

    AppError::Internal(format!("failed to {context}: {error}"))
}

/// Appends an audit entry inside the caller's transaction and returns its sequence.
pub(crate) async fn append_audit_entry(
    connection: &mut PgConnection,
    entry: &NewAuditEntry,
) -> AppResult<i64> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(AUDIT_APPEND_LOCK)
        .execute(&mut *connection)
        .await
        .map_err(audit_write_error)?;

    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO audit_entries (
            actor_id,
            action,
            target_type,
            target_id,
            decision,
            reason,
            detail
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING sequence
        "#,
    )
    .bind(entry.actor_id.map(|actor_id| actor_id.as_uuid()))
    .bind(&entry.action)
    .bind(entry.target_type.as_str())
    .bind(entry.target_id)
    .bind(entry.decision.as_str())
    .bind(&entry.reason)
    .bind(&entry.detail)
    .fetch_one(&mut *connection)
    .await
    .map_err(audit_write_error)
}

fn audit_write_error(error: sqlx::Error) -> AppError {
    let serialization_failure = matches!(
        &error,
        sqlx::Error::Database(database_error)
            if database_error.code().as_deref() == Some(SERIALIZATION_FAILURE)
    );
    if serialization_failure {
        return map_sqlx_error(error, "append audit entry");
    }

    error!(error = %error, "audit append failed, rolling back the transaction");
    AppError::AuditWriteFailure(format!("failed to append audit entry: {error}"))
}

/// Converts a page size or offset into a SQL bind value.
pub(crate) fn page_bound(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use bugzot_core::AppError;

    use super::{SERIALIZABLE_ATTEMPTS, retry_serializable};

    #[tokio::test]
    async fn serialization_failures_rerun_the_transaction() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), AppError> = retry_serializable("transition bug", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::SerializationConflict("aborted".to_owned()))
            } else {
                Err(AppError::InvalidTransition("in_progress -> in_progress".to_owned()))
            }
        })
        .await;

        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), AppError> = retry_serializable("delete bug", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::NotFound("bug".to_owned()))
        })
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), AppError> = retry_serializable("update bug", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::SerializationConflict("aborted".to_owned()))
        })
        .await;

        assert!(matches!(result, Err(AppError::SerializationConflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), SERIALIZABLE_ATTEMPTS);
    }
}
