//! Redis-backed token revocation store.

use async_trait::async_trait;
use bugzot_application::TokenRevocationStore;
use bugzot_core::{AppError, AppResult};
use redis::AsyncCommands;

/// Redis implementation of the token revocation port.
///
/// Each revoked token id is stored with `SETEX` until the token would have
/// expired anyway.
#[derive(Clone)]
pub struct RedisTokenRevocationStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisTokenRevocationStore {
    /// Creates a store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, token_id: &str) -> String {
        format!("{}:{token_id}", self.key_prefix)
    }
}

#[async_trait]
impl TokenRevocationStore for RedisTokenRevocationStore {
    async fn revoke(&self, token_id: &str, ttl_seconds: u64) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        connection
            .set_ex(self.key_for(token_id), "revoked", ttl_seconds)
            .await
            .map_err(|error| AppError::Internal(format!("failed to revoke token: {error}")))
    }

    async fn is_revoked(&self, token_id: &str) -> AppResult<bool> {
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        connection
            .exists(self.key_for(token_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to check token revocation: {error}"))
            })
    }
}
