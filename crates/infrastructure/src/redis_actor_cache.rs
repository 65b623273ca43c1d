//! Redis-backed actor cache.

use async_trait::async_trait;
use bugzot_application::ActorCache;
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{Actor, UserId};
use redis::AsyncCommands;
use tracing::warn;

/// Redis implementation of the actor cache port. Entries are JSON with a TTL.
#[derive(Clone)]
pub struct RedisActorCache {
    client: redis::Client,
    key_prefix: String,
    ttl_seconds: u64,
}

impl RedisActorCache {
    /// Creates a cache adapter with a configured Redis client, key prefix and entry lifetime.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            ttl_seconds,
        }
    }

    fn key_for(&self, user_id: UserId) -> String {
        format!("{}:{user_id}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl ActorCache for RedisActorCache {
    async fn get_actor(&self, user_id: UserId) -> AppResult<Option<Actor>> {
        let mut connection = self.connection().await?;
        let encoded: Option<String> = connection
            .get(self.key_for(user_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read actor cache entry: {error}"))
            })?;

        let Some(encoded) = encoded else {
            return Ok(None);
        };

        match serde_json::from_str::<Actor>(&encoded) {
            Ok(actor) => Ok(Some(actor)),
            Err(error) => {
                // Stale layouts from an older release are treated as a miss.
                warn!(user_id = %user_id, error = %error, "discarding undecodable actor cache entry");
                Ok(None)
            }
        }
    }

    async fn put_actor(&self, actor: &Actor) -> AppResult<()> {
        if self.ttl_seconds == 0 {
            return Ok(());
        }

        let value = serde_json::to_string(actor).map_err(|error| {
            AppError::Internal(format!("failed to encode actor cache entry: {error}"))
        })?;
        let mut connection = self.connection().await?;

        connection
            .set_ex(self.key_for(actor.user_id()), value, self.ttl_seconds)
            .await
            .map_err(|error| AppError::Internal(format!("failed to write actor cache entry: {error}")))
    }

    async fn invalidate(&self, user_id: UserId) -> AppResult<()> {
        let mut connection = self.connection().await?;

        connection
            .del(self.key_for(user_id))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to invalidate actor cache entry: {error}"))
            })
    }
}
