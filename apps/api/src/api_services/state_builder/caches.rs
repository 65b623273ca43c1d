use std::sync::Arc;

use bugzot_application::{ActorCache, RateLimitRepository, TokenRevocationStore};
use bugzot_infrastructure::{
    InMemoryActorCache, InMemoryRateLimitRepository, InMemoryTokenRevocationStore,
    PostgresRateLimitRepository, RedisActorCache, RedisRateLimitRepository,
    RedisTokenRevocationStore,
};
use sqlx::PgPool;
use tracing::warn;

use crate::api_config::ApiConfig;

pub(super) fn build_actor_cache(
    config: &ApiConfig,
    redis_client: Option<redis::Client>,
) -> Option<Arc<dyn ActorCache>> {
    if config.actor_cache_ttl_seconds == 0 {
        return None;
    }

    Some(match redis_client {
        Some(client) => Arc::new(RedisActorCache::new(
            client,
            "bugzot:actor",
            config.actor_cache_ttl_seconds,
        )),
        None => Arc::new(InMemoryActorCache::new(config.actor_cache_ttl_seconds)),
    })
}

pub(super) fn build_revocation_store(
    redis_client: Option<redis::Client>,
) -> Arc<dyn TokenRevocationStore> {
    match redis_client {
        Some(client) => Arc::new(RedisTokenRevocationStore::new(client, "bugzot:revoked")),
        None => {
            warn!("REDIS_URL is not set; revoked tokens are tracked in process memory only");
            Arc::new(InMemoryTokenRevocationStore::new())
        }
    }
}

pub(super) fn build_rate_limit_repository(
    pool: Option<&PgPool>,
    redis_client: Option<redis::Client>,
) -> Arc<dyn RateLimitRepository> {
    match (redis_client, pool) {
        (Some(client), _) => Arc::new(RedisRateLimitRepository::new(client, "bugzot:rate_limit")),
        (None, Some(pool)) => Arc::new(PostgresRateLimitRepository::new(pool.clone())),
        (None, None) => Arc::new(InMemoryRateLimitRepository::new()),
    }
}
