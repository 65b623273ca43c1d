use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bugzot_application::ActorCache;
use bugzot_core::AppResult;
use bugzot_domain::{Actor, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct ActorCacheEntry {
    actor: Actor,
    expires_at: Instant,
}

/// In-process actor cache with a fixed entry lifetime.
#[derive(Debug)]
pub struct InMemoryActorCache {
    entries: RwLock<HashMap<UserId, ActorCacheEntry>>,
    ttl: Duration,
}

impl InMemoryActorCache {
    /// Creates an empty cache whose entries live for `ttl_seconds`.
    #[must_use]
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }
}

#[async_trait]
impl ActorCache for InMemoryActorCache {
    async fn get_actor(&self, user_id: UserId) -> AppResult<Option<Actor>> {
        {
            let entries = self.entries.read().await;
            match entries.get(&user_id) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.actor.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(&user_id)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(&user_id);
        }

        Ok(None)
    }

    async fn put_actor(&self, actor: &Actor) -> AppResult<()> {
        if self.ttl.is_zero() {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now.checked_add(self.ttl).unwrap_or(now);
        self.entries.write().await.insert(
            actor.user_id(),
            ActorCacheEntry {
                actor: actor.clone(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn invalidate(&self, user_id: UserId) -> AppResult<()> {
        self.entries.write().await.remove(&user_id);
        Ok(())
    }
}
