use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bugzot_application::TokenRevocationStore;
use bugzot_core::AppResult;
use tokio::sync::RwLock;

/// In-process token revocation store used when Redis is not configured.
///
/// Revocations are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryTokenRevocationStore {
    revoked: RwLock<HashMap<String, Instant>>,
}

impl InMemoryTokenRevocationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRevocationStore for InMemoryTokenRevocationStore {
    async fn revoke(&self, token_id: &str, ttl_seconds: u64) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(ttl_seconds))
            .unwrap_or(now);

        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, until| *until > now);
        revoked.insert(token_id.to_owned(), expires_at);
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> AppResult<bool> {
        Ok(self
            .revoked
            .read()
            .await
            .get(token_id)
            .is_some_and(|until| *until > Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_token_is_reported() -> AppResult<()> {
        let store = InMemoryTokenRevocationStore::new();
        store.revoke("token-1", 60).await?;

        assert!(store.is_revoked("token-1").await?);
        assert!(!store.is_revoked("token-2").await?);
        Ok(())
    }

    #[tokio::test]
    async fn zero_ttl_is_a_no_op() -> AppResult<()> {
        let store = InMemoryTokenRevocationStore::new();
        store.revoke("expired", 0).await?;

        assert!(!store.is_revoked("expired").await?);
        Ok(())
    }
}
