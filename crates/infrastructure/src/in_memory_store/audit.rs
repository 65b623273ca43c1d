use async_trait::async_trait;
use bugzot_application::{AuditQuery, AuditRepository};

use super::*;

impl InMemoryStore {
    /// Returns the full audit log in sequence order.
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.read().await.audit.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryStore {
    async fn append_entry(&self, entry: NewAuditEntry) -> AppResult<i64> {
        self.state
            .write()
            .await
            .append_audit(self.audit_offline(), entry)
    }

    async fn list_entries(&self, query: &AuditQuery) -> AppResult<Vec<AuditEntry>> {
        let state = self.state.read().await;
        Ok(state
            .audit
            .iter()
            .filter(|entry| {
                query
                    .after_sequence
                    .is_none_or(|after| entry.sequence > after)
            })
            .filter(|entry| query.matches(entry))
            .take(query.limit)
            .cloned()
            .collect())
    }
}
