use async_trait::async_trait;
use bugzot_core::AppResult;
use bugzot_domain::{AuditDecision, AuditEntry, NewAuditEntry, ResourceKind, UserId};
use uuid::Uuid;

/// Filter and cursor for reading the audit log in sequence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    /// Restrict to one target kind.
    pub target_type: Option<ResourceKind>,
    /// Restrict to one target id.
    pub target_id: Option<Uuid>,
    /// Restrict to one actor.
    pub actor_id: Option<UserId>,
    /// Restrict to one action name.
    pub action: Option<String>,
    /// Restrict to allow or deny entries.
    pub decision: Option<AuditDecision>,
    /// Return only entries with a greater sequence.
    pub after_sequence: Option<i64>,
    /// Page size.
    pub limit: usize,
}

impl AuditQuery {
    /// Returns whether an entry satisfies every filter (cursor and limit excluded).
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.target_type
            .is_none_or(|target_type| entry.target_type == target_type)
            && self
                .target_id
                .is_none_or(|target_id| entry.target_id == Some(target_id))
            && self
                .actor_id
                .is_none_or(|actor_id| entry.actor_id == Some(actor_id))
            && self
                .action
                .as_deref()
                .is_none_or(|action| entry.action == action)
            && self
                .decision
                .is_none_or(|decision| entry.decision == decision)
    }
}

/// Append-only audit log storage.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one entry outside any mutation and returns its sequence.
    async fn append_entry(&self, entry: NewAuditEntry) -> AppResult<i64>;

    /// Lists entries in ascending sequence order.
    async fn list_entries(&self, query: &AuditQuery) -> AppResult<Vec<AuditEntry>>;
}
