use async_trait::async_trait;
use bugzot_application::{BugChanges, BugListQuery, BugRepository, Committed};
use bugzot_domain::BugStatus;
use serde_json::json;

use super::*;

#[async_trait]
impl BugRepository for InMemoryStore {
    async fn find_bug(&self, bug_id: BugId) -> AppResult<Option<Bug>> {
        Ok(self.state.read().await.bugs.get(&bug_id).cloned())
    }

    async fn list_bugs(&self, product_id: ProductId, query: BugListQuery) -> AppResult<Vec<Bug>> {
        let state = self.state.read().await;
        let mut bugs: Vec<Bug> = state
            .bugs
            .values()
            .filter(|bug| bug.product_id == product_id)
            .filter(|bug| query.status.is_none_or(|status| bug.status == status))
            .cloned()
            .collect();
        bugs.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });

        Ok(bugs
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn create_bug(&self, bug: Bug, audit: NewAuditEntry) -> AppResult<Committed<Bug>> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get(&bug.product_id)
            .filter(|product| !product.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("product '{}' not found", bug.product_id)))?;
        if !product.is_active {
            return Err(AppError::Conflict(format!(
                "product '{}' is not accepting new bugs",
                bug.product_id
            )));
        }

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.bugs.insert(bug.id, bug.clone());
        Ok(Committed::new(bug, sequence))
    }

    async fn update_bug(
        &self,
        bug_id: BugId,
        changes: BugChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Bug>> {
        let mut state = self.state.write().await;
        let mut bug = state.require_bug(bug_id)?.clone();
        if let Some(title) = changes.title {
            bug.title = title;
        }
        if let Some(description) = changes.description {
            bug.description = description;
        }
        if let Some(priority) = changes.priority {
            bug.priority = priority;
        }
        if let Some(assignee_id) = changes.assignee_id {
            bug.assignee_id = assignee_id;
        }
        bug.updated_at = Utc::now();

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.bugs.insert(bug_id, bug.clone());
        Ok(Committed::new(bug, sequence))
    }

    async fn transition_status(
        &self,
        bug_id: BugId,
        next: BugStatus,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Bug>> {
        let mut state = self.state.write().await;
        let mut bug = state.require_bug(bug_id)?.clone();
        let current = bug.status;
        bug.status = current.transition_to(next)?;
        bug.updated_at = Utc::now();

        let audit = audit.with_detail(json!({ "from": current.as_str(), "to": bug.status.as_str() }));
        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.bugs.insert(bug_id, bug.clone());
        Ok(Committed::new(bug, sequence))
    }

    async fn delete_bug(&self, bug_id: BugId, audit: NewAuditEntry) -> AppResult<Committed<()>> {
        let mut state = self.state.write().await;
        state.require_bug(bug_id)?;

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.bugs.remove(&bug_id);
        state.comments.retain(|_, comment| comment.bug_id != bug_id);
        state
            .attachments
            .retain(|_, attachment| attachment.bug_id != bug_id);
        Ok(Committed::new((), sequence))
    }
}
