//! In-memory implementation of every repository port.
//!
//! All state, the audit log included, sits behind a single lock. A mutation
//! validates against the locked state, appends its audit entry and only then
//! applies the change, so a failed audit append leaves the state untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use bugzot_core::{AppError, AppResult};
use bugzot_domain::{
    Attachment, AttachmentId, AuditEntry, Bug, BugId, Comment, CommentId, NewAuditEntry, Product,
    ProductId, ProductMembership, Role, User, UserId,
};
use chrono::Utc;
use tokio::sync::RwLock;

mod attachments;
mod audit;
mod bugs;
mod comments;
mod products;
mod users;

/// In-memory store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    audit_offline: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent audit append fail with `AuditWriteFailure`.
    pub fn set_audit_offline(&self, offline: bool) {
        self.audit_offline.store(offline, Ordering::SeqCst);
    }

    fn audit_offline(&self) -> bool {
        self.audit_offline.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<UserId, StoredUser>,
    products: HashMap<ProductId, Product>,
    memberships: Vec<MembershipRecord>,
    bugs: HashMap<BugId, Bug>,
    comments: HashMap<CommentId, Comment>,
    attachments: HashMap<AttachmentId, Attachment>,
    audit: Vec<AuditEntry>,
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone, Copy)]
struct MembershipRecord {
    product_id: ProductId,
    user_id: UserId,
    role_override: Option<Role>,
}

impl StoreState {
    /// Appends an audit entry; the caller applies its mutation afterwards.
    fn append_audit(&mut self, offline: bool, entry: NewAuditEntry) -> AppResult<i64> {
        if offline {
            return Err(AppError::AuditWriteFailure(
                "audit log is unavailable".to_owned(),
            ));
        }

        let sequence = self.audit.last().map_or(1, |last| last.sequence + 1);
        self.audit
            .push(AuditEntry::from_new(sequence, entry, Utc::now()));
        Ok(sequence)
    }

    /// Returns a user with memberships of live products attached.
    fn hydrate_user(&self, stored: &StoredUser) -> User {
        let mut user = stored.user.clone();
        user.memberships = self
            .memberships
            .iter()
            .filter(|record| record.user_id == user.id)
            .filter(|record| {
                self.products
                    .get(&record.product_id)
                    .is_some_and(|product| !product.is_deleted)
            })
            .map(|record| ProductMembership {
                product_id: record.product_id,
                role_override: record.role_override,
            })
            .collect();
        user
    }

    fn stored_user(&self, user_id: UserId) -> AppResult<&StoredUser> {
        self.users
            .get(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' not found")))
    }

    fn require_bug(&self, bug_id: BugId) -> AppResult<&Bug> {
        self.bugs
            .get(&bug_id)
            .ok_or_else(|| AppError::NotFound(format!("bug '{bug_id}' not found")))
    }
}

#[cfg(test)]
mod tests;
