use std::sync::Arc;

use bugzot_application::{
    AttachmentRepository, AuditRepository, BugRepository, CommentRepository, ProductRepository,
    UserRepository,
};
use bugzot_infrastructure::{
    InMemoryStore, PostgresAttachmentRepository, PostgresAuditRepository, PostgresBugRepository,
    PostgresCommentRepository, PostgresProductRepository, PostgresUserRepository,
};
use sqlx::PgPool;

pub(super) struct RepositorySet {
    pub(super) user_repository: Arc<dyn UserRepository>,
    pub(super) product_repository: Arc<dyn ProductRepository>,
    pub(super) bug_repository: Arc<dyn BugRepository>,
    pub(super) comment_repository: Arc<dyn CommentRepository>,
    pub(super) attachment_repository: Arc<dyn AttachmentRepository>,
    pub(super) audit_repository: Arc<dyn AuditRepository>,
}

pub(super) fn build_postgres_repository_set(pool: &PgPool) -> RepositorySet {
    RepositorySet {
        user_repository: Arc::new(PostgresUserRepository::new(pool.clone())),
        product_repository: Arc::new(PostgresProductRepository::new(pool.clone())),
        bug_repository: Arc::new(PostgresBugRepository::new(pool.clone())),
        comment_repository: Arc::new(PostgresCommentRepository::new(pool.clone())),
        attachment_repository: Arc::new(PostgresAttachmentRepository::new(pool.clone())),
        audit_repository: Arc::new(PostgresAuditRepository::new(pool.clone())),
    }
}

/// Every port shares one store so mutations and audit entries stay atomic.
pub(super) fn build_memory_repository_set() -> RepositorySet {
    let store = Arc::new(InMemoryStore::new());

    RepositorySet {
        user_repository: store.clone(),
        product_repository: store.clone(),
        bug_repository: store.clone(),
        comment_repository: store.clone(),
        attachment_repository: store.clone(),
        audit_repository: store,
    }
}
