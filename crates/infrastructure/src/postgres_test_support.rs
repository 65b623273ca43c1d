//! Shared fixtures for PostgreSQL repository tests.

use bugzot_application::{Committed, NewUserRecord, ProductRepository, UserRepository};
use bugzot_domain::{
    AccessDecision, AuditAction, DecisionReason, EmailAddress, NewAuditEntry, Product, ProductId,
    ResourceKind, Role, User, UserId,
};
use chrono::Utc;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::{PostgresProductRepository, PostgresUserRepository};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connects to `DATABASE_URL` and applies migrations; `None` when unset.
pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres repository tests: {error}");
    }

    Some(pool)
}

pub(crate) fn allow() -> AccessDecision {
    AccessDecision::Allow(DecisionReason::AdminOverride)
}

pub(crate) fn mutation(action: AuditAction, kind: ResourceKind, target_id: Uuid) -> NewAuditEntry {
    NewAuditEntry::mutation(UserId::new(), action, kind, target_id, allow())
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

pub(crate) async fn seed_user(pool: &PgPool, role: Role) -> User {
    let repository = PostgresUserRepository::new(pool.clone());
    let id = UserId::new();
    let record = NewUserRecord {
        id,
        email: EmailAddress::new(unique_email("user"))
            .unwrap_or_else(|_| panic!("test email should be valid")),
        display_name: "Test User".to_owned(),
        password_hash: "$argon2id$placeholder".to_owned(),
        role,
    };

    let Committed { value, .. } = repository
        .create_user(
            record,
            mutation(AuditAction::UserRegistered, ResourceKind::User, id.as_uuid()),
        )
        .await
        .unwrap_or_else(|error| panic!("user should be created: {error}"));
    value
}

pub(crate) async fn seed_product(pool: &PgPool) -> Product {
    let repository = PostgresProductRepository::new(pool.clone());
    let now = Utc::now();
    let product = Product {
        id: ProductId::new(),
        name: format!("Product {}", Uuid::new_v4().simple()),
        description: None,
        is_active: true,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    };
    let id = product.id.as_uuid();

    repository
        .create_product(
            product,
            mutation(AuditAction::ProductCreated, ResourceKind::Product, id),
        )
        .await
        .unwrap_or_else(|error| panic!("product should be created: {error}"))
        .value
}
