use bugzot_application::{BugRepository, ProductChanges, ProductFilter, ProductRepository};
use bugzot_core::AppError;
use bugzot_domain::{
    AuditAction, Bug, BugId, BugPriority, BugStatus, Product, ProductId, ResourceKind, Role,
};
use chrono::Utc;

use super::PostgresProductRepository;
use crate::PostgresBugRepository;
use crate::postgres_test_support::{mutation, seed_product, seed_user, test_pool};

fn deletion(product: &Product) -> bugzot_domain::NewAuditEntry {
    mutation(
        AuditAction::ProductDeleted,
        ResourceKind::Product,
        product.id.as_uuid(),
    )
}

#[tokio::test]
async fn live_names_are_unique_case_insensitively() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresProductRepository::new(pool.clone());
    let existing = seed_product(&pool).await;
    let now = Utc::now();
    let copy = Product {
        id: ProductId::new(),
        name: existing.name.to_uppercase(),
        description: None,
        is_active: true,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    };
    let copy_id = copy.id.as_uuid();

    let duplicate = repository
        .create_product(
            copy.clone(),
            mutation(AuditAction::ProductCreated, ResourceKind::Product, copy_id),
        )
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    repository
        .soft_delete_product(existing.id, deletion(&existing))
        .await
        .unwrap_or_else(|error| panic!("empty product should be deletable: {error}"));
    let reused = repository
        .create_product(
            copy,
            mutation(AuditAction::ProductCreated, ResourceKind::Product, copy_id),
        )
        .await;
    assert!(reused.is_ok());
}

#[tokio::test]
async fn partial_update_can_clear_description() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresProductRepository::new(pool.clone());
    let product = seed_product(&pool).await;
    let target = product.id.as_uuid();

    let described = repository
        .update_product(
            product.id,
            ProductChanges {
                description: Some(Some("Desktop client".to_owned())),
                ..ProductChanges::default()
            },
            mutation(AuditAction::ProductUpdated, ResourceKind::Product, target),
        )
        .await
        .unwrap_or_else(|error| panic!("update should persist: {error}"))
        .value;
    assert_eq!(described.description.as_deref(), Some("Desktop client"));
    assert_eq!(described.name, product.name);

    let cleared = repository
        .update_product(
            product.id,
            ProductChanges {
                description: Some(None),
                is_active: Some(false),
                ..ProductChanges::default()
            },
            mutation(AuditAction::ProductUpdated, ResourceKind::Product, target),
        )
        .await
        .unwrap_or_else(|error| panic!("update should persist: {error}"))
        .value;
    assert_eq!(cleared.description, None);
    assert!(!cleared.is_active);
}

#[tokio::test]
async fn delete_is_refused_while_bugs_are_open() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let products = PostgresProductRepository::new(pool.clone());
    let bugs = PostgresBugRepository::new(pool.clone());
    let product = seed_product(&pool).await;
    let reporter = seed_user(&pool, Role::Reporter).await;
    let now = Utc::now();
    let bug = Bug {
        id: BugId::new(),
        product_id: product.id,
        reporter_id: reporter.id,
        assignee_id: None,
        title: "Blocks deletion".to_owned(),
        description: "Open bug".to_owned(),
        status: BugStatus::Open,
        priority: BugPriority::Low,
        created_at: now,
        updated_at: now,
    };
    let bug_id = bug.id;
    bugs.create_bug(
        bug,
        mutation(AuditAction::BugCreated, ResourceKind::Bug, bug_id.as_uuid()),
    )
    .await
    .unwrap_or_else(|error| panic!("bug should be created: {error}"));

    let refused = products
        .soft_delete_product(product.id, deletion(&product))
        .await;
    assert!(matches!(refused, Err(AppError::Conflict(_))));

    for next in [BugStatus::InProgress, BugStatus::Resolved, BugStatus::Closed] {
        bugs.transition_status(
            bug_id,
            next,
            mutation(
                AuditAction::BugStatusChanged,
                ResourceKind::Bug,
                bug_id.as_uuid(),
            ),
        )
        .await
        .unwrap_or_else(|error| panic!("transition should succeed: {error}"));
    }

    let deleted = products
        .soft_delete_product(product.id, deletion(&product))
        .await
        .unwrap_or_else(|error| panic!("closed product should be deletable: {error}"))
        .value;
    assert!(deleted.is_deleted);
    assert!(!deleted.is_active);
}

#[tokio::test]
async fn members_are_upserted_and_removed() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresProductRepository::new(pool.clone());
    let product = seed_product(&pool).await;
    let user = seed_user(&pool, Role::Reporter).await;
    let target = product.id.as_uuid();

    for role_override in [None, Some(Role::Maintainer)] {
        repository
            .set_member(
                product.id,
                user.id,
                role_override,
                mutation(AuditAction::ProductMemberSet, ResourceKind::Product, target),
            )
            .await
            .unwrap_or_else(|error| panic!("membership should persist: {error}"));
    }

    let members = repository.list_members(product.id).await.unwrap_or_default();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role_override, Some(Role::Maintainer));

    repository
        .remove_member(
            product.id,
            user.id,
            mutation(AuditAction::ProductMemberRemoved, ResourceKind::Product, target),
        )
        .await
        .unwrap_or_else(|error| panic!("removal should succeed: {error}"));
    let again = repository
        .remove_member(
            product.id,
            user.id,
            mutation(AuditAction::ProductMemberRemoved, ResourceKind::Product, target),
        )
        .await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn listing_filters_by_name_and_active_flag() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresProductRepository::new(pool.clone());
    let active = seed_product(&pool).await;
    let inactive = seed_product(&pool).await;
    let deleted = seed_product(&pool).await;
    repository
        .update_product(
            inactive.id,
            ProductChanges {
                is_active: Some(false),
                ..ProductChanges::default()
            },
            mutation(
                AuditAction::ProductUpdated,
                ResourceKind::Product,
                inactive.id.as_uuid(),
            ),
        )
        .await
        .unwrap_or_else(|error| panic!("deactivation should succeed: {error}"));
    repository
        .soft_delete_product(deleted.id, deletion(&deleted))
        .await
        .unwrap_or_else(|error| panic!("delete should succeed: {error}"));

    let by_name = |name: &str, is_active: Option<bool>| ProductFilter {
        search: Some(name.to_uppercase()),
        is_active,
    };
    let found = repository
        .list_products(&by_name(&active.name, None))
        .await
        .unwrap_or_default();
    assert_eq!(found.iter().map(|product| product.id).collect::<Vec<_>>(), vec![active.id]);

    let inactive_only = repository
        .list_products(&by_name(&inactive.name, Some(true)))
        .await
        .unwrap_or_default();
    assert!(inactive_only.is_empty());
    let inactive_found = repository
        .list_products(&by_name(&inactive.name, Some(false)))
        .await
        .unwrap_or_default();
    assert_eq!(inactive_found.len(), 1);

    let gone = repository
        .list_products(&by_name(&deleted.name, None))
        .await
        .unwrap_or_default();
    assert!(gone.is_empty());
}
