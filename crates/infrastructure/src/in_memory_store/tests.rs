use std::sync::Arc;

use bugzot_application::{
    AttachmentService, AuditQuery, AuditService, AuthorizationService, BugListQuery,
    BugRepository, BugService, CommentService, IdentityService, NewBugParams, NewUserRecord,
    ProductChanges, ProductFilter, ProductListQuery, ProductRepository, ProductService,
    SortDirection, UserRepository,
};
use bugzot_core::AppError;
use bugzot_domain::{
    AccessDecision, Actor, AttachmentUpload, AuditAction, AuditDecision, BugId, BugStatus,
    CommentVisibility, DecisionReason, EmailAddress, NewAuditEntry, NewProduct, ResourceKind,
};
use futures::TryStreamExt;

use super::*;
use crate::{InMemoryTokenRevocationStore, JwtTokenCodec};

const SECRET: &str = "in-memory-store-test-secret-0123456789";

struct Harness {
    store: Arc<InMemoryStore>,
    products: ProductService,
    bugs: BugService,
    comments: CommentService,
    attachments: AttachmentService,
    audit: AuditService,
    admin: Actor,
}

impl Harness {
    async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let authorization = AuthorizationService::new(store.clone());
        let codec = JwtTokenCodec::new(SECRET, 30).unwrap_or_else(|_| panic!("codec"));
        let identity = IdentityService::new(
            store.clone(),
            Arc::new(codec),
            Arc::new(InMemoryTokenRevocationStore::new()),
            None,
        );

        let admin = seed_user(&store, "admin@example.com", Role::Admin).await;

        Self {
            products: ProductService::new(
                store.clone(),
                store.clone(),
                authorization.clone(),
                identity,
            ),
            bugs: BugService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                authorization.clone(),
            ),
            comments: CommentService::new(store.clone(), store.clone(), authorization.clone()),
            attachments: AttachmentService::new(
                store.clone(),
                store.clone(),
                authorization.clone(),
            ),
            audit: AuditService::new(store.clone(), authorization),
            store,
            admin: admin.to_actor(),
        }
    }

    async fn product_with_members(&self, members: &[(&User, Option<Role>)]) -> Product {
        let product = self
            .products
            .create_product(
                &self.admin,
                NewProduct::new("Widgets", None).unwrap_or_else(|_| panic!("product")),
            )
            .await
            .unwrap_or_else(|_| panic!("product should be created"));

        for (user, role_override) in members {
            self.products
                .set_member(&self.admin, product.id, user.id, *role_override)
                .await
                .unwrap_or_else(|_| panic!("member should be added"));
        }

        product
    }

    async fn actor(&self, user: &User) -> Actor {
        self.store
            .find_user(user.id)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| panic!("user should exist"))
            .to_actor()
    }

    async fn file_bug(&self, actor: &Actor, product_id: ProductId) -> Bug {
        self.bugs
            .create_bug(
                actor,
                product_id,
                NewBugParams {
                    title: "Crash on save".to_owned(),
                    description: "Saving a draft crashes the editor".to_owned(),
                    priority: None,
                    assignee_id: None,
                },
            )
            .await
            .unwrap_or_else(|error| panic!("bug should be filed: {error}"))
    }

    async fn history(&self, kind: ResourceKind, id: uuid::Uuid) -> Vec<AuditEntry> {
        self.audit
            .query_audit(AuditQuery {
                target_type: Some(kind),
                target_id: Some(id),
                limit: 2,
                ..AuditQuery::default()
            })
            .try_collect()
            .await
            .unwrap_or_else(|_| panic!("audit replay should succeed"))
    }
}

async fn seed_user(store: &InMemoryStore, email: &str, role: Role) -> User {
    let id = UserId::new();
    store
        .create_user(
            NewUserRecord {
                id,
                email: EmailAddress::new(email).unwrap_or_else(|_| panic!("email")),
                display_name: email.to_owned(),
                password_hash: "hash".to_owned(),
                role,
            },
            NewAuditEntry::mutation(
                id,
                AuditAction::UserRegistered,
                ResourceKind::User,
                id.as_uuid(),
                AccessDecision::Allow(DecisionReason::RoleSufficient),
            ),
        )
        .await
        .unwrap_or_else(|_| panic!("user should be created"))
        .value
}

#[tokio::test]
async fn bug_history_replays_every_decision_in_order() {
    let harness = Harness::new().await;
    let reporter = seed_user(&harness.store, "reporter@example.com", Role::Reporter).await;
    let maintainer = seed_user(&harness.store, "maint@example.com", Role::Maintainer).await;
    let product = harness
        .product_with_members(&[(&reporter, None), (&maintainer, None)])
        .await;
    let reporter = harness.actor(&reporter).await;
    let maintainer = harness.actor(&maintainer).await;

    let bug = harness.file_bug(&reporter, product.id).await;
    let moved = harness
        .bugs
        .transition_status(&maintainer, bug.id, BugStatus::InProgress)
        .await;
    assert_eq!(moved.map(|bug| bug.status).ok(), Some(BugStatus::InProgress));
    assert!(harness.bugs.get_bug(&reporter, bug.id).await.is_ok());
    let denied = harness
        .bugs
        .transition_status(&reporter, bug.id, BugStatus::Resolved)
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let history = harness.history(ResourceKind::Bug, bug.id.as_uuid()).await;
    let actions: Vec<&str> = history.iter().map(|entry| entry.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "bug.created",
            "bug.status_changed",
            "bug.read",
            "bug.transition_status"
        ]
    );
    let decisions: Vec<AuditDecision> = history.iter().map(|entry| entry.decision).collect();
    assert_eq!(
        decisions,
        vec![
            AuditDecision::Allow,
            AuditDecision::Allow,
            AuditDecision::Allow,
            AuditDecision::Deny
        ]
    );
    assert!(
        history
            .windows(2)
            .all(|pair| pair[0].sequence < pair[1].sequence)
    );
    assert_eq!(
        history[1].detail,
        Some(serde_json::json!({ "from": "open", "to": "in_progress" }))
    );
    assert_eq!(history[3].reason, "insufficient_role");
}

#[tokio::test]
async fn concurrent_transitions_from_the_same_status_admit_exactly_one() {
    let harness = Harness::new().await;
    let maintainer = seed_user(&harness.store, "maint@example.com", Role::Maintainer).await;
    let product = harness.product_with_members(&[(&maintainer, None)]).await;
    let maintainer = harness.actor(&maintainer).await;
    let bug = harness.file_bug(&maintainer, product.id).await;

    let first_service = harness.bugs.clone();
    let second_service = harness.bugs.clone();
    let first_actor = maintainer.clone();
    let second_actor = maintainer.clone();
    let first = tokio::spawn(async move {
        first_service
            .transition_status(&first_actor, bug.id, BugStatus::InProgress)
            .await
    });
    let second = tokio::spawn(async move {
        second_service
            .transition_status(&second_actor, bug.id, BugStatus::InProgress)
            .await
    });

    let results = [
        first.await.unwrap_or_else(|_| panic!("task panicked")),
        second.await.unwrap_or_else(|_| panic!("task panicked")),
    ];
    let successes = results.iter().filter(|result| result.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|result| matches!(result, Err(AppError::InvalidTransition(_))))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(rejections, 1);

    let changes = harness
        .history(ResourceKind::Bug, bug.id.as_uuid())
        .await
        .into_iter()
        .filter(|entry| entry.action == "bug.status_changed")
        .count();
    assert_eq!(changes, 1);
}

#[tokio::test]
async fn audit_failure_leaves_state_unchanged() {
    let harness = Harness::new().await;
    let reporter = seed_user(&harness.store, "reporter@example.com", Role::Reporter).await;
    let product = harness.product_with_members(&[(&reporter, None)]).await;
    let reporter = harness.actor(&reporter).await;
    let entries_before = harness.store.audit_entries().await.len();

    harness.store.set_audit_offline(true);
    let result = harness
        .bugs
        .create_bug(
            &reporter,
            product.id,
            NewBugParams {
                title: "Lost".to_owned(),
                description: "Never stored".to_owned(),
                priority: None,
                assignee_id: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::AuditWriteFailure(_))));
    harness.store.set_audit_offline(false);

    assert_eq!(harness.store.audit_entries().await.len(), entries_before);
    let bugs = harness
        .bugs
        .list_bugs(
            &reporter,
            product.id,
            BugListQuery {
                status: None,
                limit: 50,
                offset: 0,
            },
        )
        .await
        .unwrap_or_else(|_| panic!("listing should succeed"));
    assert!(bugs.is_empty());
}

#[tokio::test]
async fn private_comments_are_hidden_from_outsiders_and_reporters() {
    let harness = Harness::new().await;
    let reporter = seed_user(&harness.store, "reporter@example.com", Role::Reporter).await;
    let maintainer = seed_user(&harness.store, "maint@example.com", Role::Maintainer).await;
    let outsider = seed_user(&harness.store, "outsider@example.com", Role::Reporter).await;
    let product = harness
        .product_with_members(&[(&reporter, None), (&maintainer, None)])
        .await;
    let reporter = harness.actor(&reporter).await;
    let maintainer = harness.actor(&maintainer).await;
    let outsider = harness.actor(&outsider).await;
    let bug = harness.file_bug(&reporter, product.id).await;

    let public = harness
        .comments
        .create_comment(&reporter, bug.id, "Still broken".to_owned(), CommentVisibility::Public)
        .await
        .unwrap_or_else(|_| panic!("public comment"));
    let private = harness
        .comments
        .create_comment(
            &maintainer,
            bug.id,
            "Root cause is in the cache layer".to_owned(),
            CommentVisibility::Private,
        )
        .await
        .unwrap_or_else(|_| panic!("private comment"));

    let denied = harness.comments.get_comment(&outsider, private.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
    assert!(harness.comments.get_comment(&harness.admin, private.id).await.is_ok());

    let visible: Vec<CommentId> = harness
        .comments
        .list_comments(&reporter, bug.id)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|comment| comment.id)
        .collect();
    assert_eq!(visible, vec![public.id]);

    let history = harness
        .history(ResourceKind::Comment, private.id.as_uuid())
        .await;
    let last = history.last().unwrap_or_else(|| panic!("history expected"));
    assert_eq!(last.decision, AuditDecision::Allow);
    assert_eq!(last.reason, "admin_override");
    assert_eq!(history[history.len() - 2].reason, "not_product_member");
}

#[tokio::test]
async fn product_delete_waits_for_every_bug_to_close() {
    let harness = Harness::new().await;
    let maintainer = seed_user(&harness.store, "maint@example.com", Role::Maintainer).await;
    let product = harness.product_with_members(&[(&maintainer, None)]).await;
    let maintainer = harness.actor(&maintainer).await;
    let bug = harness.file_bug(&maintainer, product.id).await;

    let blocked = harness.products.delete_product(&harness.admin, product.id).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));

    for next in [BugStatus::InProgress, BugStatus::Resolved, BugStatus::Closed] {
        harness
            .bugs
            .transition_status(&maintainer, bug.id, next)
            .await
            .unwrap_or_else(|error| panic!("transition should succeed: {error}"));
    }

    assert!(harness.products.delete_product(&harness.admin, product.id).await.is_ok());
    let gone = harness.products.get_product(&harness.admin, product.id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
    let listed = harness
        .bugs
        .list_bugs(
            &maintainer,
            product.id,
            BugListQuery {
                status: None,
                limit: 50,
                offset: 0,
            },
        )
        .await;
    assert!(matches!(listed, Err(AppError::NotFound(_))));

    let refiled = harness
        .products
        .create_product(
            &harness.admin,
            NewProduct::new("widgets", None).unwrap_or_else(|_| panic!("product")),
        )
        .await;
    assert!(refiled.is_ok());
}

#[tokio::test]
async fn bug_insert_rechecks_the_product_it_files_against() {
    let harness = Harness::new().await;
    let maintainer = seed_user(&harness.store, "maint@example.com", Role::Maintainer).await;
    let product = harness.product_with_members(&[(&maintainer, None)]).await;
    let maintainer = harness.actor(&maintainer).await;
    let filed = harness.file_bug(&maintainer, product.id).await;
    let late_insert = |audit_target: BugId| {
        NewAuditEntry::mutation(
            maintainer.user_id(),
            AuditAction::BugCreated,
            ResourceKind::Bug,
            audit_target.as_uuid(),
            AccessDecision::Allow(DecisionReason::RoleSufficient),
        )
    };

    harness
        .store
        .update_product(
            product.id,
            ProductChanges {
                is_active: Some(false),
                ..ProductChanges::default()
            },
            late_insert(filed.id),
        )
        .await
        .unwrap_or_else(|error| panic!("deactivation should succeed: {error}"));
    let entries_before = harness.store.audit_entries().await.len();

    let inactive = Bug {
        id: BugId::new(),
        ..filed.clone()
    };
    let result = harness
        .store
        .create_bug(inactive.clone(), late_insert(inactive.id))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    for next in [BugStatus::InProgress, BugStatus::Resolved, BugStatus::Closed] {
        harness
            .bugs
            .transition_status(&maintainer, filed.id, next)
            .await
            .unwrap_or_else(|error| panic!("transition should succeed: {error}"));
    }
    harness
        .store
        .soft_delete_product(product.id, late_insert(filed.id))
        .await
        .unwrap_or_else(|error| panic!("closed-out product should delete: {error}"));
    let deleted = Bug {
        id: BugId::new(),
        ..filed
    };
    let result = harness
        .store
        .create_bug(deleted.clone(), late_insert(deleted.id))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    assert_eq!(harness.store.audit_entries().await.len(), entries_before + 4);
    assert!(harness.store.find_bug(inactive.id).await.ok().flatten().is_none());
    assert!(harness.store.find_bug(deleted.id).await.ok().flatten().is_none());
}

#[tokio::test]
async fn catalogue_pages_count_only_readable_products() {
    let harness = Harness::new().await;
    let viewer = seed_user(&harness.store, "viewer@example.com", Role::Viewer).await;
    let member_of = harness.product_with_members(&[(&viewer, None)]).await;
    for name in ["Gadgets", "Gizmos", "Sprockets"] {
        harness
            .products
            .create_product(
                &harness.admin,
                NewProduct::new(name, None).unwrap_or_else(|_| panic!("product")),
            )
            .await
            .unwrap_or_else(|error| panic!("product should be created: {error}"));
    }
    let viewer = harness.actor(&viewer).await;

    let visible = harness
        .products
        .list_products(&viewer, ProductListQuery::default())
        .await
        .unwrap_or_else(|error| panic!("listing should succeed: {error}"));
    assert_eq!(visible.total, 1);
    assert_eq!(visible.items[0].id, member_of.id);

    let searched = harness
        .products
        .list_products(
            &harness.admin,
            ProductListQuery {
                filter: ProductFilter {
                    search: Some(" g ".to_owned()),
                    is_active: Some(true),
                },
                sort_dir: SortDirection::Desc,
                limit: 2,
                offset: 0,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("listing should succeed: {error}"));
    let names: Vec<&str> = searched.items.iter().map(|product| product.name.as_str()).collect();
    assert_eq!(names, vec!["Widgets", "Gizmos"]);
    assert_eq!(searched.total, 3);
}

#[tokio::test]
async fn reuploading_a_file_name_creates_versions() {
    let harness = Harness::new().await;
    let reporter = seed_user(&harness.store, "reporter@example.com", Role::Reporter).await;
    let product = harness.product_with_members(&[(&reporter, None)]).await;
    let reporter = harness.actor(&reporter).await;
    let bug = harness.file_bug(&reporter, product.id).await;

    let upload = |path: &str| {
        AttachmentUpload::new("trace.log", path, Some("text/plain".to_owned()), 512)
            .unwrap_or_else(|_| panic!("upload"))
    };
    let first = harness
        .attachments
        .create_attachment(&reporter, bug.id, upload("blobs/1"))
        .await
        .unwrap_or_else(|_| panic!("first upload"));
    let second = harness
        .attachments
        .create_attachment(&reporter, bug.id, upload("blobs/2"))
        .await
        .unwrap_or_else(|_| panic!("second upload"));
    assert_eq!((first.version, second.version), (1, 2));

    let latest = harness
        .attachments
        .list_attachments(&reporter, bug.id, false)
        .await
        .unwrap_or_default();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, second.id);

    let history = harness
        .attachments
        .list_attachments(&reporter, bug.id, true)
        .await
        .unwrap_or_default();
    assert_eq!(history.len(), 2);

    harness
        .attachments
        .delete_attachment(&reporter, second.id)
        .await
        .unwrap_or_else(|error| panic!("uploader may delete own attachment: {error}"));
    let latest = harness
        .attachments
        .list_attachments(&reporter, bug.id, false)
        .await
        .unwrap_or_default();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, first.id);
    assert!(latest[0].is_latest);
}

#[tokio::test]
async fn deleting_a_bug_removes_its_thread() {
    let harness = Harness::new().await;
    let maintainer = seed_user(&harness.store, "maint@example.com", Role::Maintainer).await;
    let product = harness.product_with_members(&[(&maintainer, None)]).await;
    let maintainer = harness.actor(&maintainer).await;
    let bug = harness.file_bug(&maintainer, product.id).await;
    let comment = harness
        .comments
        .create_comment(&maintainer, bug.id, "Dup of #12".to_owned(), CommentVisibility::Public)
        .await
        .unwrap_or_else(|_| panic!("comment"));

    harness
        .bugs
        .delete_bug(&maintainer, bug.id)
        .await
        .unwrap_or_else(|error| panic!("delete should succeed: {error}"));

    let lookup = harness.comments.get_comment(&maintainer, comment.id).await;
    assert!(matches!(lookup, Err(AppError::NotFound(_))));

    let history = harness.history(ResourceKind::Bug, bug.id.as_uuid()).await;
    assert_eq!(
        history.last().map(|entry| entry.action.as_str()),
        Some("bug.deleted")
    );
}

#[tokio::test]
async fn membership_override_grants_product_scoped_rights() {
    let harness = Harness::new().await;
    let reporter = seed_user(&harness.store, "reporter@example.com", Role::Reporter).await;
    let product = harness
        .product_with_members(&[(&reporter, Some(Role::Maintainer))])
        .await;
    let promoted = harness.actor(&reporter).await;
    let bug = harness.file_bug(&promoted, product.id).await;

    let moved = harness
        .bugs
        .transition_status(&promoted, bug.id, BugStatus::InProgress)
        .await;
    assert!(moved.is_ok());

    harness
        .products
        .remove_member(&harness.admin, product.id, reporter.id)
        .await
        .unwrap_or_else(|_| panic!("member should be removed"));
    let outsider = harness.actor(&reporter).await;
    let denied = harness.bugs.get_bug(&outsider, bug.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
}
