use std::sync::Arc;

use bugzot_core::AppError;
use bugzot_domain::{AuditDecision, Role, User, UserStatus};

use super::{AuthRateLimits, LoginParams, ProfileUpdateParams, RegisterParams, UserService};
use crate::test_support::{
    FakeActorCache, FakeAuditRepository, FakeRateLimitRepository, FakeRevocationStore,
    FakeTokenCodec, FakeUserRepository, ReversingPasswordHasher,
};
use crate::{
    AuditService, Authenticated, AuthorizationService, IdentityService, PasswordHasher,
    RateLimitRule, RateLimitService, SortDirection, UserListQuery, UserRepository, UserSortField,
};

const PASSWORD: &str = "correct horse battery";

struct Fixture {
    users: Arc<FakeUserRepository>,
    audit: Arc<FakeAuditRepository>,
    revocations: Arc<FakeRevocationStore>,
    identity: IdentityService,
    service: UserService,
}

fn fixture_with_limits(rate_limits: AuthRateLimits) -> Fixture {
    let audit = Arc::new(FakeAuditRepository::default());
    let users = Arc::new(FakeUserRepository {
        audit: audit.clone(),
        ..FakeUserRepository::default()
    });
    let revocations = Arc::new(FakeRevocationStore::default());
    let identity = IdentityService::new(
        users.clone(),
        Arc::new(FakeTokenCodec::default()),
        revocations.clone(),
        Some(Arc::new(FakeActorCache::default())),
    );
    let authorization = AuthorizationService::new(audit.clone());
    let service = UserService::new(
        users.clone(),
        Arc::new(ReversingPasswordHasher),
        identity.clone(),
        authorization.clone(),
        AuditService::new(audit.clone(), authorization),
        RateLimitService::new(Arc::new(FakeRateLimitRepository::default())),
        rate_limits,
    );

    Fixture {
        users,
        audit,
        revocations,
        identity,
        service,
    }
}

fn fixture() -> Fixture {
    fixture_with_limits(AuthRateLimits::default())
}

fn register_params(email: &str) -> RegisterParams {
    RegisterParams {
        email: email.to_owned(),
        password: PASSWORD.to_owned(),
        display_name: "Dana Developer".to_owned(),
        client_ip: Some("10.0.0.1".to_owned()),
    }
}

fn login_params(email: &str, password: &str) -> LoginParams {
    LoginParams {
        email: email.to_owned(),
        password: password.to_owned(),
        client_ip: Some("10.0.0.1".to_owned()),
    }
}

async fn insert_with_password(fixture: &Fixture, email: &str, role: Role) -> User {
    let hash = ReversingPasswordHasher
        .hash_password(PASSWORD)
        .unwrap_or_else(|_| panic!("hash"));
    fixture.users.insert(email, role, &hash).await
}

async fn stored(fixture: &Fixture, user: &User) -> User {
    fixture
        .users
        .find_user(user.id)
        .await
        .unwrap_or_default()
        .unwrap_or_else(|| panic!("user should exist"))
}

#[tokio::test]
async fn registration_creates_reporter_and_audits() {
    let fixture = fixture();

    let user = fixture
        .service
        .register(register_params("Dana@Example.com"))
        .await
        .unwrap_or_else(|error| panic!("registration failed: {error}"));

    assert_eq!(user.role, Role::Reporter);
    assert_eq!(user.email.as_str(), "dana@example.com");
    assert_eq!(user.status, UserStatus::Active);

    let entries = fixture.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "user.registered");
    assert_eq!(entries[0].actor_id, Some(user.id));
}

#[tokio::test]
async fn registration_rejects_disposable_domains() {
    let fixture = fixture();

    let result = fixture
        .service
        .register(register_params("someone@mailinator.com"))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(fixture.audit.entries().await.is_empty());
}

#[tokio::test]
async fn registration_rejects_weak_password() {
    let fixture = fixture();
    let mut params = register_params("dana@example.com");
    params.password = "short".to_owned();

    let result = fixture.service.register(params).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let fixture = fixture();
    insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;

    let result = fixture
        .service
        .register(register_params("DANA@example.com"))
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn login_issues_token_and_resets_failures() {
    let fixture = fixture();
    let user = insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;

    let failed = fixture
        .service
        .login(login_params("dana@example.com", "wrong password!"))
        .await;
    assert!(matches!(failed, Err(AppError::Unauthenticated(_))));
    assert_eq!(stored(&fixture, &user).await.failed_login_count, 1);

    let outcome = fixture
        .service
        .login(login_params("dana@example.com", PASSWORD))
        .await
        .unwrap_or_else(|error| panic!("login failed: {error}"));

    assert_eq!(outcome.user.failed_login_count, 0);
    assert!(outcome.user.last_login_at.is_some());
    assert_eq!(outcome.token.claims.user_id, user.id);

    let actions: Vec<String> = fixture
        .audit
        .entries()
        .await
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(actions, vec!["user.login_failed", "user.login_succeeded"]);
}

#[tokio::test]
async fn login_failures_share_one_generic_error() {
    let fixture = fixture();
    let disabled = insert_with_password(&fixture, "gone@example.com", Role::Reporter).await;
    fixture
        .users
        .users
        .lock()
        .await
        .entry(disabled.id)
        .and_modify(|stored| stored.user.status = UserStatus::Disabled);
    insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;

    let attempts = [
        login_params("nobody@example.com", PASSWORD),
        login_params("gone@example.com", PASSWORD),
        login_params("dana@example.com", "not the password"),
    ];

    for params in attempts {
        match fixture.service.login(params).await {
            Err(AppError::Unauthenticated(message)) => {
                assert_eq!(message, "invalid credentials");
            }
            other => panic!("expected generic failure, got {other:?}"),
        }
    }

    let entries = fixture.audit.entries().await;
    assert_eq!(entries.len(), 3);
    assert!(
        entries
            .iter()
            .all(|entry| entry.decision == AuditDecision::Deny)
    );
    assert_eq!(entries[0].reason, "unknown_account");
    assert_eq!(entries[1].reason, "account_disabled");
    assert_eq!(entries[2].reason, "invalid_credentials");
}

#[tokio::test]
async fn login_is_rate_limited_per_client() {
    let fixture = fixture_with_limits(AuthRateLimits {
        login: RateLimitRule::new("login", 2, 60),
        register: RateLimitRule::register_default(),
    });
    insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;

    for _ in 0..2 {
        let result = fixture
            .service
            .login(login_params("dana@example.com", "nope nope nope"))
            .await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    let blocked = fixture
        .service
        .login(login_params("dana@example.com", PASSWORD))
        .await;
    assert!(matches!(blocked, Err(AppError::RateLimited(_))));
}

#[tokio::test]
async fn logout_revokes_token() {
    let fixture = fixture();
    let user = insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;
    let outcome = fixture
        .service
        .login(login_params("dana@example.com", PASSWORD))
        .await
        .unwrap_or_else(|error| panic!("login failed: {error}"));

    let authenticated = Authenticated {
        actor: user.to_actor(),
        claims: outcome.token.claims.clone(),
    };
    assert!(fixture.service.logout(&authenticated).await.is_ok());

    assert!(
        fixture
            .revocations
            .revoked
            .lock()
            .await
            .contains_key(&outcome.token.claims.token_id)
    );
    let credential = bugzot_core::BearerCredential::new(&outcome.token.token)
        .unwrap_or_else(|_| panic!("credential"));
    let validated = fixture.identity.validate(&credential).await;
    assert!(matches!(validated, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn me_returns_own_profile() {
    let fixture = fixture();
    let user = insert_with_password(&fixture, "dana@example.com", Role::Viewer).await;

    let me = fixture.service.me(&user.to_actor()).await;
    assert_eq!(me.map(|profile| profile.id).ok(), Some(user.id));
}

#[tokio::test]
async fn non_admin_cannot_read_other_accounts() {
    let fixture = fixture();
    let dana = insert_with_password(&fixture, "dana@example.com", Role::Maintainer).await;
    let other = insert_with_password(&fixture, "other@example.com", Role::Reporter).await;

    let result = fixture.service.get_user(&dana.to_actor(), other.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let listed = fixture
        .service
        .list_users(
            &dana.to_actor(),
            UserListQuery::first_page(10),
        )
        .await;
    assert!(matches!(listed, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn admin_filters_sorts_and_pages_the_directory() {
    let fixture = fixture();
    let admin = insert_with_password(&fixture, "admin@example.com", Role::Admin).await;
    insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;
    insert_with_password(&fixture, "erin@example.com", Role::Maintainer).await;
    let frank = insert_with_password(&fixture, "frank@example.com", Role::Viewer).await;
    fixture
        .service
        .disable_user(&admin.to_actor(), frank.id)
        .await
        .unwrap_or_else(|error| panic!("disable should succeed: {error}"));

    let active = fixture
        .service
        .list_users(
            &admin.to_actor(),
            UserListQuery {
                limit: 2,
                offset: 0,
                search: None,
                status: Some(UserStatus::Active),
                sort_by: UserSortField::Email,
                sort_dir: SortDirection::Asc,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("listing should succeed: {error}"));
    let emails: Vec<&str> = active.items.iter().map(|user| user.email.as_str()).collect();
    assert_eq!(emails, vec!["admin@example.com", "dana@example.com"]);
    assert_eq!(active.total, 3);

    let searched = fixture
        .service
        .list_users(
            &admin.to_actor(),
            UserListQuery {
                search: Some("  ERIN ".to_owned()),
                ..UserListQuery::first_page(10)
            },
        )
        .await
        .unwrap_or_else(|error| panic!("listing should succeed: {error}"));
    assert_eq!(searched.total, 1);
    assert_eq!(searched.items[0].email.as_str(), "erin@example.com");

    let reversed = fixture
        .service
        .list_users(
            &admin.to_actor(),
            UserListQuery {
                sort_by: UserSortField::Email,
                sort_dir: SortDirection::Desc,
                offset: 3,
                ..UserListQuery::first_page(10)
            },
        )
        .await
        .unwrap_or_else(|error| panic!("listing should succeed: {error}"));
    assert_eq!(reversed.total, 4);
    assert_eq!(reversed.items.len(), 1);
    assert_eq!(reversed.items[0].email.as_str(), "admin@example.com");
}

#[tokio::test]
async fn admin_edits_profile_and_audits_the_change() {
    let fixture = fixture();
    let admin = insert_with_password(&fixture, "admin@example.com", Role::Admin).await;
    let dana = insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;

    let updated = fixture
        .service
        .update_profile(
            &admin.to_actor(),
            dana.id,
            ProfileUpdateParams {
                email: Some("Dana.Ops@Example.com".to_owned()),
                display_name: Some("  Dana   Ops ".to_owned()),
            },
        )
        .await
        .unwrap_or_else(|error| panic!("profile update should succeed: {error}"));
    assert_eq!(updated.email.as_str(), "dana.ops@example.com");
    assert_eq!(stored(&fixture, &dana).await.email, updated.email);

    let entries = fixture.audit.entries().await;
    let last = entries.last().unwrap_or_else(|| panic!("audit entry"));
    assert_eq!(last.action, "user.profile_updated");
    assert_eq!(last.target_id, Some(dana.id.as_uuid()));
    let detail = last.detail.clone().unwrap_or_default();
    assert_eq!(detail["email"]["from"], "dana@example.com");
    assert_eq!(detail["email"]["to"], "dana.ops@example.com");
    assert_eq!(detail["display_name"]["to"], updated.display_name.as_str());

    let unchanged = fixture
        .service
        .update_profile(
            &admin.to_actor(),
            dana.id,
            ProfileUpdateParams {
                display_name: Some(updated.display_name.clone()),
                ..ProfileUpdateParams::default()
            },
        )
        .await;
    assert!(unchanged.is_ok());
    assert_eq!(fixture.audit.entries().await.len(), entries.len());
}

#[tokio::test]
async fn profile_edits_keep_emails_unique_and_need_admin() {
    let fixture = fixture();
    let admin = insert_with_password(&fixture, "admin@example.com", Role::Admin).await;
    let dana = insert_with_password(&fixture, "dana@example.com", Role::Maintainer).await;
    let erin = insert_with_password(&fixture, "erin@example.com", Role::Reporter).await;

    let taken = fixture
        .service
        .update_profile(
            &admin.to_actor(),
            erin.id,
            ProfileUpdateParams {
                email: Some("DANA@example.com".to_owned()),
                ..ProfileUpdateParams::default()
            },
        )
        .await;
    assert!(matches!(taken, Err(AppError::Conflict(_))));

    let invalid = fixture
        .service
        .update_profile(
            &admin.to_actor(),
            erin.id,
            ProfileUpdateParams {
                email: Some("not-an-email".to_owned()),
                ..ProfileUpdateParams::default()
            },
        )
        .await;
    assert!(matches!(invalid, Err(AppError::Validation(_))));

    let denied = fixture
        .service
        .update_profile(
            &dana.to_actor(),
            erin.id,
            ProfileUpdateParams {
                display_name: Some("Erin".to_owned()),
                ..ProfileUpdateParams::default()
            },
        )
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
    assert_eq!(stored(&fixture, &erin).await.email.as_str(), "erin@example.com");
}

#[tokio::test]
async fn admin_changes_role_of_other_user() {
    let fixture = fixture();
    let admin = insert_with_password(&fixture, "admin@example.com", Role::Admin).await;
    let dana = insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;

    let updated = fixture
        .service
        .set_role(&admin.to_actor(), dana.id, Role::Maintainer)
        .await;

    assert_eq!(updated.map(|user| user.role).ok(), Some(Role::Maintainer));
    let entries = fixture.audit.entries().await;
    let last = entries.last().unwrap_or_else(|| panic!("audit entry"));
    assert_eq!(last.action, "user.role_changed");
    assert_eq!(
        last.detail,
        Some(serde_json::json!({ "from": "reporter", "to": "maintainer" }))
    );
}

#[tokio::test]
async fn admin_cannot_demote_or_disable_self() {
    let fixture = fixture();
    let admin = insert_with_password(&fixture, "admin@example.com", Role::Admin).await;

    let demoted = fixture
        .service
        .set_role(&admin.to_actor(), admin.id, Role::Viewer)
        .await;
    assert!(matches!(demoted, Err(AppError::Conflict(_))));

    let disabled = fixture
        .service
        .disable_user(&admin.to_actor(), admin.id)
        .await;
    assert!(matches!(disabled, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn reporter_cannot_change_roles() {
    let fixture = fixture();
    let dana = insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;
    let other = insert_with_password(&fixture, "other@example.com", Role::Reporter).await;

    let result = fixture
        .service
        .set_role(&dana.to_actor(), other.id, Role::Admin)
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(stored(&fixture, &other).await.role, Role::Reporter);
    let entries = fixture.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].decision, AuditDecision::Deny);
}

#[tokio::test]
async fn disabled_user_cannot_log_in() {
    let fixture = fixture();
    let admin = insert_with_password(&fixture, "admin@example.com", Role::Admin).await;
    let dana = insert_with_password(&fixture, "dana@example.com", Role::Reporter).await;

    let disabled = fixture
        .service
        .disable_user(&admin.to_actor(), dana.id)
        .await;
    assert_eq!(
        disabled.map(|user| user.status).ok(),
        Some(UserStatus::Disabled)
    );

    let result = fixture
        .service
        .login(login_params("dana@example.com", PASSWORD))
        .await;
    assert!(matches!(result, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn bootstrap_admin_is_idempotent() {
    let fixture = fixture();

    let first = fixture
        .service
        .bootstrap_admin("root@example.com", PASSWORD)
        .await;
    let created = first
        .unwrap_or_else(|error| panic!("bootstrap failed: {error}"))
        .unwrap_or_else(|| panic!("admin should be created"));
    assert_eq!(created.role, Role::Admin);

    let second = fixture
        .service
        .bootstrap_admin("root@example.com", PASSWORD)
        .await;
    assert!(matches!(second, Ok(None)));
}

#[tokio::test]
async fn audit_failure_aborts_registration() {
    let fixture = fixture();
    fixture.audit.set_failing(true);

    let result = fixture
        .service
        .register(register_params("dana@example.com"))
        .await;

    assert!(matches!(result, Err(AppError::AuditWriteFailure(_))));
    assert!(fixture.users.users.lock().await.is_empty());
}
