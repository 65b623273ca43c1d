use std::sync::Arc;

use bugzot_application::{
    AttachmentService, AuditService, AuthorizationService, BugService, CommentService,
    IdentityService, ProductService, RateLimitService, UserService,
};
use bugzot_core::AppError;
use bugzot_infrastructure::{Argon2PasswordHasher, JwtTokenCodec};
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::state::AppState;

mod caches;
mod repositories;

/// Wires every service over PostgreSQL when a pool is given, otherwise over
/// a fresh in-memory store.
pub fn build_app_state(pool: Option<PgPool>, config: &ApiConfig) -> Result<AppState, AppError> {
    let redis_client = config
        .redis_url
        .as_deref()
        .map(|redis_url| {
            redis::Client::open(redis_url)
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))
        })
        .transpose()?;

    let repositories = match &pool {
        Some(pool) => repositories::build_postgres_repository_set(pool),
        None => repositories::build_memory_repository_set(),
    };

    let authorization_service = AuthorizationService::new(repositories.audit_repository.clone());
    let audit_service = AuditService::new(
        repositories.audit_repository.clone(),
        authorization_service.clone(),
    );

    let identity_service = IdentityService::new(
        repositories.user_repository.clone(),
        Arc::new(JwtTokenCodec::new(&config.jwt_secret, config.jwt_ttl_minutes)?),
        caches::build_revocation_store(redis_client.clone()),
        caches::build_actor_cache(config, redis_client.clone()),
    );

    let rate_limit_service = RateLimitService::new(caches::build_rate_limit_repository(
        pool.as_ref(),
        redis_client.clone(),
    ));

    let user_service = UserService::new(
        repositories.user_repository.clone(),
        Arc::new(Argon2PasswordHasher::new()),
        identity_service.clone(),
        authorization_service.clone(),
        audit_service.clone(),
        rate_limit_service,
        config.rate_limits.clone(),
    );

    Ok(AppState {
        product_service: ProductService::new(
            repositories.product_repository.clone(),
            repositories.user_repository.clone(),
            authorization_service.clone(),
            identity_service.clone(),
        ),
        bug_service: BugService::new(
            repositories.bug_repository.clone(),
            repositories.product_repository,
            repositories.user_repository,
            authorization_service.clone(),
        ),
        comment_service: CommentService::new(
            repositories.comment_repository,
            repositories.bug_repository.clone(),
            authorization_service.clone(),
        ),
        attachment_service: AttachmentService::new(
            repositories.attachment_repository,
            repositories.bug_repository,
            authorization_service,
        ),
        identity_service,
        user_service,
        audit_service,
        postgres_pool: pool,
        redis_client,
    })
}
