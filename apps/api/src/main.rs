//! BugZot API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use bugzot_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, StorageBackend};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let config = ApiConfig::load()?;
    api_config::init_tracing();

    let pool = match (config.storage_backend, config.database_url.as_deref()) {
        (StorageBackend::Postgres, Some(database_url)) => {
            Some(api_services::connect_and_migrate(database_url).await?)
        }
        (StorageBackend::Memory, Some(database_url)) if config.migrate_only => {
            Some(api_services::connect_and_migrate(database_url).await?)
        }
        _ => None,
    };

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let app_state = api_services::build_app_state(pool, &config)?;

    if let Some(admin) = &config.bootstrap_admin
        && let Some(user) = app_state
            .user_service
            .bootstrap_admin(&admin.email, &admin.password)
            .await?
    {
        info!(user_id = %user.id, "bootstrap administrator created");
    }

    let app = api_router::build_router(app_state, &config.frontend_url)?;
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind API listener: {error}")))?;

    info!(
        %address,
        storage_backend = ?config.storage_backend,
        redis = config.redis_url.is_some(),
        "bugzot api listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("API server failed: {error}")))
}
