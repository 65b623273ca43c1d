mod cors;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use bugzot_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

const API_PREFIX: &str = "/api/v1";

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/register", post(handlers::auth::register_handler))
        .route("/auth/login", post(handlers::auth::login_handler));

    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout_handler))
        .route("/auth/me", get(handlers::auth::me_handler))
        .route("/users", get(handlers::users::list_users_handler))
        .route(
            "/users/{user_id}",
            get(handlers::users::get_user_handler).put(handlers::users::update_user_handler),
        )
        .route("/roles", get(handlers::users::list_roles_handler))
        .route(
            "/users/{user_id}/role",
            put(handlers::users::update_user_role_handler),
        )
        .route(
            "/users/{user_id}/disable",
            post(handlers::users::disable_user_handler),
        )
        .route(
            "/products",
            get(handlers::products::list_products_handler)
                .post(handlers::products::create_product_handler),
        )
        .route(
            "/products/{product_id}",
            get(handlers::products::get_product_handler)
                .patch(handlers::products::update_product_handler)
                .delete(handlers::products::delete_product_handler),
        )
        .route(
            "/products/{product_id}/members",
            get(handlers::products::list_members_handler),
        )
        .route(
            "/products/{product_id}/members/{user_id}",
            put(handlers::products::set_member_handler)
                .delete(handlers::products::remove_member_handler),
        )
        .route(
            "/products/{product_id}/bugs",
            get(handlers::bugs::list_bugs_handler).post(handlers::bugs::create_bug_handler),
        )
        .route(
            "/bugs/{bug_id}",
            get(handlers::bugs::get_bug_handler)
                .patch(handlers::bugs::update_bug_handler)
                .delete(handlers::bugs::delete_bug_handler),
        )
        .route(
            "/bugs/{bug_id}/status",
            post(handlers::bugs::transition_status_handler),
        )
        .route(
            "/bugs/{bug_id}/comments",
            get(handlers::comments::list_comments_handler)
                .post(handlers::comments::create_comment_handler),
        )
        .route(
            "/comments/{comment_id}",
            get(handlers::comments::get_comment_handler)
                .patch(handlers::comments::update_comment_handler)
                .delete(handlers::comments::delete_comment_handler),
        )
        .route(
            "/bugs/{bug_id}/attachments",
            get(handlers::attachments::list_attachments_handler)
                .post(handlers::attachments::create_attachment_handler),
        )
        .route(
            "/attachments/{attachment_id}",
            get(handlers::attachments::get_attachment_handler)
                .delete(handlers::attachments::delete_attachment_handler),
        )
        .route("/audit", get(handlers::audit::list_audit_handler))
        .route("/audit/export", get(handlers::audit::export_audit_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let api_routes = public_routes.merge(protected_routes);

    Ok(Router::new()
        .nest(API_PREFIX, api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(middleware::request_id))
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
