//! services/api/src/web/router.rs
//!
//! Assembles the public and protected routes around the shared state.

use axum::{
    middleware as axum_middleware,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;

use crate::web::{
    access::{action_access_handler, menu_handler, page_access_handler},
    backend::backend_proxy_handler,
    map_token::mmi_token_handler,
    middleware::require_auth,
    otp::{generate_otp_handler, validate_otp_handler},
    rest::health_handler,
    session::{current_session_handler, logout_handler},
    state::AppState,
};

pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/otp/generate", post(generate_otp_handler))
        .route("/api/otp/validate", post(validate_otp_handler))
        .route("/api/mmi-token", post(mmi_token_handler))
        .route("/api/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/session", get(current_session_handler))
        .route("/api/access/page", get(page_access_handler))
        .route("/api/access/action/{action}", get(action_access_handler))
        .route("/api/menu", get(menu_handler))
        .route("/api/backend/{*path}", any(backend_proxy_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
