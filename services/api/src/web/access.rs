//! services/api/src/web/access.rs
//!
//! Access checks and the navigation menu for the signed-in user.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use billing_portal_core::{
    access::{has_action_access, has_page_access},
    menu::{build_menu, RenderedMenuItem},
    session::session_scopes,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::web::{middleware::AuthenticatedSession, state::AppState};

#[derive(Deserialize, IntoParams)]
pub struct RouteQuery {
    /// Route being checked or rendered; `/` when omitted.
    pub path: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AccessResponse {
    pub allowed: bool,
}

/// GET /api/access/page - May the user open a page?
#[utoipa::path(
    get,
    path = "/api/access/page",
    params(RouteQuery),
    responses(
        (status = 200, description = "Access decision", body = AccessResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn page_access_handler(
    Extension(auth): Extension<AuthenticatedSession>,
    Query(query): Query<RouteQuery>,
) -> Json<AccessResponse> {
    let path = query.path.unwrap_or_else(|| "/".to_string());
    let scopes = session_scopes(&auth.session);
    let allowed = has_page_access(Some(&scopes), &path);
    if !allowed {
        debug!(user_id = auth.session.user_id, path = %path, "Page access denied.");
    }
    Json(AccessResponse { allowed })
}

/// GET /api/access/action/{action} - May the user perform an action?
#[utoipa::path(
    get,
    path = "/api/access/action/{action}",
    params(("action" = String, Path, description = "Action scope, e.g. dashboardBillUploadHistory")),
    responses(
        (status = 200, description = "Access decision", body = AccessResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn action_access_handler(
    Extension(auth): Extension<AuthenticatedSession>,
    Path(action): Path<String>,
) -> Json<AccessResponse> {
    let scopes = session_scopes(&auth.session);
    Json(AccessResponse {
        allowed: has_action_access(Some(&scopes), &action),
    })
}

/// GET /api/menu - Navigation entries the user may see, with the active route marked
#[utoipa::path(
    get,
    path = "/api/menu",
    params(RouteQuery),
    responses(
        (status = 200, description = "Rendered navigation tree"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn menu_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedSession>,
    Query(query): Query<RouteQuery>,
) -> Json<Vec<RenderedMenuItem>> {
    let path = query.path.unwrap_or_else(|| "/".to_string());
    let scopes = session_scopes(&auth.session);
    Json(build_menu(&state.menu, Some(&scopes), &path))
}
