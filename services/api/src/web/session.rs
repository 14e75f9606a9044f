//! services/api/src/web/session.rs
//!
//! Endpoints exposing the signed-in user and ending the session.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use billing_portal_core::domain::Session;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::web::{
    cookie::{cleared_session_cookie, read_session_cookie},
    middleware::AuthenticatedSession,
    response::{MessageResponse, RelayError},
    state::AppState,
};

/// The session fields every authenticated page reads.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub user_name: String,
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub discom_id: i64,
    pub role_id: i64,
    pub last_login_at: Option<String>,
    pub user_scopes: Vec<String>,
    /// Unix timestamp in milliseconds.
    pub token_expiry: Option<i64>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            user_name: session.user_name.clone(),
            user_id: session.user_id,
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            discom_id: session.discom_id,
            role_id: session.role_id,
            last_login_at: session.last_login_at.clone(),
            user_scopes: session.scopes.clone(),
            token_expiry: session.token_expiry,
        }
    }
}

/// GET /api/session - The signed-in user
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current session", body = SessionView),
        (status = 401, description = "Not signed in or session expired", body = MessageResponse)
    )
)]
pub async fn current_session_handler(
    Extension(auth): Extension<AuthenticatedSession>,
) -> Json<SessionView> {
    Json(SessionView::from(auth.session.as_ref()))
}

/// POST /api/logout - End the session
///
/// Always clears the cookie, even when the session was already gone.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 500, description = "Session could not be removed", body = MessageResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, RelayError> {
    match read_session_cookie(&headers).and_then(|value| state.signer.verify(value)) {
        Some(session_id) => {
            state.sessions.logout(&session_id).await.map_err(|e| {
                error!("Failed to delete session: {:?}", e);
                RelayError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout")
            })?;
        }
        None => warn!("Logout without a valid session cookie."),
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cleared_session_cookie())],
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}
