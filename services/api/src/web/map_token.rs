//! services/api/src/web/map_token.rs
//!
//! Relay for the map-provider token. Success returns the provider payload
//! verbatim; failure returns `{ error }`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use billing_portal_core::ports::PortError;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct MapTokenError {
    pub error: String,
}

fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(MapTokenError { error: error.into() })).into_response()
}

/// POST /api/mmi-token - Exchange the service credentials for a map token
#[utoipa::path(
    post,
    path = "/api/mmi-token",
    responses(
        (status = 200, description = "Provider token payload"),
        (status = 400, description = "Provider rejected the credentials", body = MapTokenError),
        (status = 500, description = "Not configured or provider unreachable", body = MapTokenError)
    )
)]
pub async fn mmi_token_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(service) = state.map_token.as_ref() else {
        return failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Map token credentials are not configured",
        );
    };

    match service.fetch_token().await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(PortError::Upstream { status, message }) if (400..500).contains(&status) => {
            failure(StatusCode::BAD_REQUEST, message)
        }
        Err(e) => {
            error!("Map token request failed: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch map token")
        }
    }
}
