//! services/api/src/web/backend.rs
//!
//! Forwards page data calls to the backend REST API with the signed-in
//! user's access token.

use axum::{
    extract::{Path, RawQuery, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use billing_portal_core::ports::{BackendMethod, BackendRequest};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::web::{middleware::AuthenticatedSession, response::RelayError, state::AppState};

fn backend_method(method: &Method) -> Option<BackendMethod> {
    match *method {
        Method::GET => Some(BackendMethod::Get),
        Method::POST => Some(BackendMethod::Post),
        Method::PUT => Some(BackendMethod::Put),
        Method::DELETE => Some(BackendMethod::Delete),
        _ => None,
    }
}

/// Dot segments would let a decoded path climb out of the backend base URL.
fn is_contained(path: &str) -> bool {
    !path
        .split(['/', '\\'])
        .any(|segment| segment == ".." || segment == ".")
}

/// ANY /api/backend/{*path} - Thin REST wrapper over the backend API
pub async fn backend_proxy_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedSession>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<impl IntoResponse, RelayError> {
    let method = backend_method(&method)
        .ok_or_else(|| RelayError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"))?;
    if !is_contained(&path) {
        return Err(RelayError::bad_request("Invalid backend path"));
    }
    let body = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice::<Value>(&body)
                .map_err(|e| RelayError::bad_request(format!("Body is not valid JSON: {}", e)))?,
        )
    };

    let access_token = state.sessions.tokens().get_access_token(&auth.id).await?;
    debug!(path = %path, "Forwarding backend call.");
    let response = state
        .backend
        .forward(BackendRequest {
            method,
            path,
            query,
            body,
            access_token,
        })
        .await?;

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(response.body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_segments_are_rejected() {
        assert!(is_contained("agency/list"));
        assert!(is_contained("reports/v1.2/summary"));
        assert!(!is_contained("agency/../../admin"));
        assert!(!is_contained("../secrets"));
        assert!(!is_contained("agency/./list"));
        assert!(!is_contained("agency\\..\\admin"));
    }
}
