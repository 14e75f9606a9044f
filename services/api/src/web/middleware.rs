//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use billing_portal_core::domain::Session;
use std::sync::Arc;
use tracing::debug;

use crate::web::{cookie::read_session_cookie, response::RelayError, state::AppState};

/// The signed-in user, as seen by handlers behind `require_auth`.
#[derive(Clone)]
pub struct AuthenticatedSession {
    pub id: String,
    pub session: Arc<Session>,
}

/// Middleware that validates the signed session cookie and loads the session.
///
/// If valid, inserts an `AuthenticatedSession` into request extensions for
/// handlers to use. If invalid, missing or expired, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, RelayError> {
    // 1. Extract and verify the signed cookie
    let session_id = read_session_cookie(req.headers())
        .and_then(|value| state.signer.verify(value))
        .ok_or_else(|| {
            debug!("Request without a valid session cookie.");
            RelayError::unauthenticated()
        })?;

    // 2. Load the session, dropping it if its token has expired
    let session = state.sessions.current_user(&session_id).await?;

    // 3. Insert the session into request extensions
    req.extensions_mut().insert(AuthenticatedSession {
        id: session_id,
        session,
    });

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
