//! services/api/src/web/otp.rs
//!
//! Relay endpoints for the OTP login: generate sends a code through the auth
//! backend, validate checks it and establishes the portal session.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use billing_portal_core::{
    domain::DASHBOARD_PATH,
    otp::{classify_code, validate_mobile_number, CodeEntry, LoginState},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::web::{
    cookie::session_cookie,
    response::{MessageResponse, RelayError},
    session::SessionView,
    state::AppState,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOtpRequest {
    pub mobile_number: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOtpRequest {
    pub mobile_number: String,
    pub otp: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOtpResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub data: Value,
    /// Seconds before another OTP may be requested.
    pub resend_after: u64,
    pub resends_remaining: u32,
}

#[derive(Serialize, ToSchema)]
pub struct ValidateOtpResponse {
    pub message: String,
    pub data: SessionView,
    /// Where the browser should navigate next.
    pub redirect: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/otp/generate - Send (or resend) an OTP to a mobile number
#[utoipa::path(
    post,
    path = "/api/otp/generate",
    request_body = GenerateOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = GenerateOtpResponse),
        (status = 400, description = "Invalid mobile number", body = MessageResponse),
        (status = 429, description = "Resend cooldown active or resend limit reached", body = MessageResponse)
    )
)]
pub async fn generate_otp_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateOtpRequest>,
) -> Result<impl IntoResponse, RelayError> {
    // 1. Validate before anything touches the network
    let mobile_number = validate_mobile_number(&req.mobile_number)?;

    // 2. Request or resend, depending on where this login cycle is
    let flow = state.login_flows.get_or_create(&mobile_number);
    let mut flow = flow.lock().await;
    let current = flow.state().clone();
    let reply = match current {
        // The resend budget only resets with a finished cycle.
        LoginState::OtpRequested | LoginState::Failed { .. } | LoginState::Validating => {
            flow.resend_otp(state.otp_gateway.as_ref()).await?
        }
        LoginState::EnteringMobileNumber => {
            flow.request_otp(state.otp_gateway.as_ref(), &mobile_number).await?
        }
        LoginState::Authenticated => {
            flow.restart();
            flow.request_otp(state.otp_gateway.as_ref(), &mobile_number).await?
        }
    };

    Ok((
        StatusCode::OK,
        Json(GenerateOtpResponse {
            message: reply.message,
            data: reply.data,
            resend_after: flow.countdown_secs(),
            resends_remaining: flow.resends_remaining(),
        }),
    ))
}

/// POST /api/otp/validate - Validate the OTP and sign in
#[utoipa::path(
    post,
    path = "/api/otp/validate",
    request_body = ValidateOtpRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = ValidateOtpResponse),
        (status = 400, description = "Malformed or incomplete OTP, or no OTP requested", body = MessageResponse),
        (status = 401, description = "OTP rejected by the auth backend", body = MessageResponse),
        (status = 502, description = "Public IP address could not be determined", body = MessageResponse)
    )
)]
pub async fn validate_otp_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ValidateOtpRequest>,
) -> Result<impl IntoResponse, RelayError> {
    // 1. Only a complete code for a number with an open login cycle goes upstream
    let mobile_number = validate_mobile_number(&req.mobile_number)?;
    if classify_code(&req.otp)? == CodeEntry::Incomplete {
        return Err(RelayError::bad_request("OTP must be 6 digits"));
    }
    let flow = state
        .login_flows
        .get(&mobile_number)
        .ok_or_else(|| RelayError::bad_request("Request an OTP first"))?;

    // 2. Resolve the public IP forwarded with the credentials
    let ip_address = resolve_ip(&state, &headers).await?;

    // 3. Validate with the auth backend
    let reply = {
        let mut flow = flow.lock().await;
        flow.enter_code(state.otp_gateway.as_ref(), &req.otp, &ip_address)
            .await?
            .ok_or_else(|| RelayError::bad_request("OTP must be 6 digits"))?
    };
    state.login_flows.remove(&mobile_number);

    // 4. Establish the session and hand back the cookie
    let (session_id, session) = state.sessions.establish(reply.data).await?;
    let cookie = session_cookie(
        &state.signer.sign(&session_id),
        state.config.session_ttl.as_secs(),
    );
    info!(user_id = session.user_id, "User signed in.");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ValidateOtpResponse {
            message: reply.message,
            data: SessionView::from(session.as_ref()),
            redirect: DASHBOARD_PATH.to_string(),
        }),
    ))
}

/// Public IP from the lookup service, else the first `X-Forwarded-For` hop.
async fn resolve_ip(state: &AppState, headers: &HeaderMap) -> Result<String, RelayError> {
    match state.ip_lookup.public_ip().await {
        Ok(ip) => Ok(ip),
        Err(e) => {
            warn!("IP lookup failed, falling back to X-Forwarded-For: {}", e);
            forwarded_for(headers).ok_or_else(|| {
                RelayError::new(StatusCode::BAD_GATEWAY, "Could not determine public IP address")
            })
        }
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn first_forwarded_hop_is_used() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 198.51.100.7, 10.0.0.1"),
        );
        assert_eq!(forwarded_for(&headers).as_deref(), Some("198.51.100.7"));
        assert_eq!(forwarded_for(&HeaderMap::new()), None);
    }
}
