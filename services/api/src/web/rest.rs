//! services/api/src/web/rest.rs
//!
//! Contains the master definition for the OpenAPI specification and the
//! liveness endpoint.

use axum::Json;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{
    access::{self, AccessResponse},
    map_token::{self, MapTokenError},
    otp::{self, GenerateOtpRequest, GenerateOtpResponse, ValidateOtpRequest, ValidateOtpResponse},
    response::MessageResponse,
    session::{self, SessionView},
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        otp::generate_otp_handler,
        otp::validate_otp_handler,
        map_token::mmi_token_handler,
        session::current_session_handler,
        session::logout_handler,
        access::page_access_handler,
        access::action_access_handler,
        access::menu_handler,
    ),
    components(
        schemas(
            HealthResponse,
            MessageResponse,
            GenerateOtpRequest,
            GenerateOtpResponse,
            ValidateOtpRequest,
            ValidateOtpResponse,
            SessionView,
            AccessResponse,
            MapTokenError,
        )
    ),
    tags(
        (name = "Billing Portal API", description = "Sign-in, session and access control for the billing back-office portal.")
    )
)]
pub struct ApiDoc;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
