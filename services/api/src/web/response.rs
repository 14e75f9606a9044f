//! services/api/src/web/response.rs
//!
//! Request-level error type. Every failure leaves the service as
//! `{ "message": ... }` with a status that says what went wrong.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use billing_portal_core::{otp::FlowError, ports::PortError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// The `{ message }` body returned on failure.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug)]
pub struct RelayError {
    pub status: StatusCode,
    pub message: String,
}

impl RelayError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Not signed in")
    }
}

impl From<PortError> for RelayError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            PortError::Unauthorized => Self::unauthenticated(),
            PortError::TokenExpired => {
                Self::new(StatusCode::UNAUTHORIZED, "Session expired, please sign in again")
            }
            PortError::Validation(message) => Self::bad_request(message),
            PortError::Upstream { status, message } => Self::new(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ),
            PortError::Unexpected(message) => {
                error!("Unexpected port failure: {}", message);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        }
    }
}

impl From<FlowError> for RelayError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::InvalidMobileNumber | FlowError::InvalidCode => Self::bad_request(e.to_string()),
            FlowError::ResendCooldown { .. } | FlowError::ResendLimitReached => {
                Self::new(StatusCode::TOO_MANY_REQUESTS, e.to_string())
            }
            FlowError::WrongState { .. } => Self::new(StatusCode::CONFLICT, e.to_string()),
            FlowError::Upstream(port) => port.into(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageResponse { message: self.message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_passes_through() {
        let e: RelayError = PortError::Upstream {
            status: 422,
            message: "Invalid OTP".to_string(),
        }
        .into();
        assert_eq!(e.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(e.message, "Invalid OTP");
    }

    #[test]
    fn flow_limits_map_to_too_many_requests() {
        let e: RelayError = FlowError::ResendLimitReached.into();
        assert_eq!(e.status, StatusCode::TOO_MANY_REQUESTS);
        let e: RelayError = FlowError::InvalidCode.into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let e: RelayError = PortError::Unexpected("password authentication failed".to_string()).into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!e.message.contains("password"));
    }
}
