//! crates/billing_portal_core/src/ports.rs
//!
//! Defines the service contracts (traits) the portal core depends on.
//! These traits form the boundary of the hexagonal architecture: the OTP relay,
//! the IP lookup, the map-token provider, the backend REST API and session
//! persistence are all reached through them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{PersistedSession, Session};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid input: {0}")]
    Validation(String),
    /// The upstream service answered with a failure status, or could not be reached.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Access token expired")]
    TokenExpired,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Relay Payloads
//=========================================================================================

/// The `{ message, data }` envelope used by the auth backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayReply<T> {
    pub message: String,
    pub data: T,
}

/// Everything `/auth/authenticate` needs to validate an OTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpCredentials {
    pub mobile_number: String,
    pub otp: String,
    pub ip_address: String,
    pub source_type: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// A call to the backend REST API made on behalf of a signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: BackendMethod,
    /// Path relative to the backend base URL, without a leading `/`.
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Value,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Asks the auth backend to send an OTP to the given mobile number.
    async fn send_otp(&self, mobile_number: &str) -> PortResult<RelayReply<Value>>;

    /// Validates an OTP and returns the authenticated user.
    async fn authenticate(&self, credentials: &OtpCredentials) -> PortResult<RelayReply<Session>>;
}

#[async_trait]
pub trait IpLookupService: Send + Sync {
    async fn public_ip(&self) -> PortResult<String>;
}

#[async_trait]
pub trait MapTokenService: Send + Sync {
    /// Exchanges the configured service credentials for a map-provider token.
    /// The provider's payload is returned untouched.
    async fn fetch_token(&self) -> PortResult<Value>;
}

#[async_trait]
pub trait BackendService: Send + Sync {
    async fn forward(&self, request: BackendRequest) -> PortResult<BackendResponse>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Inserts or replaces the session stored under `session.session_id`.
    async fn save(&self, session: &PersistedSession) -> PortResult<()>;

    async fn load(&self, session_id: &str) -> PortResult<Option<PersistedSession>>;

    async fn delete(&self, session_id: &str) -> PortResult<()>;

    /// Removes every session whose lifetime ended before `now`, returning how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<u64>;
}
