//! services/api/src/error.rs
//!
//! Errors that stop the portal service from starting or serving. Request-level
//! failures are `web::response::RelayError` instead.

use crate::config::ConfigError;
use billing_portal_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A session-store or upstream failure surfaced during startup.
    #[error("Port error: {0}")]
    Port(#[from] PortError),

    /// Connecting to the session database failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The shared upstream client could not be built (TLS backend, timeout).
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Binding the listener or serving connections failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value that parsed but cannot be used at startup.
    #[error("Startup error: {0}")]
    Internal(String),
}
