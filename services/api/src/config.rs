//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Service credentials for the map-provider password grant.
#[derive(Clone, Debug)]
pub struct MapTokenConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Sessions are kept in memory when unset.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub auth_base_url: String,
    pub backend_base_url: String,
    pub ip_lookup_url: String,
    pub map_token: Option<MapTokenConfig>,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub request_timeout: Duration,
    pub otp_resend_cooldown: Duration,
    pub otp_max_resends: u32,
    pub cors_origin: String,
}

const MIN_SECRET_LEN: usize = 32;

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Server Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Upstream Services ---
        let auth_base_url = trim_base(required("AUTH_BASE_URL")?);
        let backend_base_url = trim_base(required("BACKEND_BASE_URL")?);
        let ip_lookup_url = lookup("IP_LOOKUP_URL")
            .unwrap_or_else(|| "https://api.ipify.org?format=json".to_string());

        let map_token = match (
            lookup("MMI_TOKEN_URL"),
            lookup("MMI_CLIENT_ID"),
            lookup("MMI_CLIENT_SECRET"),
            lookup("MMI_USERNAME"),
            lookup("MMI_PASSWORD"),
        ) {
            (Some(token_url), Some(client_id), Some(client_secret), Some(username), Some(password)) => {
                Some(MapTokenConfig {
                    token_url,
                    client_id,
                    client_secret,
                    username,
                    password,
                })
            }
            _ => None,
        };

        // --- Session and Login Settings ---
        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "SESSION_SECRET".to_string(),
                format!("must be at least {} bytes", MIN_SECRET_LEN),
            ));
        }

        let session_ttl = Duration::from_secs(parse_u64(&lookup, "SESSION_TTL_HOURS", 12)? * 3600);
        let request_timeout = Duration::from_secs(parse_u64(&lookup, "REQUEST_TIMEOUT_SECS", 15)?);
        let otp_resend_cooldown =
            Duration::from_secs(parse_u64(&lookup, "OTP_RESEND_COOLDOWN_SECS", 120)?);
        let otp_max_resends = parse_u64(&lookup, "OTP_MAX_RESENDS", 3)?;
        let otp_max_resends = u32::try_from(otp_max_resends).map_err(|e| {
            ConfigError::InvalidValue("OTP_MAX_RESENDS".to_string(), e.to_string())
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            auth_base_url,
            backend_base_url,
            ip_lookup_url,
            map_token,
            session_secret,
            session_ttl,
            request_timeout,
            otp_resend_cooldown,
            otp_max_resends,
            cors_origin,
        })
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
