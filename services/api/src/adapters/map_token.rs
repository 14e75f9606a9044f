//! services/api/src/adapters/map_token.rs
//!
//! Fetches a map-provider access token with the OAuth password grant, using
//! fixed service credentials from the configuration.

use async_trait::async_trait;
use billing_portal_core::ports::{MapTokenService, PortError, PortResult};
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::adapters::http::{json_body, transport_error};
use crate::config::MapTokenConfig;

#[derive(Clone)]
pub struct HttpMapToken {
    client: Client,
    config: MapTokenConfig,
}

impl HttpMapToken {
    pub fn new(client: Client, config: MapTokenConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl MapTokenService for HttpMapToken {
    async fn fetch_token(&self) -> PortResult<Value> {
        let form = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = json_body(response).await?;
        if !status.is_success() {
            let message = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("Map token request was rejected")
                .to_string();
            warn!(status = status.as_u16(), "Map token request rejected.");
            return Err(PortError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}
