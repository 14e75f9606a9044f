//! services/api/src/adapters/ip_lookup.rs
//!
//! Resolves the public IP address through a third-party lookup service that
//! answers `{ "ip": "..." }`.

use async_trait::async_trait;
use billing_portal_core::ports::{IpLookupService, PortError, PortResult};
use reqwest::Client;
use serde::Deserialize;

use crate::adapters::http::transport_error;

#[derive(Clone)]
pub struct HttpIpLookup {
    client: Client,
    url: String,
}

impl HttpIpLookup {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Deserialize)]
struct IpResponse {
    ip: String,
}

#[async_trait]
impl IpLookupService for HttpIpLookup {
    async fn public_ip(&self) -> PortResult<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Upstream {
                status: status.as_u16(),
                message: "IP lookup failed".to_string(),
            });
        }

        let body: IpResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed IP lookup payload: {}", e)))?;
        Ok(body.ip)
    }
}
