//! services/api/src/adapters/auth_gateway.rs
//!
//! This module contains the adapter for the external auth backend. It implements
//! the `OtpGateway` port by calling `/auth/send-otp` and `/auth/authenticate`.

use async_trait::async_trait;
use billing_portal_core::domain::{Session, SOURCE_TYPE};
use billing_portal_core::ports::{OtpCredentials, OtpGateway, PortResult, RelayReply};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::adapters::http::{read_relay, transport_error};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct HttpOtpGateway {
    client: Client,
    base_url: String,
}

impl HttpOtpGateway {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOtpBody<'a> {
    mobile_number: &'a str,
    source_type: &'static str,
}

//=========================================================================================
// `OtpGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl OtpGateway for HttpOtpGateway {
    async fn send_otp(&self, mobile_number: &str) -> PortResult<RelayReply<Value>> {
        debug!("Relaying OTP send request.");
        let response = self
            .client
            .post(format!("{}/auth/send-otp", self.base_url))
            .json(&SendOtpBody {
                mobile_number,
                source_type: SOURCE_TYPE,
            })
            .send()
            .await
            .map_err(transport_error)?;
        read_relay(response).await
    }

    async fn authenticate(&self, credentials: &OtpCredentials) -> PortResult<RelayReply<Session>> {
        debug!("Relaying OTP validation request.");
        let response = self
            .client
            .post(format!("{}/auth/authenticate", self.base_url))
            .json(credentials)
            .send()
            .await
            .map_err(transport_error)?;
        read_relay(response).await
    }
}
