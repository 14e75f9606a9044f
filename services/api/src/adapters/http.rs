//! services/api/src/adapters/http.rs
//!
//! Shared plumbing for the reqwest-based adapters: client construction and
//! the mapping of transport failures and upstream statuses onto `PortError`.

use std::time::Duration;

use billing_portal_core::ports::{PortError, PortResult, RelayReply};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Builds a client whose every request is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Maps a transport-level failure (no usable HTTP response).
pub fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Upstream {
            status: StatusCode::GATEWAY_TIMEOUT.as_u16(),
            message: "Upstream service timed out".to_string(),
        }
    } else {
        PortError::Upstream {
            status: StatusCode::BAD_GATEWAY.as_u16(),
            message: format!("Upstream service unreachable: {}", e),
        }
    }
}

/// Reads a response body as JSON. An empty body becomes `Null`; a non-JSON
/// body is kept as a JSON string of its text.
pub async fn json_body(response: Response) -> PortResult<Value> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(transport_error)?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        warn!(status = status.as_u16(), "Upstream answered with a non-JSON body: {}", e);
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    }))
}

/// The `message` field of an upstream body, falling back to the status reason.
pub fn message_of(body: &Value, status: StatusCode) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Upstream request failed")
                .to_string()
        })
}

/// Decodes a `{ message, data }` envelope, passing failure statuses through.
pub async fn read_relay<T: DeserializeOwned>(response: Response) -> PortResult<RelayReply<T>> {
    let status = response.status();
    let body = json_body(response).await?;

    if !status.is_success() {
        return Err(PortError::Upstream {
            status: status.as_u16(),
            message: message_of(&body, status),
        });
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let data = body.get("data").cloned().unwrap_or(Value::Null);
    let data = serde_json::from_value(data).map_err(|e| {
        PortError::Unexpected(format!("Malformed upstream payload: {}", e))
    })?;

    Ok(RelayReply { message, data })
}
