//! services/api/src/bin/openapi.rs
//!
//! Writes the portal API's OpenAPI document. Usage: `openapi [OUTPUT]`,
//! defaulting to `openapi.json`.

use portal_api::web::{cookie::SESSION_COOKIE, rest::ApiDoc};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn portal_document() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = "Billing Portal API".to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    let components = doc.components.get_or_insert_with(Default::default);
    components.add_security_scheme(
        "session_cookie",
        SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
    );
    doc
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    std::fs::write(&output, portal_document().to_pretty_json()?)?;
    println!("OpenAPI document written to {}", output);
    Ok(())
}
