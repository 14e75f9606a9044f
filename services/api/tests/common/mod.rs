//! Shared fixtures for the HTTP-level tests: an app wired to a wiremock server
//! standing in for the auth backend, the IP lookup, the map provider and the
//! backend REST API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use billing_portal_core::{
    domain::{now_millis, portal_menu, Session},
    otp::OtpPolicy,
    ports::{MapTokenService, SessionRepository},
    session::SessionManager,
};
use portal_api::{
    adapters::{
        http::build_client, HttpBackend, HttpIpLookup, HttpMapToken, HttpOtpGateway,
        MemorySessionRepository,
    },
    config::Config,
    web::{
        build_router,
        cookie::SessionSigner,
        state::{AppState, LoginFlows},
    },
};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;

pub const MOBILE: &str = "9876543210";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub upstream: MockServer,
    pub repository: Arc<MemorySessionRepository>,
}

pub struct Options {
    pub policy: OtpPolicy,
    pub with_map_token: bool,
    pub request_timeout_secs: u64,
    /// Overrides the mock-server backend, e.g. to point at a closed port.
    pub backend_base_url: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            policy: OtpPolicy::default(),
            with_map_token: true,
            request_timeout_secs: 5,
            backend_base_url: None,
        }
    }
}

pub async fn spawn_app(options: Options) -> TestApp {
    let upstream = MockServer::start().await;
    let uri = upstream.uri();

    let mut env: HashMap<&str, String> = HashMap::from([
        ("AUTH_BASE_URL", uri.clone()),
        (
            "BACKEND_BASE_URL",
            options
                .backend_base_url
                .clone()
                .unwrap_or_else(|| format!("{}/backend", uri)),
        ),
        ("IP_LOOKUP_URL", format!("{}/ip", uri)),
        ("SESSION_SECRET", "integration-test-secret-0123456789".to_string()),
        ("REQUEST_TIMEOUT_SECS", options.request_timeout_secs.to_string()),
    ]);
    if options.with_map_token {
        env.insert("MMI_TOKEN_URL", format!("{}/oauth/token", uri));
        env.insert("MMI_CLIENT_ID", "client".to_string());
        env.insert("MMI_CLIENT_SECRET", "secret".to_string());
        env.insert("MMI_USERNAME", "svc".to_string());
        env.insert("MMI_PASSWORD", "pw".to_string());
    }
    let config = Arc::new(Config::from_lookup(|key| env.get(key).cloned()).unwrap());

    let http = build_client(config.request_timeout).unwrap();
    let repository = Arc::new(MemorySessionRepository::new());
    let sessions = Arc::new(SessionManager::new(
        repository.clone(),
        chrono::Duration::hours(12),
    ));
    let map_token = config.map_token.clone().map(|map_config| {
        Arc::new(HttpMapToken::new(http.clone(), map_config)) as Arc<dyn MapTokenService>
    });

    let state = Arc::new(AppState {
        config: config.clone(),
        sessions,
        signer: Arc::new(SessionSigner::new(&config.session_secret).unwrap()),
        otp_gateway: Arc::new(HttpOtpGateway::new(http.clone(), config.auth_base_url.clone())),
        ip_lookup: Arc::new(HttpIpLookup::new(http.clone(), config.ip_lookup_url.clone())),
        map_token,
        backend: Arc::new(HttpBackend::new(http, config.backend_base_url.clone())),
        login_flows: Arc::new(LoginFlows::new(options.policy)),
        menu: Arc::new(portal_menu()),
    });

    TestApp {
        router: build_router(state.clone()),
        state,
        upstream,
        repository,
    }
}

pub fn no_cooldown() -> OtpPolicy {
    OtpPolicy {
        resend_cooldown: Duration::ZERO,
        max_resends: 3,
    }
}

pub fn session_json(scopes: &[&str]) -> Value {
    serde_json::json!({
        "id": "u-901",
        "userName": "Circle Admin",
        "userId": 901,
        "accessToken": "acc-901",
        "refreshToken": "ref-901",
        "discomId": 2,
        "roleId": 1,
        "lastLoginAt": "2026-10-15T08:30:00Z",
        "userScopes": scopes,
        "tokenExpiry": now_millis() + 3_600_000,
    })
}

pub fn session_with(scopes: &[&str], token_expiry: Option<i64>) -> Session {
    let mut session: Session = serde_json::from_value(session_json(scopes)).unwrap();
    session.token_expiry = token_expiry;
    session
}

/// Establishes a session directly and returns the `Cookie` header value.
pub async fn sign_in(app: &TestApp, session: Session) -> String {
    let (id, _) = app.state.sessions.establish(session).await.unwrap();
    format!("portal_session={}", app.state.signer.sign(&id))
}

/// Whether the session behind a `Cookie` header value is still persisted.
pub async fn is_stored(app: &TestApp, cookie: &str) -> bool {
    let signed = cookie.trim_start_matches("portal_session=");
    let session_id = app.state.signer.verify(signed).unwrap();
    app.repository.load(&session_id).await.unwrap().is_some()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `Cookie` header value matching the `Set-Cookie` in this response.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub async fn send(app: &TestApp, request: Request<Body>) -> TestResponse {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}
