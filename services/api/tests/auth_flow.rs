//! End-to-end OTP login through the relay endpoints.

mod common;

use axum::http::{header, StatusCode};
use billing_portal_core::otp::OtpPolicy;
use common::{
    get_with_cookie, is_stored, no_cooldown, post_json, send, session_json, spawn_app, Options,
    MOBILE,
};
use std::time::Duration;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, ResponseTemplate,
};

async fn mock_send_otp(app: &common::TestApp, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/send-otp"))
        .and(body_partial_json(json!({
            "mobileNumber": MOBILE,
            "sourceType": "PORTAL"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "OTP sent", "data": { "otpRef": "r-1" } })),
        )
        .expect(expected_calls)
        .mount(&app.upstream)
        .await;
}

async fn mock_ip(app: &common::TestApp) {
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ip": "203.0.113.5" })))
        .mount(&app.upstream)
        .await;
}

async fn mock_authenticate(app: &common::TestApp, otp: &str, ip: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/authenticate"))
        .and(body_partial_json(json!({
            "mobileNumber": MOBILE,
            "otp": otp,
            "ipAddress": ip,
            "sourceType": "PORTAL"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Login successful",
            "data": session_json(&["dashboard", "adminUserManagement"])
        })))
        .mount(&app.upstream)
        .await;
}

#[tokio::test]
async fn otp_login_establishes_a_session_until_logout() {
    let app = spawn_app(Options::default()).await;
    mock_send_otp(&app, 1).await;
    mock_ip(&app).await;
    mock_authenticate(&app, "123456", "203.0.113.5").await;

    let generated = send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;
    assert_eq!(generated.status, StatusCode::OK);
    assert_eq!(generated.body["message"], "OTP sent");
    assert_eq!(generated.body["data"]["otpRef"], "r-1");
    assert_eq!(generated.body["resendAfter"], 120);
    assert_eq!(generated.body["resendsRemaining"], 3);

    let validated = send(
        &app,
        post_json("/api/otp/validate", json!({ "mobileNumber": MOBILE, "otp": "123456" })),
    )
    .await;
    assert_eq!(validated.status, StatusCode::OK);
    assert_eq!(validated.body["redirect"], "/dashboard");
    assert_eq!(validated.body["data"]["userName"], "Circle Admin");
    assert!(app.state.login_flows.is_empty());

    let set_cookie = validated.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = validated.session_cookie().unwrap();

    let current = send(&app, get_with_cookie("/api/session", &cookie)).await;
    assert_eq!(current.status, StatusCode::OK);
    assert_eq!(current.body["userId"], 901);
    assert_eq!(current.body["userScopes"], json!(["dashboard", "adminUserManagement"]));

    let mut logout = post_json("/api/logout", json!({}));
    logout
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let logged_out = send(&app, logout).await;
    assert_eq!(logged_out.status, StatusCode::OK);
    assert!(logged_out.headers[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));
    assert!(!is_stored(&app, &cookie).await);

    let after = send(&app, get_with_cookie("/api/session", &cookie)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_mobile_numbers_never_reach_the_backend() {
    let app = spawn_app(Options::default()).await;
    mock_send_otp(&app, 0).await;

    for number in ["12345", "5876543210", "98765432101", "98765abcde"] {
        let response = send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": number }))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{number}");
        assert!(response.body["message"].is_string());
    }
}

#[tokio::test]
async fn resends_are_limited() {
    let app = spawn_app(Options {
        policy: no_cooldown(),
        ..Options::default()
    })
    .await;
    // The first request plus three resends.
    mock_send_otp(&app, 4).await;

    for expected_remaining in [3, 2, 1, 0] {
        let response = send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["resendsRemaining"], expected_remaining);
    }

    let refused = send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;
    assert_eq!(refused.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn dropped_validation_does_not_reset_the_resend_limit() {
    let app = spawn_app(Options {
        policy: no_cooldown(),
        ..Options::default()
    })
    .await;
    mock_send_otp(&app, 4).await;
    mock_ip(&app).await;
    Mock::given(method("POST"))
        .and(path("/auth/authenticate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({ "message": "Login successful", "data": session_json(&[]) })),
        )
        .mount(&app.upstream)
        .await;

    for _ in 0..4 {
        let response = send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    // The client gives up while the auth backend is still answering.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(300),
        send(
            &app,
            post_json("/api/otp/validate", json!({ "mobileNumber": MOBILE, "otp": "123456" })),
        ),
    )
    .await;
    assert!(abandoned.is_err());

    for _ in 0..4 {
        let response = send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;
        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    }
}

#[tokio::test]
async fn resend_inside_the_cooldown_is_refused() {
    let app = spawn_app(Options {
        policy: OtpPolicy::default(),
        ..Options::default()
    })
    .await;
    mock_send_otp(&app, 1).await;

    let first = send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;
    assert_eq!(first.status, StatusCode::OK);

    let again = send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;
    assert_eq!(again.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn incomplete_codes_are_rejected_locally() {
    let app = spawn_app(Options::default()).await;
    mock_send_otp(&app, 1).await;
    Mock::given(path("/auth/authenticate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.upstream)
        .await;

    send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;

    for otp in ["", "1234", "12345"] {
        let response = send(
            &app,
            post_json("/api/otp/validate", json!({ "mobileNumber": MOBILE, "otp": otp })),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{otp:?}");
    }

    let non_digits = send(
        &app,
        post_json("/api/otp/validate", json!({ "mobileNumber": MOBILE, "otp": "12a456" })),
    )
    .await;
    assert_eq!(non_digits.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn validate_without_a_requested_otp_is_refused() {
    let app = spawn_app(Options::default()).await;

    let response = send(
        &app,
        post_json("/api/otp/validate", json!({ "mobileNumber": MOBILE, "otp": "123456" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Request an OTP first");
}

#[tokio::test]
async fn rejected_otp_passes_the_backend_status_through_and_allows_a_retry() {
    let app = spawn_app(Options::default()).await;
    mock_send_otp(&app, 1).await;
    mock_ip(&app).await;
    Mock::given(method("POST"))
        .and(path("/auth/authenticate"))
        .and(body_partial_json(json!({ "otp": "000000" })))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid OTP" })))
        .mount(&app.upstream)
        .await;
    mock_authenticate(&app, "123456", "203.0.113.5").await;

    send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;

    let wrong = send(
        &app,
        post_json("/api/otp/validate", json!({ "mobileNumber": MOBILE, "otp": "000000" })),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid OTP");
    assert!(wrong.headers.get(header::SET_COOKIE).is_none());

    let right = send(
        &app,
        post_json("/api/otp/validate", json!({ "mobileNumber": MOBILE, "otp": "123456" })),
    )
    .await;
    assert_eq!(right.status, StatusCode::OK);
    assert!(right.session_cookie().is_some());
}

#[tokio::test]
async fn send_failures_keep_the_backend_message() {
    let app = spawn_app(Options::default()).await;
    Mock::given(method("POST"))
        .and(path("/auth/send-otp"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "User not registered" })),
        )
        .mount(&app.upstream)
        .await;

    let response = send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "User not registered");
}

#[tokio::test]
async fn forwarded_address_is_used_when_the_ip_lookup_fails() {
    let app = spawn_app(Options::default()).await;
    mock_send_otp(&app, 1).await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&app.upstream)
        .await;
    mock_authenticate(&app, "123456", "198.51.100.7").await;

    send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;

    let mut request = post_json(
        "/api/otp/validate",
        json!({ "mobileNumber": MOBILE, "otp": "123456" }),
    );
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.7, 10.0.0.1".parse().unwrap());
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn failed_ip_lookup_without_a_forwarded_address_fails_the_login() {
    let app = spawn_app(Options::default()).await;
    mock_send_otp(&app, 1).await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&app.upstream)
        .await;

    send(&app, post_json("/api/otp/generate", json!({ "mobileNumber": MOBILE }))).await;

    let response = send(
        &app,
        post_json("/api/otp/validate", json!({ "mobileNumber": MOBILE, "otp": "123456" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(app.state.login_flows.get(MOBILE).is_some());
}
