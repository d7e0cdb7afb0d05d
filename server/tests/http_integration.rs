//! HTTP-level integration tests: drive the real axum `Router` end to end
//! over an in-memory rate limit store and a fake push gateway, via
//! `tower::ServiceExt::oneshot` rather than a bound TCP listener.
//!
//! These exist specifically to catch bugs at the JSON-extraction boundary
//! that unit tests calling the orchestrator directly can't see — a request
//! body missing a required field never reaches application code if the
//! `Json` extractor rejects it first.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use hasspush_server::gateway::fake::FakeGateway;
use hasspush_server::gateway::PushGateway;
use hasspush_server::orchestrator::Orchestrator;
use hasspush_server::rate_limit::RateLimitEngine;
use hasspush_server::store::InMemoryStore;
use hasspush_server::{handlers, health};

fn app(maximum: u32, gateway: Arc<dyn PushGateway>) -> Router {
    let store = InMemoryStore::new();
    let store_factory: Arc<dyn Fn() -> RateLimitEngine + Send + Sync> =
        Arc::new(move || RateLimitEngine::new(Arc::new(store.clone()), maximum));
    let orchestrator = Arc::new(Orchestrator::new(store_factory, gateway, maximum));

    Router::new()
        .route("/health", get(health::health))
        .route("/sendPushNotification", post(handlers::send_push_notification))
        .route("/androidV1", post(handlers::android_v1))
        .route("/iOSV1", post(handlers::ios_v1))
        .route("/checkRateLimits", post(handlers::check_rate_limits))
        .with_state(orchestrator)
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_reports_ok() {
    let gateway = Arc::new(FakeGateway::always_succeeds());
    let response = app(500, gateway)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn happy_path_send_returns_201_with_rate_limits() {
    let gateway = Arc::new(FakeGateway::always_succeeds());
    let response = app(500, gateway)
        .oneshot(json_request(
            "/sendPushNotification",
            json!({
                "push_token": "abc:1",
                "message": "Hi",
                "registration_info": { "app_id": "com.example" },
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["target"], "abc:1");
    assert_eq!(body["rateLimits"]["attempts"], 1);
    assert!(body["messageId"].is_string());
}

#[tokio::test]
async fn missing_push_token_is_rejected_with_exact_spec_body() {
    let gateway = Arc::new(FakeGateway::always_succeeds());
    let response = app(500, gateway)
        .oneshot(json_request("/sendPushNotification", json!({ "message": "Hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["errorMessage"], "You did not send a token!");
}

#[tokio::test]
async fn malformed_token_without_registration_info_is_rejected_with_exact_spec_body() {
    let gateway = Arc::new(FakeGateway::always_succeeds());
    let response = app(500, gateway)
        .oneshot(json_request("/sendPushNotification", json!({ "push_token": "legacySNS" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["errorMessage"], "That is not a valid FCM token");
}

#[tokio::test]
async fn exceeding_daily_quota_is_rejected_with_429() {
    let gateway = Arc::new(FakeGateway::always_succeeds());
    let router = app(1, gateway);

    let first = router
        .clone()
        .oneshot(json_request(
            "/sendPushNotification",
            json!({
                "push_token": "abc:1",
                "registration_info": { "app_id": "com.example" },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = router
        .oneshot(json_request(
            "/sendPushNotification",
            json!({
                "push_token": "abc:1",
                "registration_info": { "app_id": "com.example" },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(second).await;
    assert_eq!(body["errorType"], "RateLimited");
    assert_eq!(body["target"], "abc:1");
}

#[tokio::test]
async fn ios_command_message_skips_rate_limit_accounting() {
    let gateway = Arc::new(FakeGateway::always_succeeds());
    let router = app(500, gateway);

    let response = router
        .clone()
        .oneshot(json_request(
            "/iOSV1",
            json!({
                "push_token": "abc:1",
                "message": "clear_badge",
                "registration_info": { "app_id": "io.robbie.HomeAssistant" },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let check = router
        .oneshot(json_request("/checkRateLimits", json!({ "push_token": "abc:1" })))
        .await
        .unwrap();
    assert_eq!(check.status(), StatusCode::OK);
    let body = body_json(check).await;
    assert_eq!(body["rateLimits"]["attempts"], 0);
}

#[tokio::test]
async fn check_rate_limits_missing_token_is_rejected() {
    let gateway = Arc::new(FakeGateway::always_succeeds());
    let response = app(500, gateway)
        .oneshot(json_request("/checkRateLimits", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["errorMessage"], "You did not send a token!");
}
