//! Authentication and utility endpoint tests.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestFixture, ADMIN_KEY};

#[tokio::test]
async fn test_requests_without_credentials_are_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = fixture
        .post("/api/v1/jobs/refresh", json!({"site": "US"}))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_key_is_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture.get_as("/api/v1/health", "wrong-key").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_anonymous_mode_allows_requests() {
    let fixture = TestFixture::anonymous().await;

    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;

    let response = fixture.get_as("/api/v1/health", ADMIN_KEY).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.get_as("/api/v1/config", ADMIN_KEY).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["auth"]["method"], "api_key");
    assert_eq!(response.body["auth"]["token_count"], 3);
    // Raw token values never appear in the payload.
    assert!(!response.text.contains(ADMIN_KEY));
    assert_eq!(response.body["pipeline"]["roster_size"], 4);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    let fixture = TestFixture::new().await;

    // Generate at least one completed request first.
    fixture.get_as("/api/v1/health", ADMIN_KEY).await;

    let response = fixture.get_as("/api/v1/metrics", ADMIN_KEY).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.contains("rankwatch_http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let fixture = TestFixture::new().await;

    let response = fixture.get_as("/api/v1/nope", ADMIN_KEY).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
