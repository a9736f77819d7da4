//! Health Check API Tests

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();
    let response = app.server().get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();
    let response = app.server().get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_store_and_connections() {
    let app = TestApp::new();
    let (_, _conn) = app.connect_new_user().await;

    let response = app.server().get("/health/ready").await;

    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["store"]["backend"], "memory");
    assert_eq!(json["checks"]["websocket"]["active_connections"], 1);
    assert_eq!(json["checks"]["websocket"]["authenticated_sessions"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_text_format() {
    let app = TestApp::new();
    let server = app.server();
    server.get("/health").await.assert_status_ok();

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    assert!(response.text().contains("realtime_hub_http_requests_total"));
}
