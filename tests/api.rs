//! API endpoint integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use hearth::api::ApiServerBuilder;

mod common;
use common::{EchoInference, Fixture, setup_arbiter};

/// Build a test API router over fakes
fn build_test_router(fx: &Fixture, shutdown: CancellationToken) -> axum::Router {
    let (_distance_tx, distance_rx) = watch::channel(Some(42.0_f32));

    ApiServerBuilder::new(
        fx.db.clone(),
        Arc::clone(&fx.arbiter),
        0,
        distance_rx,
        shutdown,
    )
    .build()
    .router()
}

#[tokio::test]
async fn test_health_endpoint() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let app = build_test_router(&fx, CancellationToken::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let app = build_test_router(&fx, CancellationToken::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn test_status_endpoint() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let app = build_test_router(&fx, CancellationToken::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["state"], "idle");
    assert_eq!(json["settings"]["wake_word"], "hello");
    assert!(json["recent_exchanges"].is_array());
    assert_eq!(json["last_distance_cm"], 42.0);
}

#[tokio::test]
async fn test_text_input_streams_reply() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let app = build_test_router(&fx, CancellationToken::new());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/text")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"text": "hi there"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("echo: hi there"), "got: {text}");
}

#[tokio::test]
async fn test_text_input_rejects_empty_text() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let app = build_test_router(&fx, CancellationToken::new());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/text")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"text": "   "}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let app = build_test_router(&fx, CancellationToken::new());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/settings")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"wake_word": "Jarvis", "voice_enabled": false}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/settings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["wake_word"], "jarvis");
    assert_eq!(json["voice_enabled"], false);
    // Untouched fields keep their stored values
    assert_eq!(json["activation_timeout_secs"], 120);
}

#[tokio::test]
async fn test_settings_rejects_zero_timeout() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let app = build_test_router(&fx, CancellationToken::new());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/settings")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"activation_timeout_secs": 0}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_kill_cancels_shutdown_token() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let shutdown = CancellationToken::new();
    let app = build_test_router(&fx, shutdown.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/kill")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(shutdown.is_cancelled());
}
