//! Router-level behaviour.
//!
//! Tests verify:
//! - Health endpoint
//! - Configuration errors refuse to build a router
//! - Plain requests pass through unchanged

use axum::http::StatusCode;
use axum::Router;

use bitblt::{create_router, BitbltConfig, ConfigError, RouterConfig};

use super::test_utils::{body_bytes, default_app, get, test_jpeg};

#[tokio::test]
async fn test_health_endpoint() {
    let (app, log) = default_app();

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
    // Not forwarded to the origin
    assert!(log.seen().is_empty());
}

#[test]
fn test_missing_secret_refuses_to_start() {
    let result = create_router(Router::new(), RouterConfig::new(BitbltConfig::default()));
    assert!(matches!(result, Err(ConfigError::MissingSecret)));
}

#[test]
fn test_invalid_quality_refuses_to_start() {
    let result = create_router(
        Router::new(),
        RouterConfig::new(BitbltConfig::new("s").with_quality(0)),
    );
    assert!(matches!(result, Err(ConfigError::InvalidQuality(0))));
}

#[tokio::test]
async fn test_plain_image_passthrough() {
    let (app, log) = default_app();

    let response = get(&app, "/images/photo.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, test_jpeg(100, 100));
    assert_eq!(log.seen(), vec!["/images/photo.jpg"]);
}

#[tokio::test]
async fn test_unknown_path_passthrough() {
    let (app, _) = default_app();

    let response = get(&app, "/nothing/here").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
