//! Inbound directive handling through the middleware.
//!
//! Tests verify:
//! - Verified directives resize images in their own format
//! - Forged or tampered directives serve the original bytes
//! - Directive segments never reach the origin, including routed origins
//! - Invalid directives and undecodable images

use axum::http::StatusCode;
use proptest::prelude::*;
use tower::ServiceExt;

use bitblt::{BitbltConfig, Directive, Signer, CACHE_STATUS_HEADER};

use super::test_utils::{
    body_bytes, default_app, get, image_dimensions, routed_app, test_jpeg, OriginLog, SECRET,
};

fn segment(width: Option<u32>, height: Option<u32>) -> String {
    Directive::new(&Signer::new(SECRET), width, height).segment()
}

// =============================================================================
// Verified Directives
// =============================================================================

#[tokio::test]
async fn test_verified_directive_resizes_jpeg() {
    let (app, _) = default_app();

    let response = get(&app, &format!("/{}/photo.jpg", segment(Some(32), Some(32)))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    let length: usize = response.headers()["content-length"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let body = body_bytes(response).await;
    assert_eq!(body.len(), length);
    assert_eq!(image_dimensions(&body), (32, 32));
}

#[tokio::test]
async fn test_width_only_keeps_aspect_ratio() {
    let (app, _) = default_app();

    let response = get(&app, &format!("/img/{}/wide.jpg", segment(Some(50), None))).await;
    assert_eq!(image_dimensions(&body_bytes(response).await), (50, 25));
}

#[tokio::test]
async fn test_height_only_png_keeps_alpha() {
    let (app, _) = default_app();

    let response = get(&app, &format!("/{}/alpha.png", segment(None, Some(10)))).await;
    assert_eq!(response.headers()["content-type"], "image/png");

    let body = body_bytes(response).await;
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (20, 10));
    assert!(img.color().has_alpha());
}

#[tokio::test]
async fn test_directive_without_dimensions_is_ignored() {
    let (app, _) = default_app();

    let response = get(&app, &format!("/{}/photo.jpg", segment(None, None))).await;
    assert!(response.headers().get(CACHE_STATUS_HEADER).is_none());
    assert_eq!(body_bytes(response).await, test_jpeg(100, 100));
}

// =============================================================================
// Forged Directives
// =============================================================================

#[tokio::test]
async fn test_invalid_signature_serves_original() {
    let (app, log) = default_app();
    let forged = Signer::new("other-secret").sign(Some(32), Some(32));

    let response = get(&app, &format!("/bitblt-32x32-{}/photo.jpg", forged)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(CACHE_STATUS_HEADER).is_none());
    assert_eq!(body_bytes(response).await, test_jpeg(100, 100));
    // Stripped even though it did not verify
    assert_eq!(log.seen(), vec!["/photo.jpg"]);
}

#[tokio::test]
async fn test_forged_matches_no_directive() {
    let (app, _) = default_app();

    let plain = body_bytes(get(&app, "/photo.jpg").await).await;
    let forged = body_bytes(get(&app, "/bitblt-8x8-0123abcd/photo.jpg").await).await;
    assert_eq!(plain, forged);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// A signature for one size never authorises another.
    #[test]
    fn prop_tampered_size_serves_original(
        w in 1u32..64, h in 1u32..64, dw in 1u32..8
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (app, _) = default_app();
        let signature = Signer::new(SECRET).sign(Some(w), Some(h));
        let uri = format!("/bitblt-{}x{}-{}/photo.jpg", w + dw, h, signature);

        let body = runtime.block_on(async { body_bytes(get(&app, &uri).await).await });
        prop_assert_eq!(body, test_jpeg(100, 100));
    }
}

// =============================================================================
// Path Handling
// =============================================================================

#[tokio::test]
async fn test_origin_never_sees_directive() {
    let (app, log) = default_app();

    get(&app, &format!("/images/{}/photo.jpg", segment(Some(10), None))).await;
    get(&app, &format!("/a/{}/b/{}/photo.jpg", segment(Some(10), None), segment(None, Some(4)))).await;

    assert_eq!(log.seen(), vec!["/images/photo.jpg", "/a/b/photo.jpg"]);
}

#[tokio::test]
async fn test_query_string_preserved() {
    let (app, log) = default_app();

    get(&app, &format!("/{}/photo.jpg?v=3&x=y", segment(Some(10), None))).await;
    assert_eq!(log.seen(), vec!["/photo.jpg?v=3&x=y"]);
}

#[tokio::test]
async fn test_percent_encoded_path_forwarded() {
    let (app, log) = default_app();

    let response = get(&app, &format!("/caf%C3%A9/{}/photo.jpg", segment(Some(16), None))).await;
    assert_eq!(image_dimensions(&body_bytes(response).await), (16, 16));
    assert_eq!(log.seen(), vec!["/caf%C3%A9/photo.jpg"]);
}

#[tokio::test]
async fn test_range_header_dropped_for_resize() {
    let (app, log) = default_app();
    let request = axum::http::Request::builder()
        .uri(format!("/{}/photo.jpg", segment(Some(10), None)))
        .header("range", "bytes=0-99")
        .body(axum::body::Body::empty())
        .unwrap();

    app.oneshot(request).await.unwrap();
    assert!(!log.last_header_names().contains(&"range".to_string()));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_verified_overflowing_dimension_is_bad_request() {
    let (app, _) = default_app();
    let signer = Signer::new(SECRET);
    let signature = signer.sign_tokens("99999999999", "None");

    let response = get(&app, &format!("/bitblt-99999999999xNone-{}/photo.jpg", signature)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"], "invalid_directive");
}

#[tokio::test]
async fn test_undecodable_image_passes_through() {
    let (app, _) = default_app();

    let response = get(&app, &format!("/{}/broken.jpg", segment(Some(10), Some(10)))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), b"definitely not a jpeg");
}

#[tokio::test]
async fn test_non_image_response_untouched() {
    let (app, _) = default_app();

    let response = get(&app, &format!("/{}/style.css", segment(Some(10), None))).await;
    assert_eq!(body_bytes(response).await.as_ref(), b"img { width: 10px; }");
}

#[tokio::test]
async fn test_origin_error_untouched() {
    let (app, _) = default_app();

    let response = get(&app, &format!("/{}/missing.jpg", segment(Some(10), None))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Routed Origins
// =============================================================================

#[tokio::test]
async fn test_signed_url_reaches_routed_origin() {
    let log = OriginLog::default();
    let app = routed_app(BitbltConfig::new(SECRET), log.clone());

    let response = get(&app, &format!("/images/{}/photo.jpg", segment(Some(32), Some(32)))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (32, 32));
    assert_eq!(log.seen(), vec!["/images/photo.jpg".to_string()]);
}

#[tokio::test]
async fn test_forged_url_reaches_routed_origin_unresized() {
    let log = OriginLog::default();
    let app = routed_app(BitbltConfig::new(SECRET), log.clone());

    let forged = format!("bitblt-32x32-{}", "0".repeat(64));
    let response = get(&app, &format!("/images/{}/photo.jpg", forged)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (100, 100));
    assert_eq!(log.seen(), vec!["/images/photo.jpg".to_string()]);
}

#[tokio::test]
async fn test_routed_origin_unknown_path_is_not_found() {
    let app = routed_app(BitbltConfig::new(SECRET), OriginLog::default());

    let response = get(&app, &format!("/other/{}/photo.jpg", segment(Some(32), None))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
