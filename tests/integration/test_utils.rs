//! Test utilities for integration tests.
//!
//! Provides a fake origin application, image fixtures and a cache that counts
//! how often it is written.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get as get_route;
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tower::ServiceExt;

use bitblt::error::CacheError;
use bitblt::{create_router, BitbltConfig, MemoryCache, RouterConfig, TransformCache};

/// Secret shared by all tests.
pub const SECRET: &str = "secret";

/// Page served by the fake origin at `*/page.html`.
pub const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Gallery</title></head>
<body>
<h1>Photos &amp; more</h1>
<img src="/images/photo.jpg" width="32" height="32" alt="thumb">
<img src="/images/photo.jpg" width="50%">
<img src="http://cdn.example.com/banner.png" width="200">
</body>
</html>
"#;

/// Page with a dimension that ends in a multi-byte character.
pub const UNICODE_HTML: &str = "<p>Größe</p>\n<img src=\"/images/photo.jpg\" width=\"1€\">\n<img src=\"/images/photo.jpg\" width=\"32\">\n";

// =============================================================================
// Image Fixtures
// =============================================================================

/// A JPEG with a gradient so resizes have something to work on.
pub fn test_jpeg(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .encode_image(&img)
        .unwrap();
    Bytes::from(out)
}

/// A PNG with a transparent left half.
pub fn test_png_rgba(width: u32, height: u32) -> Bytes {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        Rgba([0, 0, 255, if x < width / 2 { 0 } else { 255 }])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    Bytes::from(out)
}

/// Decode an image and return its dimensions.
pub fn image_dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).expect("response should be a decodable image");
    (img.width(), img.height())
}

// =============================================================================
// Fake Origin
// =============================================================================

/// Records the URIs the origin received.
#[derive(Clone, Default)]
pub struct OriginLog {
    seen: Arc<Mutex<Vec<String>>>,
    headers: Arc<Mutex<Vec<Vec<String>>>>,
}

impl OriginLog {
    fn record(&self, request: &Request) {
        self.seen.lock().unwrap().push(request.uri().to_string());
        self.headers.lock().unwrap().push(
            request
                .headers()
                .keys()
                .map(|name| name.as_str().to_string())
                .collect(),
        );
    }

    /// URIs in the order they were received.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    /// Header names of the most recent request.
    pub fn last_header_names(&self) -> Vec<String> {
        self.headers.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

/// An origin that serves fixtures by file name, whatever the directory.
pub fn origin(log: OriginLog) -> Router {
    Router::new().fallback(move |request: Request| {
        let log = log.clone();
        async move {
            log.record(&request);
            let file_name = request.uri().path().rsplit('/').next().unwrap_or("").to_string();
            serve_fixture(&file_name)
        }
    })
}

/// An origin with explicit routes and no fallback.
pub fn routed_origin(log: OriginLog) -> Router {
    let handler = move |request: Request| {
        let log = log.clone();
        async move {
            log.record(&request);
            let file_name = request.uri().path().rsplit('/').next().unwrap_or("").to_string();
            serve_fixture(&file_name)
        }
    };
    Router::new()
        .route("/images/photo.jpg", get_route(handler.clone()))
        .route("/pages/page.html", get_route(handler))
}

fn with_type(content_type: &'static str, body: impl Into<Body>) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap()
}

fn serve_fixture(file_name: &str) -> Response {
    match file_name {
        "photo.jpg" => with_type("image/jpeg", test_jpeg(100, 100)),
        "wide.jpg" => with_type("image/jpeg", test_jpeg(200, 100)),
        "alpha.png" => with_type("image/png", test_png_rgba(40, 20)),
        "broken.jpg" => with_type("image/jpeg", Bytes::from_static(b"definitely not a jpeg")),
        "page.html" => with_type("text/html; charset=utf-8", PAGE_HTML),
        "unicode.html" => with_type("text/html; charset=utf-8", UNICODE_HTML),
        "sized.html" => {
            let mut response = with_type("text/html", PAGE_HTML);
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from(PAGE_HTML.len()));
            response
        }
        "empty.html" => with_type("text/html", Body::empty()),
        "gzipped.html" => {
            let mut response = with_type("text/html", PAGE_HTML);
            response
                .headers_mut()
                .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            response
        }
        "style.css" => with_type("text/css", "img { width: 10px; }"),
        "missing.jpg" => (StatusCode::NOT_FOUND, "not found").into_response(),
        _ => (StatusCode::NOT_FOUND, "no such fixture").into_response(),
    }
}

// =============================================================================
// Counting Cache
// =============================================================================

/// A memory cache that counts reads and writes.
#[derive(Default)]
pub struct CountingCache {
    inner: MemoryCache,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl CountingCache {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Writes happen once per transform, so this counts transforms.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformCache for CountingCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), CacheError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, data).await
    }
}

// =============================================================================
// Request Helpers
// =============================================================================

/// The middleware around the fake origin.
pub fn app(config: BitbltConfig, log: OriginLog) -> Router {
    create_router(origin(log), RouterConfig::new(config).with_tracing(false))
        .expect("test configuration is valid")
}

/// The middleware around the routed origin.
pub fn routed_app(config: BitbltConfig, log: OriginLog) -> Router {
    create_router(routed_origin(log), RouterConfig::new(config).with_tracing(false))
        .expect("test configuration is valid")
}

/// The middleware around the fake origin with default settings.
pub fn default_app() -> (Router, OriginLog) {
    let log = OriginLog::default();
    (app(BitbltConfig::new(SECRET), log.clone()), log)
}

/// Send a GET request with a `Host: localhost` header.
pub async fn get(router: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost")
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body.
pub async fn body_bytes(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// The `src` values of all `<img>` tags, in document order.
pub fn image_sources(html: &str) -> Vec<String> {
    html.match_indices("<img")
        .filter_map(|(idx, _)| {
            let tag = &html[idx..idx + html[idx..].find('>')?];
            let start = tag.find("src=\"")? + 5;
            let end = start + tag[start..].find('"')?;
            Some(tag[start..end].to_string())
        })
        .collect()
}
