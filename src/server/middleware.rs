//! Request/response orchestration.
//!
//! Per request:
//!
//! ```text
//! match directive ─► strip segment from URI ─► origin
//!                                               │
//!        ┌──────────────────────────────────────┤
//!        ▼                                      ▼
//!   text/html: rewrite <img>        image/* + verified directive:
//!                                    cache hit ─► cached bytes
//!                                    cache miss ─► transform ─► store
//! ```
//!
//! Anything else passes through untouched. A directive whose signature does
//! not verify is stripped and then ignored, which makes it indistinguishable
//! from a request without a directive. A rewrite or transform that fails for
//! one response hands back the origin's body unchanged.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{
        header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HOST, RANGE},
        response::Parts,
        HeaderName, HeaderValue, Uri,
    },
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use http::uri::PathAndQuery;
use tracing::{debug, warn};

use crate::cache::TransformCache;
use crate::config::BitbltConfig;
use crate::directive::{DirectiveMatcher, MatchedDirective, Signer};
use crate::error::{BitbltError, ConfigError, TransformError};
use crate::rewrite::TagRewriter;
use crate::transform::{ImageSource, ImageTransformer};

/// Header reporting whether a transformed image came from the cache.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-bitblt-cache");

// =============================================================================
// State
// =============================================================================

/// Shared middleware state, built once from a validated [`BitbltConfig`].
pub struct BitbltState {
    pub matcher: DirectiveMatcher,
    pub rewriter: TagRewriter,
    pub transformer: ImageTransformer,
    pub cache: Option<Arc<dyn TransformCache>>,

    /// Restrict rewriting to `src` values on the application's own host
    pub limit_to_application_url: bool,

    /// Explicit application URL; derived from each request when unset
    pub app_url: Option<String>,

    /// Largest body buffered for rewriting or resizing
    pub max_body_size: usize,
}

impl BitbltState {
    /// Build the state, failing if the configuration is invalid.
    pub fn from_config(config: &BitbltConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let secret = config.secret.as_deref().ok_or(ConfigError::MissingSecret)?;
        let signer = Signer::new(secret);

        Ok(Self {
            matcher: DirectiveMatcher::new(signer.clone()),
            rewriter: TagRewriter::new(signer).with_xhtml(config.xhtml),
            transformer: ImageTransformer::new(config.quality, config.filter),
            cache: config.cache.clone(),
            limit_to_application_url: config.limit_to_application_url,
            app_url: config.app_url.clone(),
            max_body_size: config.max_body_size,
        })
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Axum middleware applying the directive protocol around an origin.
///
/// Use with `axum::middleware::from_fn_with_state(Arc<BitbltState>, bitblt_middleware)`.
pub async fn bitblt_middleware(
    State(state): State<Arc<BitbltState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, BitbltError> {
    let original_path = request.uri().path().to_string();
    let matched = state.matcher.match_path(original_path.as_bytes());

    if matched.is_present() {
        match replace_path(request.uri(), &matched.stripped_path) {
            Some(uri) => {
                debug!(from = %original_path, to = %uri, "Stripped directive segment");
                *request.uri_mut() = uri;
            }
            None => warn!(path = %original_path, "Could not rebuild URI without directive"),
        }
    }

    // Only verified directives with a size are acted on
    let directive = matched
        .directive
        .filter(|d| d.verified && d.has_dimension());

    if directive.is_some() {
        // A partial body cannot be resized
        request.headers_mut().remove(RANGE);
    }

    let app_url = if state.limit_to_application_url {
        state.app_url.clone().or_else(|| application_url(&request))
    } else {
        None
    };

    let response = next.run(request).await;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("text/html") {
        if is_encoded(&response) {
            debug!("Skipping rewrite of encoded HTML body");
            return Ok(response);
        }
        if exceeds_limit(&response, state.max_body_size) {
            debug!(limit = state.max_body_size, "Skipping rewrite of oversized HTML body");
            return Ok(response);
        }
        return rewrite_html(state, response, app_url).await;
    }

    match directive {
        Some(directive) if content_type.starts_with("image/") && response.status().is_success() => {
            if exceeds_limit(&response, state.max_body_size) {
                debug!(limit = state.max_body_size, "Skipping transform of oversized image");
                return Ok(response);
            }
            transform_image(state, response, &directive, original_path).await
        }
        _ => Ok(response),
    }
}

async fn rewrite_html(
    state: Arc<BitbltState>,
    response: Response,
    app_url: Option<String>,
) -> Result<Response, BitbltError> {
    let (parts, body) = response.into_parts();
    let body = read_body(body, state.max_body_size).await?;

    if body.is_empty() {
        return Ok(Response::from_parts(parts, Body::from(body)));
    }

    let source = body.clone();
    let rewritten = run_blocking(move || state.rewriter.rewrite(&source, app_url.as_deref())).await;

    match rewritten {
        Some(rewritten) => Ok(respond(parts, rewritten.body, None)),
        None => Ok(Response::from_parts(parts, Body::from(body))),
    }
}

async fn transform_image(
    state: Arc<BitbltState>,
    response: Response,
    directive: &MatchedDirective,
    cache_key: String,
) -> Result<Response, BitbltError> {
    let size = directive.size()?;
    let (parts, body) = response.into_parts();
    let body = read_body(body, state.max_body_size).await?;

    if let Some(cache) = &state.cache {
        match cache.get(&cache_key).await {
            Ok(Some(cached)) => {
                debug!(key = %cache_key, "Cache hit");
                return Ok(respond(parts, cached, Some("hit")));
            }
            Ok(None) => {}
            Err(e) => warn!(key = %cache_key, error = %e, "Cache lookup failed"),
        }
    }

    let transformer = state.transformer;
    let source = body.clone();
    let result = run_blocking(move || transformer.transform(ImageSource::Buffer(source), size)).await;

    let transformed = match result {
        Some(Ok(transformed)) => transformed,
        None => return Ok(Response::from_parts(parts, Body::from(body))),
        Some(Err(e)) => {
            match &e {
                TransformError::UnsupportedImage { .. } => {
                    debug!(key = %cache_key, error = %e, "Passing through undecodable image")
                }
                _ => warn!(key = %cache_key, error = %e, "Image transform failed"),
            }
            return Ok(Response::from_parts(parts, Body::from(body)));
        }
    };

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.put(&cache_key, transformed.clone()).await {
            warn!(key = %cache_key, error = %e, "Cache store failed");
        }
    }

    debug!(
        key = %cache_key,
        from_bytes = body.len(),
        to_bytes = transformed.len(),
        "Transformed image"
    );

    Ok(respond(parts, transformed, Some("miss")))
}

// =============================================================================
// Helpers
// =============================================================================

/// Run CPU-bound work on the blocking pool. `None` if the worker panicked.
async fn run_blocking<T, F>(work: F) -> Option<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Worker failed, passing original body through");
            None
        }
    }
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, BitbltError> {
    to_bytes(body, limit)
        .await
        .map_err(|e| BitbltError::Body(e.to_string()))
}

/// Whether the declared `Content-Length` is over the limit.
fn exceeds_limit(response: &Response, limit: usize) -> bool {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > limit as u64)
}

fn respond(mut parts: Parts, body: Bytes, cache_status: Option<&'static str>) -> Response {
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    if let Some(status) = cache_status {
        parts
            .headers
            .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    }
    Response::from_parts(parts, Body::from(body))
}

fn is_encoded(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.trim().eq_ignore_ascii_case("identity"))
}

/// Replace the path of a URI, keeping its query string.
fn replace_path(uri: &Uri, path: &[u8]) -> Option<Uri> {
    let mut path_and_query = Vec::with_capacity(path.len() + 1);
    if !path.starts_with(b"/") {
        path_and_query.push(b'/');
    }
    path_and_query.extend_from_slice(path);
    if let Some(query) = uri.query() {
        path_and_query.push(b'?');
        path_and_query.extend_from_slice(query.as_bytes());
    }

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::from_maybe_shared(Bytes::from(path_and_query)).ok()?);
    Uri::from_parts(parts).ok()
}

/// `scheme://host` of the request, from the URI or the `Host` header.
fn application_url(request: &Request) -> Option<String> {
    let host = request
        .uri()
        .authority()
        .map(|a| a.as_str().to_string())
        .or_else(|| {
            request
                .headers()
                .get(HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })?;
    let scheme = request.uri().scheme_str().unwrap_or("http");
    Some(format!("{}://{}", scheme, host))
}
