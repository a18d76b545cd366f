//! Router configuration for bitblt.
//!
//! The middleware wraps an arbitrary origin router as a whole service, so it
//! sees each request before the origin routes it. Stripping the directive
//! therefore changes which origin route handles the request.
//!
//! # Route Structure
//!
//! ```text
//! /health      - Health check (not wrapped)
//! /*           - Origin, wrapped by the bitblt middleware
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bitblt::config::BitbltConfig;
//! use bitblt::server::routes::{create_router, RouterConfig};
//! use tower_http::services::ServeDir;
//!
//! let origin = Router::new().fallback_service(ServeDir::new("public"));
//! let router = create_router(origin, RouterConfig::new(BitbltConfig::new("my-secret")))?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::health_handler;
use super::middleware::{bitblt_middleware, BitbltState};
use crate::config::BitbltConfig;
use crate::error::ConfigError;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Middleware configuration
    pub bitblt: BitbltConfig,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration. Tracing is enabled by default.
    pub fn new(bitblt: BitbltConfig) -> Self {
        Self {
            bitblt,
            enable_tracing: true,
        }
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Wrap an origin router in the bitblt middleware.
///
/// The returned router sends every request through the middleware first and
/// only then into the origin's own routing.
pub fn wrap_router(origin: Router, state: Arc<BitbltState>) -> Router {
    let wrapped = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(state, bitblt_middleware))
        .service(origin);
    Router::new().fallback_service(wrapped)
}

/// Create the application router: health check plus the wrapped origin.
///
/// # Errors
///
/// Returns a `ConfigError` if the middleware configuration is invalid.
/// `/health` is answered here and never reaches the origin.
pub fn create_router(origin: Router, config: RouterConfig) -> Result<Router, ConfigError> {
    let state = Arc::new(BitbltState::from_config(&config.bitblt)?);

    let router = Router::new()
        .route("/health", get(health_handler))
        .fallback_service(wrap_router(origin, state));

    if config.enable_tracing {
        Ok(router.layer(TraceLayer::new_for_http()))
    } else {
        Ok(router)
    }
}
