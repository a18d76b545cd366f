//! # bitblt
//!
//! HTTP middleware that resizes images on behalf of the HTML that embeds them.
//!
//! HTML responses passing through the middleware have their sized `<img>`
//! elements rewritten so the image URL carries a signed resize directive:
//!
//! ```text
//! <img src="/photos/cat.jpg" width="320">
//!   → <img src="/photos/bitblt-320xNone-<signature>/cat.jpg" width="320">
//! ```
//!
//! When the browser requests that URL, the middleware verifies the signature,
//! strips the directive before the request reaches the wrapped application and
//! resizes the image it returns. Only the server can mint valid directives, so
//! clients cannot ask for arbitrary sizes.
//!
//! ## Architecture
//!
//! - [`directive`] - Signing, verification and path matching of directives
//! - [`rewrite`] - `<img>` rewriting for HTML and XHTML documents
//! - [`transform`] - Image decode, resize and re-encode
//! - [`cache`] - Memory and disk stores for transformed images
//! - [`server`] - Axum middleware, routes and handlers
//! - [`config`] - Middleware configuration and CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::Router;
//! use bitblt::{create_router, BitbltConfig, RouterConfig};
//! use tower_http::services::ServeDir;
//!
//! #[tokio::main]
//! async fn main() {
//!     let origin = Router::new().fallback_service(ServeDir::new("public"));
//!     let router = create_router(origin, RouterConfig::new(BitbltConfig::new("my-secret")))
//!         .expect("valid configuration");
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod cache;
pub mod config;
pub mod directive;
pub mod error;
pub mod rewrite;
pub mod server;
pub mod transform;

// Re-export commonly used types
pub use cache::{DiskCache, MemoryCache, TransformCache};
pub use config::{BitbltConfig, Cli, Command, RewriteConfig, ServeConfig, SignConfig, SignOutputFormat};
pub use directive::{Directive, DirectiveMatch, DirectiveMatcher, MatchedDirective, Signer};
pub use error::{BitbltError, CacheError, ConfigError, TransformError};
pub use rewrite::{ParseMode, Rewritten, TagRewriter};
pub use server::{
    bitblt_middleware, create_router, health_handler, wrap_router, BitbltState, ErrorResponse,
    HealthResponse, RouterConfig, CACHE_STATUS_HEADER,
};
pub use transform::{ImageSource, ImageTransformer, ResizeFilter, TargetSize};
