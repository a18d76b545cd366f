//! Configuration management for bitblt.
//!
//! This module provides:
//! - [`BitbltConfig`], the library-level middleware configuration
//! - [`Cli`], the command line of the `bitblt` binary, via clap
//!
//! # Environment Variables
//!
//! Every option of the binary can also be set via environment variables with
//! the `BITBLT_` prefix:
//!
//! - `BITBLT_HOST` - Server bind address (default: 0.0.0.0)
//! - `BITBLT_PORT` - Server port (default: 3000)
//! - `BITBLT_ROOT` - Directory served as the origin (default: .)
//! - `BITBLT_SECRET` - Signing secret (required)
//! - `BITBLT_QUALITY` - Encoder quality (default: 80)
//! - `BITBLT_FILTER` - Resize filter: nearest, bilinear, bicubic, antialias
//! - `BITBLT_LIMIT_TO_APP_URL` - Only rewrite images on the application host
//! - `BITBLT_APP_URL` - Explicit application URL used for scoping
//! - `BITBLT_XHTML` - Try strict XHTML parsing before lenient HTML
//! - `BITBLT_CACHE_DIR` - Directory for the disk cache
//! - `BITBLT_CACHE_MEMORY` - In-memory cache capacity in bytes
//! - `BITBLT_MAX_BODY_SIZE` - Largest body rewritten or resized (default: 32MB)

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::cache::TransformCache;
use crate::error::ConfigError;
use crate::transform::{is_valid_quality, ResizeFilter, DEFAULT_QUALITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default limit on response bodies the middleware buffers (32MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 32 * 1024 * 1024;

// =============================================================================
// Middleware Configuration
// =============================================================================

/// Configuration of the bitblt middleware.
#[derive(Clone)]
pub struct BitbltConfig {
    /// Signing secret. Required.
    pub secret: Option<String>,

    /// Encoder quality (1-100)
    pub quality: u8,

    /// Resize filter
    pub filter: ResizeFilter,

    /// Only rewrite `src` values that are relative or start with the
    /// application URL
    pub limit_to_application_url: bool,

    /// Application URL used for scoping. Derived from each request when unset.
    pub app_url: Option<String>,

    /// Try a strict XHTML parse before lenient HTML
    pub xhtml: bool,

    /// Transform cache. `None` disables caching.
    pub cache: Option<Arc<dyn TransformCache>>,

    /// Largest response body that is rewritten or resized. Larger bodies
    /// with a known length pass through untouched.
    pub max_body_size: usize,
}

impl Default for BitbltConfig {
    fn default() -> Self {
        Self {
            secret: None,
            quality: DEFAULT_QUALITY,
            filter: ResizeFilter::default(),
            limit_to_application_url: false,
            app_url: None,
            xhtml: false,
            cache: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl BitbltConfig {
    /// Create a configuration with the given secret and defaults elsewhere.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Self::default()
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Restrict rewriting to the application's own images.
    pub fn with_limit_to_application_url(mut self, limit: bool) -> Self {
        self.limit_to_application_url = limit;
        self
    }

    pub fn with_app_url(mut self, app_url: impl Into<String>) -> Self {
        self.app_url = Some(app_url.into());
        self
    }

    pub fn with_xhtml(mut self, xhtml: bool) -> Self {
        self.xhtml = xhtml;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn TransformCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.secret.as_deref() {
            Some(secret) if !secret.is_empty() => {}
            _ => return Err(ConfigError::MissingSecret),
        }

        if !is_valid_quality(self.quality) {
            return Err(ConfigError::InvalidQuality(self.quality));
        }

        if let Some(app_url) = &self.app_url {
            url::Url::parse(app_url).map_err(|e| ConfigError::InvalidAppUrl {
                url: app_url.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

impl fmt::Debug for BitbltConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitbltConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("quality", &self.quality)
            .field("filter", &self.filter)
            .field("limit_to_application_url", &self.limit_to_application_url)
            .field("app_url", &self.app_url)
            .field("xhtml", &self.xhtml)
            .field("cache", &self.cache.is_some())
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// bitblt - signed image resizing for HTML pages.
///
/// Rewrites sized `<img>` tags to carry a signed resize directive and serves
/// resized images for requests that carry a valid one.
#[derive(Parser, Debug, Clone)]
#[command(name = "bitblt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve a directory through the bitblt middleware
    Serve(ServeConfig),

    /// Print the directive segment for a width and height
    Sign(SignConfig),

    /// Rewrite the image tags of an HTML file to stdout
    Rewrite(RewriteConfig),
}

/// Options of the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "BITBLT_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "BITBLT_PORT")]
    pub port: u16,

    /// Directory served as the wrapped application.
    #[arg(long, default_value = ".", env = "BITBLT_ROOT")]
    pub root: PathBuf,

    // =========================================================================
    // Middleware Configuration
    // =========================================================================
    /// Secret used to sign resize directives.
    #[arg(long, env = "BITBLT_SECRET")]
    pub secret: Option<String>,

    /// Encoder quality for resized images (1-100).
    #[arg(long, default_value_t = DEFAULT_QUALITY, env = "BITBLT_QUALITY")]
    pub quality: u8,

    /// Resize filter. Unknown names fall back to antialias.
    #[arg(long, default_value = "antialias", env = "BITBLT_FILTER")]
    pub filter: String,

    /// Only rewrite images served from the application itself.
    #[arg(long, default_value_t = false, env = "BITBLT_LIMIT_TO_APP_URL")]
    pub limit_to_app_url: bool,

    /// Application URL used with --limit-to-app-url.
    ///
    /// If not specified, it is derived from each request's Host header.
    #[arg(long, env = "BITBLT_APP_URL")]
    pub app_url: Option<String>,

    /// Try strict XHTML parsing before falling back to lenient HTML.
    #[arg(long, default_value_t = false, env = "BITBLT_XHTML")]
    pub xhtml: bool,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Directory for cached transforms. Takes precedence over --cache-memory.
    #[arg(long, env = "BITBLT_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// In-memory cache capacity in bytes.
    #[arg(long, env = "BITBLT_CACHE_MEMORY")]
    pub cache_memory: Option<usize>,

    /// Largest response body, in bytes, that is rewritten or resized.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_SIZE, env = "BITBLT_MAX_BODY_SIZE")]
    pub max_body_size: usize,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Middleware configuration without a cache; the caller attaches one.
    pub fn bitblt_config(&self) -> BitbltConfig {
        BitbltConfig {
            secret: self.secret.clone(),
            quality: self.quality,
            filter: ResizeFilter::parse_lenient(&self.filter),
            limit_to_application_url: self.limit_to_app_url,
            app_url: self.app_url.clone(),
            xhtml: self.xhtml,
            cache: None,
            max_body_size: self.max_body_size,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bitblt_config().validate()
    }
}

/// Output format for the `sign` command.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignOutputFormat {
    /// Directive segment only
    #[default]
    Segment,

    /// JSON object with width, height, signature and segment
    Json,
}

/// Options of the `sign` command.
#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    /// Secret used to sign resize directives.
    #[arg(long, env = "BITBLT_SECRET")]
    pub secret: Option<String>,

    /// Target width in pixels.
    #[arg(long)]
    pub width: Option<u32>,

    /// Target height in pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Segment)]
    pub format: SignOutputFormat,
}

impl SignConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(()),
            _ => Err(ConfigError::MissingSecret),
        }
    }
}

/// Options of the `rewrite` command.
#[derive(Args, Debug, Clone)]
pub struct RewriteConfig {
    /// HTML file to rewrite.
    pub input: PathBuf,

    /// Secret used to sign resize directives.
    #[arg(long, env = "BITBLT_SECRET")]
    pub secret: Option<String>,

    /// Only rewrite images that are relative or start with this URL.
    #[arg(long)]
    pub app_url: Option<String>,

    /// Try strict XHTML parsing before falling back to lenient HTML.
    #[arg(long, default_value_t = false)]
    pub xhtml: bool,
}

impl RewriteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        BitbltConfig {
            secret: self.secret.clone(),
            app_url: self.app_url.clone(),
            ..BitbltConfig::default()
        }
        .validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
