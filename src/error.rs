use thiserror::Error;

/// Errors raised while building the middleware from configuration.
///
/// These are fatal: a middleware that fails validation must not start.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No signing secret was configured
    #[error("Must configure a signing secret")]
    MissingSecret,

    /// Encoder quality outside 1-100
    #[error("Invalid quality: {0} (must be 1-100)")]
    InvalidQuality(u8),

    /// The configured application URL could not be parsed
    #[error("Invalid application URL '{url}': {reason}")]
    InvalidAppUrl { url: String, reason: String },
}

/// Errors produced by the image transformer.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// Source bytes could not be decoded as a supported image
    #[error("Unsupported image: {message}")]
    UnsupportedImage { message: String },

    /// Encoding the resized image failed
    #[error("Failed to encode image: {message}")]
    Encode { message: String },

    /// Reading the source stream failed
    #[error("Failed to read image source: {message}")]
    Read { message: String },
}

/// Errors from a transform cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem error from the disk cache
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level errors surfaced by the middleware.
#[derive(Debug, Error)]
pub enum BitbltError {
    /// A verified directive carried a dimension that is not a valid integer
    #[error("Invalid directive: {reason}")]
    InvalidDirective { reason: String },

    /// Buffering the origin response body failed
    #[error("Failed to read response body: {0}")]
    Body(String),
}
