//! Decode, resize and re-encode.
//!
//! # Design Decisions
//!
//! - **Source format out**: the output is always encoded in the format the
//!   source was decoded from. Callers never choose the output format.
//!
//! - **Always re-encode**: a request that needs no resize is still decoded and
//!   re-encoded at the configured quality.
//!
//! - **Metadata**: alpha survives because the decoded colour type is kept
//!   through the resize. ICC profiles are carried over by [`super::icc`].

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use tracing::debug;

use super::filter::ResizeFilter;
use super::icc::{embed_icc_profile, extract_icc_profile};
use super::source::{ImageSource, TargetSize};
use crate::error::TransformError;

/// Default encoder quality (1-100).
pub const DEFAULT_QUALITY: u8 = 80;

/// Minimum allowed quality.
pub const MIN_QUALITY: u8 = 1;

/// Maximum allowed quality.
pub const MAX_QUALITY: u8 = 100;

const SUPPORTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

// =============================================================================
// Image Transformer
// =============================================================================

/// Resizes images to a target size in their own format.
///
/// # Example
///
/// ```ignore
/// use bitblt::transform::{ImageTransformer, ResizeFilter, TargetSize};
///
/// let transformer = ImageTransformer::new(85, ResizeFilter::Antialias);
/// let thumb = transformer.transform(jpeg_bytes.into(), TargetSize::new(Some(64), None))?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ImageTransformer {
    quality: u8,
    filter: ResizeFilter,
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY, ResizeFilter::default())
    }
}

impl ImageTransformer {
    /// Create a transformer. Quality is clamped to 1-100.
    pub fn new(quality: u8, filter: ResizeFilter) -> Self {
        Self {
            quality: quality.clamp(MIN_QUALITY, MAX_QUALITY),
            filter,
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn filter(&self) -> ResizeFilter {
        self.filter
    }

    /// Transform a source image to the target size.
    ///
    /// # Errors
    ///
    /// - `UnsupportedImage` if the bytes are not a JPEG, PNG, GIF or WebP image
    ///   or fail to decode
    /// - `Encode` if re-encoding fails
    /// - `Read` if a streamed source cannot be read
    pub fn transform(&self, source: ImageSource, size: TargetSize) -> Result<Bytes, TransformError> {
        let data = source.into_bytes()?;
        let format = detect_format(&data)?;

        let img = image::load_from_memory_with_format(&data, format).map_err(|e| {
            TransformError::UnsupportedImage {
                message: e.to_string(),
            }
        })?;

        let img = match size.resolve(img.width(), img.height()) {
            Some((width, height)) => {
                debug!(
                    from_width = img.width(),
                    from_height = img.height(),
                    to_width = width,
                    to_height = height,
                    filter = %self.filter,
                    "Resizing image"
                );
                img.resize_exact(width, height, self.filter.filter_type())
            }
            None => img,
        };

        let encoded = self.encode(&img, format)?;

        let output = match extract_icc_profile(&data, format) {
            Some(icc) => embed_icc_profile(encoded, format, icc)?,
            None => encoded,
        };

        Ok(Bytes::from(output))
    }

    /// Get image dimensions without fully decoding.
    ///
    /// # Returns
    ///
    /// `(width, height)` in pixels.
    pub fn dimensions(&self, source: &[u8]) -> Result<(u32, u32), TransformError> {
        let format = detect_format(source)?;
        ImageReader::with_format(Cursor::new(source), format)
            .into_dimensions()
            .map_err(|e| TransformError::UnsupportedImage {
                message: e.to_string(),
            })
    }

    fn encode(&self, img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, TransformError> {
        let mut output = Vec::new();

        let result = match format {
            ImageFormat::Jpeg => {
                let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
                if img.color().has_alpha() {
                    encoder.encode_image(&DynamicImage::ImageRgb8(img.to_rgb8()))
                } else {
                    encoder.encode_image(img)
                }
            }
            // Lossless or palette formats ignore quality
            _ => img.write_to(&mut Cursor::new(&mut output), format),
        };

        result.map_err(|e| TransformError::Encode {
            message: e.to_string(),
        })?;

        Ok(output)
    }
}

/// Sniff the container format from magic bytes.
pub fn detect_format(data: &[u8]) -> Result<ImageFormat, TransformError> {
    let format = image::guess_format(data).map_err(|e| TransformError::UnsupportedImage {
        message: e.to_string(),
    })?;

    if SUPPORTED_FORMATS.contains(&format) {
        Ok(format)
    } else {
        Err(TransformError::UnsupportedImage {
            message: format!("format {:?} is not supported", format),
        })
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate a quality setting.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_QUALITY..=MAX_QUALITY).contains(&quality)
}

// =============================================================================
// Tests
// =============================================================================
