//! Image decoding, resizing and re-encoding.
//!
//! - [`ImageTransformer`] resizes an [`ImageSource`] to a [`TargetSize`]
//! - [`ResizeFilter`] selects the resampling algorithm

mod filter;
mod icc;
mod source;
mod transformer;

pub use filter::ResizeFilter;
pub use icc::{embed_icc_profile, extract_icc_profile};
pub use source::{ImageSource, TargetSize};
pub use transformer::{
    detect_format, is_valid_quality, ImageTransformer, DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY,
};
