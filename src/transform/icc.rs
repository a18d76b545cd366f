//! Colour profile carry-over between source and output.
//!
//! The `image` crate drops embedded ICC profiles on decode, so the profile is
//! read from the source container and written back into the encoded output.

use bytes::Bytes;
use image::ImageFormat;
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::ImageICC;

use crate::error::TransformError;

/// Read the embedded ICC profile of a JPEG, PNG or WebP image.
pub fn extract_icc_profile(data: &[u8], format: ImageFormat) -> Option<Bytes> {
    let data = Bytes::copy_from_slice(data);
    match format {
        ImageFormat::Jpeg => Jpeg::from_bytes(data).ok()?.icc_profile(),
        ImageFormat::Png => Png::from_bytes(data).ok()?.icc_profile(),
        ImageFormat::WebP => WebP::from_bytes(data).ok()?.icc_profile(),
        _ => None,
    }
    .filter(|icc| !icc.is_empty())
}

/// Embed an ICC profile into encoded image bytes.
///
/// Formats without profile support are returned unchanged.
pub fn embed_icc_profile(
    encoded: Vec<u8>,
    format: ImageFormat,
    icc: Bytes,
) -> Result<Vec<u8>, TransformError> {
    let data = Bytes::from(encoded);
    let mut output = Vec::with_capacity(data.len() + icc.len() + 32);

    let written = match format {
        ImageFormat::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(data).map_err(encode_error)?;
            jpeg.set_icc_profile(Some(icc));
            jpeg.encoder().write_to(&mut output)
        }
        ImageFormat::Png => {
            let mut png = Png::from_bytes(data).map_err(encode_error)?;
            png.set_icc_profile(Some(icc));
            png.encoder().write_to(&mut output)
        }
        ImageFormat::WebP => {
            let mut webp = WebP::from_bytes(data).map_err(encode_error)?;
            webp.set_icc_profile(Some(icc));
            webp.encoder().write_to(&mut output)
        }
        _ => return Ok(data.to_vec()),
    };

    written.map_err(encode_error)?;
    Ok(output)
}

fn encode_error(e: impl std::fmt::Display) -> TransformError {
    TransformError::Encode {
        message: format!("failed to embed ICC profile: {}", e),
    }
}
