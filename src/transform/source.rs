use std::fmt;
use std::io::Read;

use bytes::Bytes;

use crate::error::TransformError;

/// Raw image bytes handed to the transformer.
pub enum ImageSource {
    /// Fully buffered bytes
    Buffer(Bytes),

    /// A stream read to the end before decoding
    Reader(Box<dyn Read + Send>),
}

impl ImageSource {
    /// Read the whole source into memory.
    pub fn into_bytes(self) -> Result<Bytes, TransformError> {
        match self {
            ImageSource::Buffer(bytes) => Ok(bytes),
            ImageSource::Reader(mut reader) => {
                let mut data = Vec::new();
                reader
                    .read_to_end(&mut data)
                    .map_err(|e| TransformError::Read {
                        message: e.to_string(),
                    })?;
                Ok(Bytes::from(data))
            }
        }
    }
}

impl From<Bytes> for ImageSource {
    fn from(bytes: Bytes) -> Self {
        ImageSource::Buffer(bytes)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Buffer(Bytes::from(bytes))
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            ImageSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Requested output dimensions. `None` means "derive from the aspect ratio".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TargetSize {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl TargetSize {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    /// Whether at least one dimension is set.
    pub fn is_specified(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    /// Resolve against the source dimensions.
    ///
    /// Returns `None` when no resize is needed. A missing dimension keeps the
    /// source aspect ratio; every resolved dimension is at least one pixel.
    /// Targets larger than the source upscale.
    pub fn resolve(&self, source_width: u32, source_height: u32) -> Option<(u32, u32)> {
        let (width, height) = match (self.width, self.height) {
            (None, None) => return None,
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, scale(source_height, w, source_width)),
            (None, Some(h)) => (scale(source_width, h, source_height), h),
        };
        let resolved = (width.max(1), height.max(1));

        if resolved == (source_width, source_height) {
            None
        } else {
            Some(resolved)
        }
    }
}

/// `value * numerator / denominator`, rounded.
fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return value;
    }
    let scaled = (f64::from(value) * f64::from(numerator) / f64::from(denominator)).round();
    scaled.clamp(1.0, f64::from(u32::MAX)) as u32
}
