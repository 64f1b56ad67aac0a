//! Image backend trait and shared error type.
//!
//! The [`ImageBackend`] trait covers the three file-level operations the rest
//! of the crate needs: identify, thumbnail and crop. The production
//! implementation is [`RustBackend`](super::rust_backend::RustBackend); tests
//! swap in the recording `MockBackend` below so ingestion and caching logic can
//! be exercised without decoding a single pixel.

use super::decode::ImageKind;
use super::params::{CropParams, ThumbnailParams};
use super::pixels::Rect;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Unsupported or corrupt source bytes.
    #[error("Decode failed: {0}")]
    Decode(String),
    /// An animated container with no frames at all.
    #[error("Animated image contains no frames")]
    EmptyFrame,
    /// Encoder failure or unsupported target kind.
    #[error("Encode failed: {0}")]
    Encode(String),
    /// Crop rectangle not fully inside the source (includes inverted rects).
    #[error("Crop {rect} is not contained within image bounds {bounds}")]
    OutOfBounds { rect: Rect, bounds: Rect },
    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// File-level image operations.
///
/// Implementations must be `Sync`: thumbnail rebuilds fan out over rayon.
pub trait ImageBackend: Sync {
    /// Sniff the kind and read the pixel dimensions of a stored image.
    fn identify(&self, path: &Path) -> Result<(ImageKind, Dimensions), ImagingError>;

    /// Decode the first frame, center-square crop, resize and encode.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), ImagingError>;

    /// Crop a rectangle out of the source (every frame for animated GIFs).
    fn crop(&self, params: &CropParams) -> Result<(), ImagingError>;
}
