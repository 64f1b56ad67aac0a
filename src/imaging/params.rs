//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides which derivatives to create) and the
//! [`backend`](super::backend) (which does the pixel work).
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 100). Clamped on construction.
//! - [`ThumbnailParams`]: source, output path, square side, quality.
//! - [`CropParams`]: source, output path, crop rectangle, quality.

use super::pixels::Rect;
use std::path::PathBuf;

/// Quality setting for lossy encoding (1-100). Only JPEG output uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Parameters for a thumbnail: center-square crop, then resize to `size`×`size`.
///
/// The output kind is taken from the output path's extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub size: u32,
    pub quality: Quality,
}

/// Parameters for a rectangle crop. The output keeps the source kind.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub rect: Rect,
    pub quality: Quality,
}
