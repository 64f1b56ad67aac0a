//! Pixel transforms: center-square crop, Lanczos resize and rectangle crop.
//!
//! Everything here works on in-memory [`PixelBuffer`]s; reading and writing
//! files is the backend's job.

use super::backend::ImagingError;
use super::calculations::{center_square_bounds, crop_fits};
use super::decode::Frame;
use super::pixels::{PixelBuffer, Rect};
use image::imageops::{self, FilterType};

/// Cut the largest centered square out of `buf`.
///
/// Square inputs come back as an identical copy.
pub fn center_square_crop(buf: &PixelBuffer) -> Result<PixelBuffer, ImagingError> {
    let bounds = buf.bounds();
    if bounds.width() == bounds.height() {
        return Ok(buf.clone());
    }
    buf.sub_image(center_square_bounds(bounds))
}

/// Resample to exactly `width`×`height` with a Lanczos3 filter.
///
/// The result is anchored at the origin.
pub fn resize_to(buf: &PixelBuffer, width: u32, height: u32) -> Result<PixelBuffer, ImagingError> {
    if width == 0 || height == 0 {
        return Err(ImagingError::InvalidDimensions { width, height });
    }
    let resized = imageops::resize(buf.as_rgba(), width, height, FilterType::Lanczos3);
    PixelBuffer::new(resized)
}

/// Center-square crop followed by a resize to `size`×`size`.
pub fn thumbnail(buf: &PixelBuffer, size: u32) -> Result<PixelBuffer, ImagingError> {
    let square = center_square_crop(buf)?;
    resize_to(&square, size, size)
}

/// Cut `rect` (absolute coordinates) out of `buf`.
pub fn rect_crop(buf: &PixelBuffer, rect: Rect) -> Result<PixelBuffer, ImagingError> {
    let bounds = buf.bounds();
    if !crop_fits(bounds, rect) {
        return Err(ImagingError::OutOfBounds { rect, bounds });
    }
    buf.sub_image(rect)
}

/// Crop every frame of an animation to the same rectangle, keeping delays.
///
/// The rectangle is validated against the first frame's bounds. Cropped
/// frames are re-anchored at the origin so they encode as a standalone
/// animation.
pub fn crop_animation(frames: &[Frame], rect: Rect) -> Result<Vec<Frame>, ImagingError> {
    let first = frames.first().ok_or(ImagingError::EmptyFrame)?;
    let bounds = first.pixels.bounds();
    if !crop_fits(bounds, rect) {
        return Err(ImagingError::OutOfBounds { rect, bounds });
    }

    frames
        .iter()
        .map(|frame| {
            Ok(Frame {
                pixels: frame.pixels.sub_image(rect)?.rebased(),
                delay: frame.delay,
            })
        })
        .collect()
}
