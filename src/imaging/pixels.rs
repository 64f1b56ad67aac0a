//! The canonical in-memory raster.
//!
//! Every decoder in [`decode`](super::decode) normalizes eagerly to 8-bit
//! RGBA, so downstream code never dispatches on the source layout. GIF
//! palettes in particular are resolved to concrete colors here, which means
//! resampling can never see palette indices.
//!
//! A [`PixelBuffer`] keeps the absolute origin of its bounds: cutting a
//! sub-image out of a 400×300 buffer at `(50, 0)-(350, 300)` yields a buffer
//! whose [`bounds`](PixelBuffer::bounds) still report `left = 50`. Pixel
//! lookups always use absolute coordinates.

use super::backend::ImagingError;
use image::{DynamicImage, Rgba, RgbaImage};
use std::fmt;

/// Half-open pixel rectangle: `left..right` × `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the origin.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// True for degenerate and inverted rectangles.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// True when `inner` is non-empty and lies entirely within `self`.
    pub fn contains_rect(&self, inner: &Rect) -> bool {
        !inner.is_empty()
            && inner.left >= self.left
            && inner.top >= self.top
            && inner.right <= self.right
            && inner.bottom <= self.bottom
    }

    fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Decoded RGBA pixels plus their absolute position.
///
/// Bounds are never empty; every constructor rejects a zero-sized raster.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    left: u32,
    top: u32,
    pixels: RgbaImage,
}

impl PixelBuffer {
    /// Wrap an RGBA image anchored at the origin.
    pub fn new(pixels: RgbaImage) -> Result<Self, ImagingError> {
        Self::with_origin(pixels, 0, 0)
    }

    pub fn with_origin(pixels: RgbaImage, left: u32, top: u32) -> Result<Self, ImagingError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ImagingError::InvalidDimensions {
                width: pixels.width(),
                height: pixels.height(),
            });
        }
        Ok(Self { left, top, pixels })
    }

    /// Normalize any decoded layout (YCbCr, gray, paletted, 16-bit) to RGBA8.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, ImagingError> {
        Self::new(image.into_rgba8())
    }

    /// A fully transparent buffer covering `bounds`.
    pub fn transparent(bounds: Rect) -> Result<Self, ImagingError> {
        Self::with_origin(
            RgbaImage::new(bounds.width(), bounds.height()),
            bounds.left,
            bounds.top,
        )
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.left,
            self.top,
            self.left + self.pixels.width(),
            self.top + self.pixels.height(),
        )
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Pixel at absolute coordinates, or `None` outside the bounds.
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if !self.bounds().contains_point(x, y) {
            return None;
        }
        Some(*self.pixels.get_pixel(x - self.left, y - self.top))
    }

    fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut Rgba<u8>> {
        if !self.bounds().contains_point(x, y) {
            return None;
        }
        Some(self.pixels.get_pixel_mut(x - self.left, y - self.top))
    }

    /// Copy `rect` (absolute coordinates) into a new buffer that keeps the
    /// rectangle's origin.
    pub fn sub_image(&self, rect: Rect) -> Result<PixelBuffer, ImagingError> {
        let bounds = self.bounds();
        if !bounds.contains_rect(&rect) {
            return Err(ImagingError::OutOfBounds { rect, bounds });
        }
        let view = image::imageops::crop_imm(
            &self.pixels,
            rect.left - self.left,
            rect.top - self.top,
            rect.width(),
            rect.height(),
        );
        Self::with_origin(view.to_image(), rect.left, rect.top)
    }

    /// Draw every non-transparent pixel of `layer` over `self` at matching
    /// absolute coordinates. Pixels of `layer` outside `self` are dropped and
    /// transparent ones leave the existing pixel in place.
    pub fn draw_opaque_pixels(&mut self, layer: &PixelBuffer) {
        for (x, y, pixel) in layer.pixels.enumerate_pixels() {
            if pixel[3] == 0 {
                continue;
            }
            if let Some(dst) = self.pixel_mut(layer.left + x, layer.top + y) {
                *dst = *pixel;
            }
        }
    }

    /// True when every pixel has a non-zero alpha.
    pub fn is_opaque(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] != 0)
    }

    /// Same pixels re-anchored at the origin (used before encoding).
    pub fn rebased(self) -> PixelBuffer {
        Self {
            left: 0,
            top: 0,
            pixels: self.pixels,
        }
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }
}
