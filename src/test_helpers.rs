//! Shared test utilities for the rehost test suite.
//!
//! Synthetic images are generated in memory with the `image` crate so no
//! binary fixtures need to live in the repository.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let bytes = gif_bytes(&[half_rgba(8, 8, RED, true), half_rgba(8, 8, BLUE, false)], 10);
//! let (buf, kind) = decode_first_frame(&bytes).unwrap();
//! assert!(is_reddish(buf.pixel_at(0, 0).unwrap()));
//! ```

use crate::catalog::{CatalogEntry, EntryKind};
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{Delay, ExtendedColorType, Frame, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

// =========================================================================
// Rasters
// =========================================================================

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];

/// A single-color RGBA image.
pub fn solid_rgba(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// Half of the image filled with `color`, the other half fully transparent.
pub fn half_rgba(width: u32, height: u32, color: [u8; 4], left_half: bool) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| {
        let in_left = x < width / 2;
        if in_left == left_half {
            Rgba(color)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// A smooth gradient, useful where lossy encoders are involved.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

pub fn is_reddish(p: Rgba<u8>) -> bool {
    p[0] > 200 && p[1] < 60 && p[2] < 60 && p[3] == 255
}

pub fn is_greenish(p: Rgba<u8>) -> bool {
    p[1] > 200 && p[0] < 60 && p[2] < 60 && p[3] == 255
}

// =========================================================================
// Encoded bytes
// =========================================================================

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_rgb(width, height);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_rgb(width, height);
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// An animated GIF with one frame per raster, all with the same delay.
pub fn gif_bytes(frames: &[RgbaImage], delay_ms: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        for raster in frames {
            let delay = Delay::from_numer_denom_ms(delay_ms, 1);
            encoder
                .encode_frame(Frame::from_parts(raster.clone(), 0, 0, delay))
                .unwrap();
        }
    }
    out
}

/// A GIF built frame by frame with the `gif` crate, so frames can be
/// sub-rectangles placed anywhere on the `width`×`height` logical screen.
/// Each layer is `(left, top, raster)`; every frame waits 50ms.
pub fn layered_gif_bytes(width: u16, height: u16, layers: &[(u16, u16, RgbaImage)]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut out, width, height, &[]).unwrap();
        for (left, top, raster) in layers {
            let mut rgba = raster.as_raw().clone();
            let mut frame = gif::Frame::from_rgba_speed(
                raster.width() as u16,
                raster.height() as u16,
                &mut rgba,
                10,
            );
            frame.left = *left;
            frame.top = *top;
            frame.delay = 5;
            encoder.write_frame(&frame).unwrap();
        }
    }
    out
}

// =========================================================================
// Catalog entries
// =========================================================================

/// An unsaved entry whose keywords are derived from the title.
pub fn entry(kind: EntryKind, title: &str) -> CatalogEntry {
    CatalogEntry::new(kind, title)
}

/// A saved-looking entry with explicit id and keywords.
pub fn entry_with_keywords(id: i64, keywords: &str) -> CatalogEntry {
    CatalogEntry {
        id,
        keywords: keywords.to_string(),
        ..CatalogEntry::new(EntryKind::Png, keywords)
    }
}
