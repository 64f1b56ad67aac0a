//! Format-aware encoding of in-memory buffers.
//!
//! | Kind | Encoder |
//! |---|---|
//! | JPEG | `JpegEncoder::new_with_quality`, alpha dropped |
//! | PNG | `PngEncoder`, RGBA8 |
//! | GIF | `GifEncoder`, one frame, or every frame for [`encode_animation`] |
//!
//! Encoders write into a `Vec<u8>`; callers decide where the bytes land.

use super::backend::ImagingError;
use super::decode::{Frame, ImageKind};
use super::params::Quality;
use super::pixels::PixelBuffer;
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{Delay, DynamicImage, ExtendedColorType, ImageEncoder};

fn encode_error(e: image::ImageError) -> ImagingError {
    ImagingError::Encode(e.to_string())
}

/// Encode a single buffer as `kind`. `quality` only affects JPEG.
pub fn encode(buf: &PixelBuffer, kind: ImageKind, quality: Quality) -> Result<Vec<u8>, ImagingError> {
    let (width, height) = (buf.width(), buf.height());
    let mut out = Vec::new();

    match kind {
        ImageKind::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(buf.as_rgba().clone()).to_rgb8();
            // Quality is clamped to 1..=100 on construction.
            JpegEncoder::new_with_quality(&mut out, quality.value() as u8)
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(encode_error)?;
        }
        ImageKind::Png => {
            PngEncoder::new(&mut out)
                .write_image(buf.as_rgba().as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(encode_error)?;
        }
        ImageKind::Gif => {
            let mut encoder = GifEncoder::new(&mut out);
            encoder
                .encode_frame(image::Frame::from_parts(
                    buf.as_rgba().clone(),
                    0,
                    0,
                    Delay::from_numer_denom_ms(0, 1),
                ))
                .map_err(encode_error)?;
        }
    }

    Ok(out)
}

/// Encode frames as a looping GIF, keeping each frame's delay.
pub fn encode_animation(frames: &[Frame]) -> Result<Vec<u8>, ImagingError> {
    if frames.is_empty() {
        return Err(ImagingError::EmptyFrame);
    }

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder.set_repeat(Repeat::Infinite).map_err(encode_error)?;
        for frame in frames {
            let raster = frame.pixels.clone().rebased().into_rgba();
            encoder
                .encode_frame(image::Frame::from_parts(raster, 0, 0, frame.delay))
                .map_err(encode_error)?;
        }
    }
    Ok(out)
}
