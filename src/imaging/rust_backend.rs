//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff (JPEG, PNG, GIF) | `image::guess_format` |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Decode | `image` decoders, GIF frames via `AnimationDecoder` |
//! | Resize | `image::imageops::resize` with `Lanczos3` |
//! | Encode | `JpegEncoder` / `PngEncoder` / `GifEncoder` |
//!
//! Outputs are fully encoded in memory before anything touches the target
//! path, then written with [`write_atomic`], so a failed operation never
//! leaves a partial file behind.

use super::backend::{Dimensions, ImageBackend, ImagingError};
use super::decode::{ImageKind, decode_animation, decode_first_frame};
use super::encode::{encode, encode_animation};
use super::params::{CropParams, ThumbnailParams};
use super::transform::{crop_animation, rect_crop, thumbnail};
use crate::storage::write_atomic;
use image::ImageReader;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind to encode a derivative as, taken from the output file's extension.
fn output_kind(path: &Path) -> Result<ImageKind, ImagingError> {
    ImageKind::from_extension(path).ok_or_else(|| {
        ImagingError::Encode(format!("Unsupported output format: {}", path.display()))
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<(ImageKind, Dimensions), ImagingError> {
        let bytes = std::fs::read(path)?;
        let kind = ImageKind::sniff(&bytes)?;
        let (width, height) = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| ImagingError::Decode(format!("{}: {e}", path.display())))?;
        Ok((kind, Dimensions { width, height }))
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), ImagingError> {
        let kind = output_kind(&params.output)?;
        let bytes = std::fs::read(&params.source)?;
        let (buf, _) = decode_first_frame(&bytes)?;
        let thumb = thumbnail(&buf, params.size)?;
        let encoded = encode(&thumb, kind, params.quality)?;
        debug!(
            source = %params.source.display(),
            output = %params.output.display(),
            bytes = encoded.len(),
            "thumbnail encoded"
        );
        write_atomic(&params.output, &encoded)?;
        Ok(())
    }

    fn crop(&self, params: &CropParams) -> Result<(), ImagingError> {
        let bytes = std::fs::read(&params.source)?;
        let kind = ImageKind::sniff(&bytes)?;

        let encoded = match kind {
            ImageKind::Gif => {
                let frames = decode_animation(&bytes)?;
                debug!(frames = frames.len(), rect = %params.rect, "cropping animation");
                encode_animation(&crop_animation(&frames, params.rect)?)?
            }
            ImageKind::Jpeg | ImageKind::Png => {
                let (buf, _) = decode_first_frame(&bytes)?;
                let cropped = rect_crop(&buf, params.rect)?;
                encode(&cropped.rebased(), kind, params.quality)?
            }
        };

        write_atomic(&params.output, &encoded)?;
        Ok(())
    }
}
