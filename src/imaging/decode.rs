//! Source decoding: kind sniffing, the first-frame decoder and full GIF
//! animation decode.
//!
//! ## Representative frame for animated GIFs
//!
//! The first frame of a transparency-heavy animation is often mostly blank.
//! [`decode_first_frame`] instead reads the raw frames (each one only its
//! own sub-rectangle of the logical screen, no disposal applied) and
//! composites them in order onto a canvas with the first frame's bounds,
//! copying only non-transparent pixels. It stops at the first frame after
//! which the canvas is fully opaque. If no frame ever gets there, the canvas
//! after the final frame is returned.
//!
//! [`decode_animation`] is different: it goes through `image`'s
//! `GifDecoder`, whose frames are already composited to the full screen,
//! which is what an animated crop needs.

use super::backend::ImagingError;
use super::pixels::PixelBuffer;
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Delay, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// The closed set of stored image kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    /// Identify the kind from magic bytes. Anything but JPEG/PNG/GIF is a
    /// decode error.
    pub fn sniff(bytes: &[u8]) -> Result<Self, ImagingError> {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Jpeg) => Ok(Self::Jpeg),
            Ok(ImageFormat::Png) => Ok(Self::Png),
            Ok(ImageFormat::Gif) => Ok(Self::Gif),
            Ok(other) => Err(ImagingError::Decode(format!(
                "unsupported image format {other:?}"
            ))),
            Err(e) => Err(ImagingError::Decode(e.to_string())),
        }
    }

    /// Kind implied by a file extension (`jpg`, `jpeg`, `png`, `gif`).
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }

    /// Stored file extension, with the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
            Self::Gif => ".gif",
        }
    }

    /// Thumbnails of GIFs are PNG so a static preview never re-quantizes a palette.
    pub fn thumbnail_kind(self) -> Self {
        match self {
            Self::Gif => Self::Png,
            other => other,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageKind {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            other => Err(ImagingError::Decode(format!("unknown image kind '{other}'"))),
        }
    }
}

/// One decoded animation frame and its display delay.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: PixelBuffer,
    pub delay: Delay,
}

impl Frame {
    fn from_image_frame(frame: image::Frame) -> Result<Self, ImagingError> {
        let (left, top, delay) = (frame.left(), frame.top(), frame.delay());
        Ok(Self {
            pixels: PixelBuffer::with_origin(frame.into_buffer(), left, top)?,
            delay,
        })
    }
}

fn decode_error(e: image::ImageError) -> ImagingError {
    ImagingError::Decode(e.to_string())
}

/// Decode raw bytes into one opaque-as-possible representative buffer.
pub fn decode_first_frame(bytes: &[u8]) -> Result<(PixelBuffer, ImageKind), ImagingError> {
    let kind = ImageKind::sniff(bytes)?;
    let buffer = match kind {
        ImageKind::Gif => composite_frames(raw_gif_frames(bytes)?)?,
        ImageKind::Jpeg | ImageKind::Png => {
            let image =
                image::load_from_memory_with_format(bytes, kind.image_format()).map_err(decode_error)?;
            PixelBuffer::from_dynamic(image)?
        }
    };
    Ok((buffer, kind))
}

fn gif_error(e: gif::DecodingError) -> ImagingError {
    ImagingError::Decode(e.to_string())
}

/// Lazily read raw GIF frames so compositing can stop early.
///
/// Each frame keeps its offset on the logical screen as its origin.
fn raw_gif_frames(
    bytes: &[u8],
) -> Result<impl Iterator<Item = Result<Frame, ImagingError>> + '_, ImagingError> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(bytes)).map_err(gif_error)?;

    Ok(std::iter::from_fn(move || match decoder.read_next_frame() {
        Ok(frame) => frame.map(raw_frame),
        Err(e) => Some(Err(gif_error(e))),
    }))
}

fn raw_frame(frame: &gif::Frame<'_>) -> Result<Frame, ImagingError> {
    let (width, height) = (u32::from(frame.width), u32::from(frame.height));
    let raster = RgbaImage::from_raw(width, height, frame.buffer.to_vec()).ok_or_else(|| {
        ImagingError::Decode(format!("GIF frame buffer does not fill {width}x{height}"))
    })?;
    Ok(Frame {
        pixels: PixelBuffer::with_origin(raster, u32::from(frame.left), u32::from(frame.top))?,
        // GIF delays are in hundredths of a second.
        delay: Delay::from_numer_denom_ms(u32::from(frame.delay) * 10, 1),
    })
}

/// Lazily decode screen-sized, disposal-applied GIF frames.
fn gif_frames(
    bytes: &[u8],
) -> Result<impl Iterator<Item = Result<Frame, ImagingError>> + '_, ImagingError> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(decode_error)?;
    Ok(decoder
        .into_frames()
        .map(|frame| frame.map_err(decode_error).and_then(Frame::from_image_frame)))
}

/// Composite frames until the canvas is fully opaque.
///
/// The canvas takes the first frame's bounds and starts fully transparent.
/// Frames after the one that completes the canvas are never pulled from the
/// iterator.
pub fn composite_frames<I>(frames: I) -> Result<PixelBuffer, ImagingError>
where
    I: IntoIterator<Item = Result<Frame, ImagingError>>,
{
    let mut frames = frames.into_iter();
    let first = frames.next().ok_or(ImagingError::EmptyFrame)??;
    let mut canvas = PixelBuffer::transparent(first.pixels.bounds())?;

    for (index, frame) in std::iter::once(Ok(first)).chain(frames).enumerate() {
        let frame = frame?;
        canvas.draw_opaque_pixels(&frame.pixels);
        if canvas.is_opaque() {
            debug!(frame = index, "canvas fully opaque");
            return Ok(canvas);
        }
    }

    debug!("no frame completed the canvas; using final composite");
    Ok(canvas)
}

/// Decode every frame of a GIF, keeping each frame's delay.
pub fn decode_animation(bytes: &[u8]) -> Result<Vec<Frame>, ImagingError> {
    let frames = gif_frames(bytes)?.collect::<Result<Vec<_>, _>>()?;
    if frames.is_empty() {
        return Err(ImagingError::EmptyFrame);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Rect;
    use crate::test_helpers::*;
    use image::{Rgba, RgbaImage};

    fn frame(img: RgbaImage) -> Result<Frame, ImagingError> {
        Ok(Frame {
            pixels: PixelBuffer::new(img).unwrap(),
            delay: Delay::from_numer_denom_ms(100, 1),
        })
    }

    // =========================================================================
    // Kind sniffing
    // =========================================================================

    #[test]
    fn sniff_recognizes_supported_kinds() {
        assert_eq!(ImageKind::sniff(&jpeg_bytes(8, 8)).unwrap(), ImageKind::Jpeg);
        assert_eq!(ImageKind::sniff(&png_bytes(8, 8)).unwrap(), ImageKind::Png);
        let gif = gif_bytes(&[solid_rgba(4, 4, RED)], 10);
        assert_eq!(ImageKind::sniff(&gif).unwrap(), ImageKind::Gif);
    }

    #[test]
    fn sniff_rejects_garbage() {
        let err = ImageKind::sniff(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ImagingError::Decode(_)));
    }

    #[test]
    fn kind_extensions() {
        assert_eq!(ImageKind::Jpeg.extension(), ".jpg");
        assert_eq!(ImageKind::Gif.thumbnail_kind(), ImageKind::Png);
        assert_eq!(ImageKind::Jpeg.thumbnail_kind(), ImageKind::Jpeg);
        assert_eq!(
            ImageKind::from_extension(Path::new("a/b/12.JPEG")),
            Some(ImageKind::Jpeg)
        );
        assert_eq!(ImageKind::from_extension(Path::new("x.webp")), None);
        assert_eq!("gif".parse::<ImageKind>().unwrap(), ImageKind::Gif);
    }

    // =========================================================================
    // Static decode
    // =========================================================================

    #[test]
    fn decodes_png_directly() {
        let (buf, kind) = decode_first_frame(&png_bytes(40, 30)).unwrap();
        assert_eq!(kind, ImageKind::Png);
        assert_eq!(buf.bounds(), Rect::from_size(40, 30));
    }

    #[test]
    fn decodes_jpeg_directly() {
        let (buf, kind) = decode_first_frame(&jpeg_bytes(64, 48)).unwrap();
        assert_eq!(kind, ImageKind::Jpeg);
        assert_eq!((buf.width(), buf.height()), (64, 48));
        assert!(buf.is_opaque());
    }

    #[test]
    fn truncated_png_is_decode_error() {
        let bytes = png_bytes(40, 30);
        let err = decode_first_frame(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, ImagingError::Decode(_)));
    }

    // =========================================================================
    // Compositing
    // =========================================================================

    #[test]
    fn no_frames_is_empty_frame_error() {
        let err = composite_frames(Vec::<Result<Frame, ImagingError>>::new()).unwrap_err();
        assert!(matches!(err, ImagingError::EmptyFrame));
    }

    #[test]
    fn opaque_first_frame_returns_immediately() {
        let result = composite_frames(vec![
            frame(solid_rgba(4, 4, RED)),
            frame(solid_rgba(4, 4, BLUE)),
        ])
        .unwrap();
        assert_eq!(result.pixel_at(2, 2), Some(Rgba(RED)));
    }

    #[test]
    fn stops_at_first_opaque_composite() {
        // frame 0: left half red; frame 1: right half green → opaque after k = 1.
        // frame 2 (blue) and the error after it must never be consulted.
        let frames = vec![
            frame(half_rgba(4, 4, RED, true)),
            frame(half_rgba(4, 4, GREEN, false)),
            frame(solid_rgba(4, 4, BLUE)),
            Err(ImagingError::Decode("frame 3 must not be read".into())),
        ];
        let result = composite_frames(frames).unwrap();

        assert!(result.is_opaque());
        assert_eq!(result.pixel_at(0, 0), Some(Rgba(RED)));
        assert_eq!(result.pixel_at(3, 3), Some(Rgba(GREEN)));
    }

    #[test]
    fn later_transparency_keeps_previous_pixels() {
        let mut sparse = RgbaImage::new(4, 4);
        sparse.put_pixel(0, 0, Rgba(BLUE));
        let result = composite_frames(vec![
            frame(half_rgba(4, 4, RED, true)),
            frame(sparse),
        ])
        .unwrap();

        assert_eq!(result.pixel_at(0, 0), Some(Rgba(BLUE)));
        assert_eq!(result.pixel_at(1, 3), Some(Rgba(RED)));
        assert_eq!(result.pixel_at(3, 3).map(|p| p[3]), Some(0));
    }

    #[test]
    fn never_opaque_returns_final_canvas() {
        let mut a = RgbaImage::new(3, 1);
        a.put_pixel(0, 0, Rgba(RED));
        let mut b = RgbaImage::new(3, 1);
        b.put_pixel(1, 0, Rgba(GREEN));

        let result = composite_frames(vec![frame(a), frame(b)]).unwrap();
        assert!(!result.is_opaque());
        assert_eq!(result.pixel_at(0, 0), Some(Rgba(RED)));
        assert_eq!(result.pixel_at(1, 0), Some(Rgba(GREEN)));
        assert_eq!(result.pixel_at(2, 0).map(|p| p[3]), Some(0));
    }

    #[test]
    fn canvas_takes_first_frame_bounds() {
        let result = composite_frames(vec![
            frame(half_rgba(6, 2, RED, true)),
            frame(solid_rgba(10, 10, GREEN)),
        ])
        .unwrap();
        assert_eq!(result.bounds(), Rect::from_size(6, 2));
    }

    // =========================================================================
    // GIF end to end
    // =========================================================================

    #[test]
    fn animated_gif_composites_to_opaque_preview() {
        let bytes = gif_bytes(
            &[
                half_rgba(8, 8, RED, true),
                half_rgba(8, 8, GREEN, false),
                solid_rgba(8, 8, BLUE),
            ],
            10,
        );
        let (buf, kind) = decode_first_frame(&bytes).unwrap();

        assert_eq!(kind, ImageKind::Gif);
        assert_eq!(buf.bounds(), Rect::from_size(8, 8));
        assert!(buf.is_opaque());
        assert!(is_reddish(buf.pixel_at(1, 4).unwrap()));
        assert!(is_greenish(buf.pixel_at(6, 4).unwrap()));
    }

    #[test]
    fn sub_rectangle_first_frame_sets_canvas_bounds() {
        // 8x8 screen; frame 0 is an opaque 4x4 in the corner, frame 1 covers
        // the whole screen in blue and must not be composited.
        let bytes = layered_gif_bytes(
            8,
            8,
            &[(0, 0, solid_rgba(4, 4, RED)), (0, 0, solid_rgba(8, 8, BLUE))],
        );
        let (buf, kind) = decode_first_frame(&bytes).unwrap();

        assert_eq!(kind, ImageKind::Gif);
        assert_eq!(buf.bounds(), Rect::from_size(4, 4));
        assert!(is_reddish(buf.pixel_at(0, 0).unwrap()));
        assert!(is_reddish(buf.pixel_at(3, 3).unwrap()));
    }

    #[test]
    fn offset_first_frame_keeps_its_origin() {
        let bytes = layered_gif_bytes(
            10,
            10,
            &[(3, 2, solid_rgba(4, 5, GREEN)), (0, 0, solid_rgba(10, 10, RED))],
        );
        let (buf, _) = decode_first_frame(&bytes).unwrap();

        assert_eq!(buf.bounds(), Rect::new(3, 2, 7, 7));
        assert!(is_greenish(buf.pixel_at(3, 2).unwrap()));
        assert_eq!(buf.pixel_at(0, 0), None);
    }

    #[test]
    fn offset_frames_stop_at_first_opaque_regardless_of_count() {
        // Frame 0 at (2, 2) fills its left half; frame 1 is a 2x4 patch at
        // (4, 2) that fills the right half, so k = 1. Anything after that
        // must leave the result unchanged.
        let base = vec![
            (2, 2, half_rgba(4, 4, RED, true)),
            (4, 2, solid_rgba(2, 4, GREEN)),
        ];
        let expected = {
            let (buf, _) = decode_first_frame(&layered_gif_bytes(8, 8, &base)).unwrap();
            buf
        };
        assert_eq!(expected.bounds(), Rect::new(2, 2, 6, 6));
        assert!(expected.is_opaque());
        assert!(is_reddish(expected.pixel_at(2, 2).unwrap()));
        assert!(is_greenish(expected.pixel_at(5, 5).unwrap()));

        for extra in 1..4 {
            let mut layers = base.clone();
            for _ in 0..extra {
                layers.push((0, 0, solid_rgba(8, 8, BLUE)));
            }
            let (buf, _) = decode_first_frame(&layered_gif_bytes(8, 8, &layers)).unwrap();
            assert_eq!(buf, expected, "with {extra} trailing frames");
        }
    }

    #[test]
    fn offset_pixels_outside_canvas_are_dropped() {
        // Frame 1 lies entirely outside frame 0's bounds, so the canvas never
        // becomes opaque and the final composite equals frame 0.
        let bytes = layered_gif_bytes(
            8,
            8,
            &[(0, 0, half_rgba(4, 4, RED, true)), (4, 4, solid_rgba(4, 4, BLUE))],
        );
        let (buf, _) = decode_first_frame(&bytes).unwrap();

        assert_eq!(buf.bounds(), Rect::from_size(4, 4));
        assert!(!buf.is_opaque());
        assert!(is_reddish(buf.pixel_at(0, 0).unwrap()));
        assert_eq!(buf.pixel_at(3, 3).map(|p| p[3]), Some(0));
    }

    #[test]
    fn raw_frames_carry_delay_in_milliseconds() {
        let bytes = layered_gif_bytes(4, 4, &[(0, 0, solid_rgba(4, 4, RED))]);
        let frame = raw_gif_frames(&bytes).unwrap().next().unwrap().unwrap();
        let (numer, denom) = frame.delay.numer_denom_ms();
        assert_eq!(numer / denom, 50);
    }

    #[test]
    fn decode_animation_keeps_every_frame_and_delay() {
        let bytes = gif_bytes(
            &[
                solid_rgba(5, 5, RED),
                solid_rgba(5, 5, GREEN),
                solid_rgba(5, 5, BLUE),
            ],
            70,
        );
        let frames = decode_animation(&bytes).unwrap();
        assert_eq!(frames.len(), 3);
        for f in &frames {
            let (numer, denom) = f.delay.numer_denom_ms();
            assert_eq!(numer / denom, 70);
            assert_eq!(f.pixels.bounds(), Rect::from_size(5, 5));
        }
    }
}
