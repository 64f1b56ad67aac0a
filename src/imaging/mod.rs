//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::guess_format` + header dimensions |
//! | **First frame** | `image` decoders, GIF frames composited until opaque |
//! | **Thumbnail** | center-square crop + Lanczos3 resize |
//! | **Crop** | rectangle crop, every frame for animated GIFs |
//!
//! The module is split into:
//! - **Pixels**: [`PixelBuffer`] and [`Rect`], the RGBA8 raster every stage shares
//! - **Decode / Encode**: bytes to buffers and back
//! - **Calculations / Transform**: rectangle math and pixel transforms
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: cache-aware helpers combining parameters + backend

pub mod backend;
mod calculations;
pub mod decode;
pub mod encode;
pub mod operations;
mod params;
pub mod pixels;
pub mod rust_backend;
pub mod transform;

pub use backend::{Dimensions, ImageBackend, ImagingError};
pub use calculations::{center_square_bounds, crop_fits};
pub use decode::{Frame, ImageKind, decode_animation, decode_first_frame};
pub use encode::{encode, encode_animation};
pub use operations::{
    ThumbnailConfig, ThumbnailOutcome, create_crop, create_thumbnail, ensure_thumbnail,
    get_dimensions,
};
pub use params::{CropParams, Quality, ThumbnailParams};
pub use pixels::{PixelBuffer, Rect};
pub use rust_backend::RustBackend;
pub use transform::{center_square_crop, crop_animation, rect_crop, resize_to, thumbnail};
