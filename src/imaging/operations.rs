//! High-level image operations.
//!
//! These functions decide *whether* a derivative needs work and build the
//! parameters for it; the backend does the pixels.

use super::backend::{Dimensions, ImageBackend, ImagingError};
use super::decode::ImageKind;
use super::params::{CropParams, Quality, ThumbnailParams};
use super::pixels::Rect;
use std::path::Path;
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Get the kind and dimensions of a stored image using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(ImageKind, Dimensions)> {
    backend.identify(path)
}

/// Configuration for thumbnail generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailConfig {
    /// Side of the square thumbnail in pixels.
    pub size: u32,
    pub quality: Quality,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: 200,
            quality: Quality::default(),
        }
    }
}

/// Whether a thumbnail request did any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    Cached,
    Generated,
}

/// Plan a thumbnail operation without executing it.
pub fn plan_thumbnail(source: &Path, output: &Path, config: &ThumbnailConfig) -> ThumbnailParams {
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        size: config.size,
        quality: config.quality,
    }
}

/// Generate the thumbnail unless a file already exists at `output`.
///
/// Presence is the only check; a stale thumbnail is never detected here.
pub fn ensure_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    config: &ThumbnailConfig,
) -> Result<ThumbnailOutcome> {
    if output.exists() {
        debug!(output = %output.display(), "thumbnail cache hit");
        return Ok(ThumbnailOutcome::Cached);
    }
    create_thumbnail(backend, source, output, config)
}

/// Generate the thumbnail unconditionally, replacing any existing file.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    config: &ThumbnailConfig,
) -> Result<ThumbnailOutcome> {
    backend.thumbnail(&plan_thumbnail(source, output, config))?;
    Ok(ThumbnailOutcome::Generated)
}

/// Crop `rect` out of `source` into `output`, keeping the source kind.
pub fn create_crop(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    rect: Rect,
    quality: Quality,
) -> Result<()> {
    backend.crop(&CropParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        rect,
        quality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use tempfile::TempDir;

    #[test]
    fn get_dimensions_calls_backend() {
        let backend = MockBackend::with_dimensions(vec![(
            ImageKind::Jpeg,
            Dimensions {
                width: 1920,
                height: 1080,
            },
        )]);

        let (kind, dims) = get_dimensions(&backend, Path::new("/store/1.jpg")).unwrap();
        assert_eq!(kind, ImageKind::Jpeg);
        assert_eq!((dims.width, dims.height), (1920, 1080));
    }

    #[test]
    fn plan_thumbnail_uses_config() {
        let config = ThumbnailConfig {
            size: 64,
            quality: Quality::new(80),
        };
        let params = plan_thumbnail(Path::new("/store/1.jpg"), Path::new("/thumb/1.jpg"), &config);

        assert_eq!(params.size, 64);
        assert_eq!(params.quality.value(), 80);
        assert_eq!(params.output, Path::new("/thumb/1.jpg"));
    }

    #[test]
    fn default_thumbnail_is_200_square() {
        assert_eq!(ThumbnailConfig::default().size, 200);
    }

    #[test]
    fn ensure_generates_when_missing() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("1.png");
        let backend = MockBackend::writing();

        let outcome = ensure_thumbnail(
            &backend,
            Path::new("/store/1.gif"),
            &output,
            &ThumbnailConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome, ThumbnailOutcome::Generated);
        assert!(output.exists());
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Thumbnail { size: 200, .. }
        ));
    }

    #[test]
    fn ensure_skips_existing_file() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("1.png");
        std::fs::write(&output, b"already here").unwrap();
        let backend = MockBackend::new();

        let outcome = ensure_thumbnail(
            &backend,
            Path::new("/store/1.png"),
            &output,
            &ThumbnailConfig::default(),
        )
        .unwrap();

        assert_eq!(outcome, ThumbnailOutcome::Cached);
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn create_thumbnail_ignores_existing_file() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("1.png");
        std::fs::write(&output, b"stale").unwrap();
        let backend = MockBackend::writing();

        create_thumbnail(
            &backend,
            Path::new("/store/1.png"),
            &output,
            &ThumbnailConfig::default(),
        )
        .unwrap();

        assert_eq!(backend.get_operations().len(), 1);
        assert_eq!(std::fs::read(&output).unwrap(), b"mock");
    }

    #[test]
    fn backend_failure_propagates() {
        let backend = MockBackend {
            fail_on: Some("broken".into()),
            ..MockBackend::default()
        };
        let tmp = TempDir::new().unwrap();

        let result = ensure_thumbnail(
            &backend,
            Path::new("/store/broken.png"),
            &tmp.path().join("x.png"),
            &ThumbnailConfig::default(),
        );
        assert!(matches!(result, Err(ImagingError::Decode(_))));
    }

    #[test]
    fn create_crop_passes_rect_through() {
        let backend = MockBackend::new();
        create_crop(
            &backend,
            Path::new("/store/2.jpg"),
            Path::new("/tmp/2.jpg"),
            Rect::new(1, 2, 30, 40),
            Quality::default(),
        )
        .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Crop {
                source: "/store/2.jpg".into(),
                output: "/tmp/2.jpg".into(),
                rect: Rect::new(1, 2, 30, 40),
            }]
        );
    }
}
