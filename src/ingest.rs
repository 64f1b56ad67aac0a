//! Getting images into the catalog, and the derivative work that follows.
//!
//! [`Pipeline`] ties a [`CatalogStore`], a [`Storage`] layout and an
//! [`ImageBackend`] together. Every flow that creates an entry follows the
//! same order:
//!
//! 1. Decode the first frame. Corrupt or unsupported bytes fail here, before
//!    the catalog is touched.
//! 2. Insert the catalog row, which assigns the id.
//! 3. Write the source file atomically under that id. If this fails the row
//!    is deleted again, so the catalog never points at a missing file.
//! 4. Generate the thumbnail. A failure here is logged and the entry is kept;
//!    `rehost thumbs` retries it.
//!
//! ## Links
//!
//! YouTube watch pages and imgur `.gifv` pages are catalogued as references:
//! the entry stores the video id (or imgur hash) in `source_url` and has no
//! file on disk. Any other http(s) URL given to [`Pipeline::ingest_url`] is
//! downloaded through a [`Fetcher`] and stored like an upload.
//!
//! ## Parallel thumbnails
//!
//! [`rebuild_thumbnails`] is a free function over a slice of entries rather
//! than a `Pipeline` method: the catalog connection is not `Sync`, and the
//! rebuild only needs paths and the backend.

use crate::catalog::{CatalogEntry, CatalogError, CatalogStore, EntryKind};
use crate::fetch::{FetchError, Fetcher};
use crate::imaging::{
    ImageBackend, ImageKind, ImagingError, Rect, ThumbnailConfig, ThumbnailOutcome, create_crop,
    create_thumbnail, decode_first_frame, ensure_thumbnail,
};
use crate::keywords::title_to_keywords;
use crate::storage::{Storage, ThumbStats, write_atomic};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Image error: {0}")]
    Imaging(#[from] ImagingError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unrecognized link '{0}': expected a YouTube watch URL or an imgur .gifv URL")]
    UnrecognizedLink(String),
    #[error("No entry with id {0}")]
    NotFound(i64),
    #[error("Entry {0} is a link, not a stored image")]
    NotAnImage(i64),
}

/// Extensions picked up by [`Pipeline::import_dir`].
pub const IMPORT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Metadata for a new entry. The kind always comes from the bytes or link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewImage {
    pub title: String,
    /// Explicit keywords. When absent or blank they are derived from the title.
    pub keywords: Option<String>,
    pub collection_name: String,
    pub submitter: String,
    pub source_url: Option<String>,
}

impl NewImage {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    fn into_entry(self, kind: EntryKind) -> CatalogEntry {
        let keywords = match self.keywords.as_deref() {
            Some(words) if !words.trim().is_empty() => title_to_keywords(words),
            _ => title_to_keywords(&self.title),
        };
        CatalogEntry {
            source_url: self.source_url,
            collection_name: self.collection_name,
            submitter: self.submitter,
            keywords,
            ..CatalogEntry::new(kind, &self.title)
        }
    }
}

/// Progress of a bulk import, sent as each file is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    Imported { path: PathBuf, id: i64, title: String },
    Skipped { path: PathBuf, reason: String },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: u32,
    pub skipped: u32,
}

/// Work out what a link points at.
///
/// Returns the entry kind and the value stored as its `source_url`: the
/// YouTube video id or the imgur hash.
pub fn classify_link(link: &str) -> Result<(EntryKind, String), IngestError> {
    let url = Url::parse(link)?;
    let unrecognized = || IngestError::UnrecognizedLink(link.to_string());

    if !matches!(url.scheme(), "http" | "https") {
        return Err(unrecognized());
    }

    match url.host_str() {
        Some("www.youtube.com") => {
            if url.path() != "/watch" {
                return Err(unrecognized());
            }
            let video = url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
                .filter(|v| !v.is_empty())
                .ok_or_else(unrecognized)?;
            Ok((EntryKind::Youtube, video))
        }
        Some("i.imgur.com") => {
            let path = Path::new(url.path());
            if path.extension().and_then(|e| e.to_str()) != Some("gifv") {
                return Err(unrecognized());
            }
            let hash = path
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .ok_or_else(unrecognized)?;
            Ok((EntryKind::ImgurGifv, hash.to_string()))
        }
        _ => Err(unrecognized()),
    }
}

/// Title for an imported file: the stem with `-` and `_` read as spaces.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace(['-', '_'], " "))
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn is_importable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMPORT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Catalog, storage and backend used together.
pub struct Pipeline<'a, S, B> {
    store: &'a S,
    storage: &'a Storage,
    backend: &'a B,
    thumbnails: ThumbnailConfig,
}

impl<'a, S: CatalogStore, B: ImageBackend> Pipeline<'a, S, B> {
    pub fn new(
        store: &'a S,
        storage: &'a Storage,
        backend: &'a B,
        thumbnails: ThumbnailConfig,
    ) -> Self {
        Self {
            store,
            storage,
            backend,
            thumbnails,
        }
    }

    fn get(&self, id: i64) -> Result<CatalogEntry, IngestError> {
        self.store.get_by_id(id)?.ok_or(IngestError::NotFound(id))
    }

    fn image_kind_of(entry: &CatalogEntry) -> Result<ImageKind, IngestError> {
        entry
            .kind
            .image_kind()
            .ok_or(IngestError::NotAnImage(entry.id))
    }

    /// Thumbnail a freshly stored entry, keeping the entry if it fails.
    fn thumbnail_new(&self, id: i64, kind: ImageKind) {
        let source = self.storage.image_path(id, kind);
        let output = self.storage.thumb_path(id, kind);
        if let Err(e) = ensure_thumbnail(self.backend, &source, &output, &self.thumbnails) {
            warn!(id, error = %e, "thumbnail failed; entry kept");
        }
    }

    /// Store an uploaded image.
    pub fn ingest_bytes(&self, bytes: &[u8], new: NewImage) -> Result<CatalogEntry, IngestError> {
        let (frame, kind) = decode_first_frame(bytes)?;
        debug!(kind = %kind, width = frame.width(), height = frame.height(), "decoded upload");

        self.storage.ensure_dirs()?;
        let mut entry = new.into_entry(kind.into());
        let id = self.store.create(&mut entry)?;

        let path = self.storage.image_path(id, kind);
        if let Err(e) = write_atomic(&path, bytes) {
            warn!(id, error = %e, "storing source failed; removing catalog row");
            if let Err(del) = self.store.delete(id) {
                warn!(id, error = %del, "could not remove catalog row");
            }
            return Err(e.into());
        }
        info!(id, kind = %kind, bytes = bytes.len(), "stored image");

        self.thumbnail_new(id, kind);
        Ok(entry)
    }

    /// Store the image file at `path`.
    pub fn ingest_file(&self, path: &Path, new: NewImage) -> Result<CatalogEntry, IngestError> {
        let bytes = std::fs::read(path)?;
        self.ingest_bytes(&bytes, new)
    }

    /// Catalog a video link.
    ///
    /// With `kind` set, `link` is taken as the already-extracted video id or
    /// imgur hash. Without it, `link` must be a URL [`classify_link`] knows.
    pub fn add_link(
        &self,
        link: &str,
        kind: Option<EntryKind>,
        mut new: NewImage,
    ) -> Result<CatalogEntry, IngestError> {
        let (kind, source) = match kind {
            Some(kind) if kind.is_link() => (kind, link.to_string()),
            Some(_) => return Err(IngestError::UnrecognizedLink(link.to_string())),
            None => classify_link(link)?,
        };
        new.source_url = Some(source);
        let mut entry = new.into_entry(kind);
        let id = self.store.create(&mut entry)?;
        info!(id, kind = %kind, "catalogued link");
        Ok(entry)
    }

    /// Submit a URL.
    ///
    /// Links [`classify_link`] recognizes become references, and any other
    /// `www.youtube.com` URL is rejected. Everything else is downloaded with
    /// `fetcher` and stored like an upload, keeping the URL as `source_url`
    /// unless one was given.
    pub fn ingest_url<F: Fetcher>(
        &self,
        fetcher: &F,
        link: &str,
        mut new: NewImage,
    ) -> Result<CatalogEntry, IngestError> {
        let url = Url::parse(link)?;
        match classify_link(link) {
            Ok(_) => return self.add_link(link, None, new),
            Err(IngestError::UnrecognizedLink(_)) if url.host_str() != Some("www.youtube.com") => {}
            Err(e) => return Err(e),
        }

        let bytes = fetcher.fetch(&url)?;
        debug!(url = %url, bytes = bytes.len(), "downloaded source");
        new.source_url.get_or_insert_with(|| link.to_string());
        self.ingest_bytes(&bytes, new)
    }

    /// Import every image under `dir`, in file-name order.
    ///
    /// Files that cannot be read or decoded are skipped with a warning.
    /// Catalog failures abort the import.
    pub fn import_dir(
        &self,
        dir: &Path,
        collection_name: &str,
        events: Option<Sender<ImportEvent>>,
    ) -> Result<ImportSummary, IngestError> {
        let mut summary = ImportSummary::default();
        let emit = |event: ImportEvent| {
            if let Some(tx) = &events {
                tx.send(event).ok();
            }
        };

        for item in WalkDir::new(dir).sort_by_file_name() {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    summary.skipped += 1;
                    emit(ImportEvent::Skipped {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let path = item.path();
            if !item.file_type().is_file() || !is_importable(path) {
                continue;
            }

            let new = NewImage {
                title: title_from_path(path),
                collection_name: collection_name.to_string(),
                ..NewImage::default()
            };
            match self.ingest_file(path, new) {
                Ok(entry) => {
                    summary.imported += 1;
                    emit(ImportEvent::Imported {
                        path: path.to_path_buf(),
                        id: entry.id,
                        title: entry.title,
                    });
                }
                Err(IngestError::Catalog(e)) => return Err(e.into()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    summary.skipped += 1;
                    emit(ImportEvent::Skipped {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(imported = summary.imported, skipped = summary.skipped, "import finished");
        Ok(summary)
    }

    /// Crop `rect` out of entry `id` into a new entry with the same metadata.
    ///
    /// Animated GIFs keep every frame. The crop is staged in `tmp/` and only
    /// moved into `store/` once it has an id.
    pub fn crop_entry(&self, id: i64, rect: Rect) -> Result<CatalogEntry, IngestError> {
        let original = self.get(id)?;
        let kind = Self::image_kind_of(&original)?;
        self.storage.ensure_dirs()?;

        let staged = tempfile::Builder::new()
            .prefix("crop-")
            .suffix(kind.extension())
            .tempfile_in(self.storage.tmp_dir())?
            .into_temp_path();
        create_crop(
            self.backend,
            &self.storage.image_path(id, kind),
            &staged,
            rect,
            self.thumbnails.quality,
        )?;

        let mut entry = CatalogEntry {
            id: 0,
            redirect_to_id: None,
            ..original
        };
        let new_id = self.store.create(&mut entry)?;
        if let Err(e) = staged.persist(self.storage.image_path(new_id, kind)) {
            warn!(id = new_id, error = %e.error, "storing crop failed; removing catalog row");
            if let Err(del) = self.store.delete(new_id) {
                warn!(id = new_id, error = %del, "could not remove catalog row");
            }
            return Err(e.error.into());
        }
        info!(from = id, id = new_id, rect = %rect, "stored crop");

        self.thumbnail_new(new_id, kind);
        Ok(entry)
    }

    /// Remove an entry and any files it owns.
    pub fn delete_entry(&self, id: i64) -> Result<CatalogEntry, IngestError> {
        let entry = self.get(id)?;
        self.store.delete(id)?;
        if let Some(kind) = entry.kind.image_kind() {
            self.storage.remove_files(id, kind)?;
        }
        info!(id, "deleted entry");
        Ok(entry)
    }

    /// Thumbnail path for entry `id`, generating it if missing (or always, with `force`).
    pub fn thumbnail_for(
        &self,
        id: i64,
        force: bool,
    ) -> Result<(PathBuf, ThumbnailOutcome), IngestError> {
        let entry = self.get(id)?;
        let kind = Self::image_kind_of(&entry)?;
        let source = self.storage.image_path(id, kind);
        let output = self.storage.thumb_path(id, kind);
        let outcome = if force {
            create_thumbnail(self.backend, &source, &output, &self.thumbnails)?
        } else {
            ensure_thumbnail(self.backend, &source, &output, &self.thumbnails)?
        };
        Ok((output, outcome))
    }

    /// Fill in keywords for entries that have none. Returns how many changed.
    pub fn backfill_keywords(&self) -> Result<usize, IngestError> {
        let mut updated = 0;
        for mut entry in self.store.list_all()? {
            if !entry.keywords.trim().is_empty() {
                continue;
            }
            entry.keywords = title_to_keywords(&entry.title);
            self.store.update(&entry)?;
            debug!(id = entry.id, keywords = %entry.keywords, "backfilled keywords");
            updated += 1;
        }
        Ok(updated)
    }

    /// Rebuild thumbnails for every stored image, hidden ones included.
    pub fn rebuild_thumbnails(&self, force: bool) -> Result<ThumbStats, IngestError> {
        let entries = self.store.list_all()?;
        self.storage.ensure_dirs()?;
        Ok(rebuild_thumbnails(
            self.backend,
            self.storage,
            &entries,
            &self.thumbnails,
            force,
        ))
    }
}

/// Regenerate thumbnails in parallel. Link entries are ignored.
///
/// Without `force`, existing thumbnails count as cached. Failures are
/// logged and counted; they never stop the rest of the batch.
pub fn rebuild_thumbnails(
    backend: &impl ImageBackend,
    storage: &Storage,
    entries: &[CatalogEntry],
    config: &ThumbnailConfig,
    force: bool,
) -> ThumbStats {
    entries
        .par_iter()
        .filter_map(|entry| entry.kind.image_kind().map(|kind| (entry.id, kind)))
        .map(|(id, kind)| {
            let source = storage.image_path(id, kind);
            let output = storage.thumb_path(id, kind);
            let result = if force {
                create_thumbnail(backend, &source, &output, config)
            } else {
                ensure_thumbnail(backend, &source, &output, config)
            };
            match result {
                Ok(ThumbnailOutcome::Cached) => ThumbStats {
                    cached: 1,
                    ..ThumbStats::default()
                },
                Ok(ThumbnailOutcome::Generated) => ThumbStats {
                    generated: 1,
                    ..ThumbStats::default()
                },
                Err(e) => {
                    warn!(id, error = %e, "thumbnail failed");
                    ThumbStats {
                        failed: 1,
                        ..ThumbStats::default()
                    }
                }
            }
        })
        .reduce(ThumbStats::default, ThumbStats::merge)
}
