//! On-disk layout of stored images and their derivatives.
//!
//! ```text
//! <base>/
//! ├── sqlite.db          catalog
//! ├── store/<id><ext>    original bytes, one file per image entry
//! ├── thumb/<id><ext>    200×200 thumbnails (PNG for GIF sources)
//! └── tmp/               staging for crops before they get an id
//! ```
//!
//! Paths are keyed by the numeric row id, never the public id, so changing
//! the id alphabet or offset never moves a file.
//!
//! ## Thumbnail presence
//!
//! A thumbnail exists when its file exists. Nothing checks content, size or
//! age: a file at the path is trusted. Rebuild with `rehost thumbs --force`
//! after replacing a source by hand.
//!
//! ## Atomic replacement
//!
//! [`write_atomic`] writes into a temporary file created in the destination
//! directory and renames it into place, so readers see either the old file
//! or the complete new one. Two writers racing on the same thumbnail both
//! produce the same bytes from the same immutable source; last rename wins.

use crate::imaging::ImageKind;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const DB_FILENAME: &str = "sqlite.db";
const STORE_DIR: &str = "store";
const THUMB_DIR: &str = "thumb";
const TMP_DIR: &str = "tmp";

/// Deterministic paths under one base folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storage {
    base: PathBuf,
}

impl Storage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn db_path(&self) -> PathBuf {
        self.base.join(DB_FILENAME)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.base.join(STORE_DIR)
    }

    pub fn thumb_dir(&self) -> PathBuf {
        self.base.join(THUMB_DIR)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.base.join(TMP_DIR)
    }

    /// `store/<id><ext>`
    pub fn image_path(&self, id: i64, kind: ImageKind) -> PathBuf {
        self.store_dir().join(format!("{id}{}", kind.extension()))
    }

    /// `thumb/<id><thumb ext>`
    pub fn thumb_path(&self, id: i64, kind: ImageKind) -> PathBuf {
        self.thumb_dir()
            .join(format!("{id}{}", kind.thumbnail_kind().extension()))
    }

    /// Create `store/`, `thumb/` and `tmp/` if missing.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [self.store_dir(), self.thumb_dir(), self.tmp_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn has_thumbnail(&self, id: i64, kind: ImageKind) -> bool {
        self.thumb_path(id, kind).exists()
    }

    /// Delete the stored image and its thumbnail. Missing files are fine.
    pub fn remove_files(&self, id: i64, kind: ImageKind) -> io::Result<()> {
        for path in [self.image_path(id, kind), self.thumb_path(id, kind)] {
            match std::fs::remove_file(&path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Replace `path` with `bytes` in one rename.
///
/// The parent directory must exist. On any error the previous file, if any,
/// is left untouched and the temporary file is removed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Summary of a thumbnail rebuild.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThumbStats {
    pub cached: u32,
    pub generated: u32,
    pub failed: u32,
}

impl ThumbStats {
    pub fn total(&self) -> u32 {
        self.cached + self.generated + self.failed
    }

    pub fn merge(self, other: ThumbStats) -> ThumbStats {
        ThumbStats {
            cached: self.cached + other.cached,
            generated: self.generated + other.generated,
            failed: self.failed + other.failed,
        }
    }
}

impl fmt::Display for ThumbStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cached > 0 || self.failed > 0 {
            write!(
                f,
                "{} cached, {} generated",
                self.cached, self.generated
            )?;
            if self.failed > 0 {
                write!(f, ", {} failed", self.failed)?;
            }
            write!(f, " ({} total)", self.total())
        } else {
            write!(f, "{} generated", self.generated)
        }
    }
}
