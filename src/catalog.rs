//! The catalog: one SQLite table of entries.
//!
//! ## Schema
//!
//! A single `Image` table versioned with `pragma user_version`. Each
//! migration step runs in its own transaction, so a database left at any
//! earlier version (including a brand-new file at version 0) is walked
//! forward one step at a time:
//!
//! | Version | Adds |
//! |---|---|
//! | 1 | `ID` (autoincrement), `Kind`, `Title` |
//! | 2 | `SourceURL`, `RedirectToID`, `IsHidden`, `IsClean` |
//! | 3 | `CollectionName`, `Submitter` |
//! | 4 | `Keywords` |
//!
//! ## Identity
//!
//! Row ids come from SQLite's autoincrement key. [`CatalogStore::create`]
//! with `id <= 0` lets SQLite assign one; a positive id is inserted as-is,
//! which is how restores and tests pin ids. There is no counter file.

use crate::imaging::ImageKind;
use crate::keywords::title_to_keywords;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Unknown entry kind '{0}'")]
    UnknownKind(String),
    #[error("No catalog entry with id {0}")]
    NotFound(i64),
    #[error("Catalog schema version {0} is not a version this program wrote")]
    SchemaVersion(i64),
}

/// What an entry is: a stored image, or a reference to an external video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Jpeg,
    Png,
    Gif,
    Youtube,
    ImgurGifv,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Youtube => "youtube",
            Self::ImgurGifv => "imgur-gifv",
        }
    }

    /// The stored image kind, or `None` for link references.
    pub fn image_kind(self) -> Option<ImageKind> {
        match self {
            Self::Jpeg => Some(ImageKind::Jpeg),
            Self::Png => Some(ImageKind::Png),
            Self::Gif => Some(ImageKind::Gif),
            Self::Youtube | Self::ImgurGifv => None,
        }
    }

    pub fn is_link(self) -> bool {
        self.image_kind().is_none()
    }
}

impl From<ImageKind> for EntryKind {
    fn from(kind: ImageKind) -> Self {
        match kind {
            ImageKind::Jpeg => Self::Jpeg,
            ImageKind::Png => Self::Png,
            ImageKind::Gif => Self::Gif,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            // Rows from before kinds were recorded are GIFs.
            "gif" | "" => Ok(Self::Gif),
            "youtube" => Ok(Self::Youtube),
            "imgur-gifv" => Ok(Self::ImgurGifv),
            other => Err(CatalogError::UnknownKind(other.to_string())),
        }
    }
}

impl ToSql for EntryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EntryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// One catalog row.
///
/// `keywords` is the tokenizer-normalized, space-joined keyword string that
/// search ranks against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub kind: EntryKind,
    pub title: String,
    /// Where the image came from, or the video id for link entries.
    pub source_url: Option<String>,
    pub collection_name: String,
    pub submitter: String,
    pub redirect_to_id: Option<i64>,
    pub is_hidden: bool,
    pub is_clean: bool,
    pub keywords: String,
}

impl CatalogEntry {
    /// An unsaved entry with keywords derived from `title`.
    pub fn new(kind: EntryKind, title: &str) -> Self {
        Self {
            id: 0,
            kind,
            title: title.to_string(),
            source_url: None,
            collection_name: String::new(),
            submitter: String::new(),
            redirect_to_id: None,
            is_hidden: false,
            is_clean: false,
            keywords: title_to_keywords(title),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            title: row.get(2)?,
            source_url: row.get(3)?,
            collection_name: row.get(4)?,
            submitter: row.get(5)?,
            redirect_to_id: row.get(6)?,
            is_hidden: row.get(7)?,
            is_clean: row.get(8)?,
            keywords: row.get(9)?,
        })
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    /// Case-insensitive title, A to Z.
    TitleAsc,
    TitleDesc,
    /// Oldest first.
    IdAsc,
    /// Newest first.
    #[default]
    IdDesc,
}

impl OrderBy {
    pub fn to_sql(self) -> &'static str {
        match self {
            Self::TitleAsc => "ORDER BY Title COLLATE NOCASE ASC",
            Self::TitleDesc => "ORDER BY Title COLLATE NOCASE DESC",
            Self::IdAsc => "ORDER BY ID ASC",
            Self::IdDesc => "ORDER BY ID DESC",
        }
    }
}

/// Which collections a listing draws from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CollectionFilter {
    #[default]
    All,
    /// Exactly one named collection (`""` is the base collection).
    Only(String),
    /// A named collection plus the unnamed base collection.
    WithBase(String),
}

impl CollectionFilter {
    /// Build a filter from user input. No name, or the name `all`, selects
    /// every collection.
    pub fn from_args(name: Option<&str>, include_base: bool) -> Self {
        match name {
            None | Some("all") => Self::All,
            Some(name) if include_base => Self::WithBase(name.to_string()),
            Some(name) => Self::Only(name.to_string()),
        }
    }
}

/// Persistence for catalog entries.
pub trait CatalogStore {
    /// Visible entries matching `filter`, in `order`. Hidden entries are skipped.
    fn list_candidates(
        &self,
        filter: &CollectionFilter,
        order: OrderBy,
    ) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Every entry, hidden ones included, oldest first.
    fn list_all(&self) -> Result<Vec<CatalogEntry>, CatalogError>;

    fn get_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Insert `entry`, writing the assigned id back into it.
    fn create(&self, entry: &mut CatalogEntry) -> Result<i64, CatalogError>;

    fn update(&self, entry: &CatalogEntry) -> Result<(), CatalogError>;

    fn delete(&self, id: i64) -> Result<(), CatalogError>;
}

const COLUMNS: &str =
    "ID, Kind, Title, SourceURL, CollectionName, Submitter, RedirectToID, IsHidden, IsClean, Keywords";

/// Migration batches; index `n` takes the schema from version `n` to `n + 1`.
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS Image (
        ID INTEGER PRIMARY KEY AUTOINCREMENT,
        Kind TEXT NOT NULL,
        Title TEXT NOT NULL
    );",
    "ALTER TABLE Image ADD COLUMN SourceURL TEXT;
     ALTER TABLE Image ADD COLUMN RedirectToID INTEGER;
     ALTER TABLE Image ADD COLUMN IsHidden INTEGER NOT NULL DEFAULT 0;
     ALTER TABLE Image ADD COLUMN IsClean INTEGER NOT NULL DEFAULT 0;",
    "ALTER TABLE Image ADD COLUMN CollectionName TEXT NOT NULL DEFAULT '';
     ALTER TABLE Image ADD COLUMN Submitter TEXT NOT NULL DEFAULT '';",
    "ALTER TABLE Image ADD COLUMN Keywords TEXT NOT NULL DEFAULT '';",
];

/// Current schema version.
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

/// [`CatalogStore`] backed by a single SQLite file.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open (creating if needed) and migrate the database at `path`.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        debug!(path = %path.display(), "opening catalog");
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> Result<Self, CatalogError> {
        migrate(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<i64, CatalogError> {
        user_version(&self.conn)
    }
}

fn user_version(conn: &Connection) -> Result<i64, CatalogError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

fn migrate(conn: &mut Connection) -> Result<(), CatalogError> {
    let mut version = user_version(conn)?;
    if version < 0 {
        return Err(CatalogError::SchemaVersion(version));
    }
    while version < SCHEMA_VERSION {
        let tx = conn.transaction()?;
        tx.execute_batch(MIGRATIONS[version as usize])?;
        tx.pragma_update(None, "user_version", version + 1)?;
        tx.commit()?;
        version += 1;
        debug!(version, "migrated catalog schema");
    }
    Ok(())
}

impl CatalogStore for SqliteCatalog {
    fn list_candidates(
        &self,
        filter: &CollectionFilter,
        order: OrderBy,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let (clause, args): (&str, Vec<&str>) = match filter {
            CollectionFilter::All => ("", vec![]),
            CollectionFilter::Only(name) => (" AND CollectionName = ?1", vec![name.as_str()]),
            CollectionFilter::WithBase(name) => (
                " AND (CollectionName = ?1 OR CollectionName = '')",
                vec![name.as_str()],
            ),
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM Image WHERE IsHidden = 0{clause} {}",
            order.to_sql()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), CatalogEntry::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_all(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM Image ORDER BY ID ASC"))?;
        let rows = stmt.query_map([], CatalogEntry::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_by_id(&self, id: i64) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM Image WHERE ID = ?1"),
                params![id],
                CatalogEntry::from_row,
            )
            .optional()?)
    }

    fn create(&self, entry: &mut CatalogEntry) -> Result<i64, CatalogError> {
        let e = &*entry;
        if e.id <= 0 {
            self.conn.execute(
                "INSERT INTO Image (Kind, Title, SourceURL, CollectionName, Submitter,
                    RedirectToID, IsHidden, IsClean, Keywords)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    e.kind,
                    e.title,
                    e.source_url,
                    e.collection_name,
                    e.submitter,
                    e.redirect_to_id,
                    e.is_hidden,
                    e.is_clean,
                    e.keywords,
                ],
            )?;
        } else {
            self.conn.execute(
                &format!(
                    "INSERT INTO Image ({COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    e.id,
                    e.kind,
                    e.title,
                    e.source_url,
                    e.collection_name,
                    e.submitter,
                    e.redirect_to_id,
                    e.is_hidden,
                    e.is_clean,
                    e.keywords,
                ],
            )?;
        }

        entry.id = self.conn.last_insert_rowid();
        debug!(id = entry.id, kind = %entry.kind, "created catalog entry");
        Ok(entry.id)
    }

    fn update(&self, entry: &CatalogEntry) -> Result<(), CatalogError> {
        let changed = self.conn.execute(
            "UPDATE Image SET Kind = ?2, Title = ?3, SourceURL = ?4, CollectionName = ?5,
                Submitter = ?6, RedirectToID = ?7, IsHidden = ?8, IsClean = ?9, Keywords = ?10
             WHERE ID = ?1",
            params![
                entry.id,
                entry.kind,
                entry.title,
                entry.source_url,
                entry.collection_name,
                entry.submitter,
                entry.redirect_to_id,
                entry.is_hidden,
                entry.is_clean,
                entry.keywords,
            ],
        )?;
        if changed == 0 {
            return Err(CatalogError::NotFound(entry.id));
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<(), CatalogError> {
        let changed = self
            .conn
            .execute("DELETE FROM Image WHERE ID = ?1", params![id])?;
        if changed == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }
}
