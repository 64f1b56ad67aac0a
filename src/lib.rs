//! # rehost
//!
//! A personal image-rehosting catalog. Images are stored once under a short
//! public id, get a fixed-size square thumbnail, can be cropped into new
//! entries, and are found again by keyword search.
//!
//! # Architecture: Core and Collaborators
//!
//! The imaging and ranking core is pure: bytes in, pixels or scores out.
//! Everything with state sits around it:
//!
//! ```text
//! bytes ──▶ imaging::decode ──▶ imaging::transform ──▶ imaging::encode ──▶ storage
//!                                                                          ▲
//! title ──▶ keywords ──▶ catalog (SQLite) ◀── search ◀── query             │
//!                           ▲                                              │
//!                           └────────────── ingest ────────────────────────┘
//! ```
//!
//! [`ingest`] is the only module that touches the catalog, the filesystem and
//! the imaging backend together; the binary is a thin clap layer over it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | First-frame decode with GIF compositing, center-square crop, Lanczos resize, rect crop, format-aware encode |
//! | [`keywords`] | Tokenizer shared by titles, stored keywords and queries |
//! | [`search`] | Phrase-proximity ranking; only the top score survives |
//! | [`catalog`] | `CatalogStore` trait and the SQLite implementation |
//! | [`storage`] | Deterministic `store/` and `thumb/` paths, atomic file replacement |
//! | [`base62`] | Row id ↔ short public id |
//! | [`ingest`] | Upload, URL, link, import, crop, delete and thumbnail flows |
//! | [`fetch`] | Blocking HTTP downloads with a deadline and a size cap |
//! | [`config`] | `rehost.toml` loading, merging onto stock defaults, validation |
//! | [`output`] | CLI output formatting and the JSON view model |
//!
//! # Design Decisions
//!
//! ## Eager RGBA
//!
//! Every decoded image is converted to 8-bit RGBA once, right after decode.
//! Crops, compositing and resizes then work on one pixel layout, and the
//! encoder picks the output layout (RGB for JPEG) at the very end.
//!
//! ## Presence-Only Thumbnail Cache
//!
//! A thumbnail is current if its file exists. Sources never change in place
//! (a crop is a new entry), so there is nothing to invalidate. Concurrent
//! requests for the same missing thumbnail may both generate it; both write
//! identical bytes through an atomic rename, so the race is harmless.
//!
//! ## Winners-Only Search
//!
//! Search returns every entry tied at the best score and nothing else. There
//! is no index: the candidate list is re-scored on every query, which is fast
//! enough for a personal catalog and keeps the catalog the single source of
//! truth.
//!
//! ## Ids Are Row Ids
//!
//! Files on disk are named by row id. The public id is derived (offset plus
//! base62) at display time, so changing the alphabet never renames a file.

pub mod base62;
pub mod catalog;
pub mod config;
pub mod fetch;
pub mod imaging;
pub mod ingest;
pub mod keywords;
pub mod output;
pub mod search;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
