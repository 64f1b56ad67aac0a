//! CLI output formatting.
//!
//! # Entry Display Contract
//!
//! Every entry is identified by its public id and title. Details follow as
//! indented context lines, so a listing reads as an inventory and `show`
//! reads as the same entry expanded.
//!
//! # Output Format
//!
//! ## show
//!
//! ```text
//! 5cK Red Panda
//!     Kind: jpeg
//!     Keywords: red panda
//!     Collection: zoo
//!     Image: /5cK.jpg
//!     Thumbnail: /t/5cK.jpg
//! ```
//!
//! ## list / search
//!
//! ```text
//! Search: red panda (2 matches)
//! 001 5cK Red Panda
//! 002 5cL Red Panda [gif]
//! ```
//!
//! ## import
//!
//! ```text
//! Imported 5cK red panda
//!     Source: incoming/red-panda.jpg
//! Skipped incoming/broken.gif
//!     Reason: Decode failed: ...
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! [`EntryView`] is also the `--json` shape.

use crate::base62::IdCodec;
use crate::catalog::{CatalogEntry, EntryKind};
use crate::ingest::{ImportEvent, ImportSummary};
use crate::storage::ThumbStats;
use serde::Serialize;
use std::path::Path;

// ============================================================================
// View model
// ============================================================================

/// An entry as clients see it: public id plus the URLs it is served under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub id: i64,
    pub public_id: String,
    pub kind: EntryKind,
    pub title: String,
    pub keywords: String,
    pub collection_name: String,
    pub submitter: String,
    pub source_url: Option<String>,
    pub redirect_to: Option<String>,
    pub is_clean: bool,
    pub image_url: String,
    pub thumb_url: String,
}

impl EntryView {
    pub fn new(entry: &CatalogEntry, codec: &IdCodec) -> Self {
        let public_id = codec.public_id(entry.id).unwrap_or_default();
        let (image_url, thumb_url) = view_urls(entry, &public_id);
        Self {
            id: entry.id,
            kind: entry.kind,
            title: entry.title.clone(),
            keywords: entry.keywords.clone(),
            collection_name: entry.collection_name.clone(),
            submitter: entry.submitter.clone(),
            source_url: entry.source_url.clone(),
            redirect_to: entry.redirect_to_id.and_then(|id| codec.public_id(id)),
            is_clean: entry.is_clean,
            image_url,
            thumb_url,
            public_id,
        }
    }

    pub fn list(entries: &[CatalogEntry], codec: &IdCodec) -> Vec<Self> {
        entries.iter().map(|e| Self::new(e, codec)).collect()
    }
}

/// Image and thumbnail URLs. Links point at the video host; stored images
/// at `/<public id><ext>` and `/t/<public id><thumb ext>`.
fn view_urls(entry: &CatalogEntry, public_id: &str) -> (String, String) {
    let source = entry.source_url.as_deref().unwrap_or_default();
    match entry.kind.image_kind() {
        Some(kind) => (
            format!("/{public_id}{}", kind.extension()),
            format!("/t/{public_id}{}", kind.thumbnail_kind().extension()),
        ),
        None if entry.kind == EntryKind::Youtube => (
            format!("//www.youtube.com/embed/{source}"),
            format!("//i1.ytimg.com/vi/{source}/hqdefault.jpg"),
        ),
        None => {
            let hash = Path::new(source)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            (
                format!("//i.imgur.com/{hash}.mp4"),
                format!("//i.imgur.com/{hash}b.jpg"),
            )
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

/// One listing line: index, public id, title, and the kind unless it is JPEG.
///
/// ```text
/// 001 5cK Red Panda
/// 002 5cL Dancing [gif]
/// ```
fn entry_line(index: usize, view: &EntryView) -> String {
    let title = if view.title.is_empty() {
        "(untitled)"
    } else {
        view.title.as_str()
    };
    match view.kind {
        EntryKind::Jpeg => format!("{} {} {}", format_index(index), view.public_id, title),
        kind => format!(
            "{} {} {} [{}]",
            format_index(index),
            view.public_id,
            title,
            kind
        ),
    }
}

// ============================================================================
// show
// ============================================================================

/// Full detail for one entry.
pub fn format_entry(view: &EntryView) -> Vec<String> {
    let mut lines = vec![format!("{} {}", view.public_id, view.title)];
    let detail = |label: &str, value: &str| format!("{}{}: {}", indent(1), label, value);

    lines.push(detail("Kind", view.kind.as_str()));
    if !view.keywords.is_empty() {
        lines.push(detail("Keywords", &truncate(&view.keywords, 80)));
    }
    if !view.collection_name.is_empty() {
        lines.push(detail("Collection", &view.collection_name));
    }
    if !view.submitter.is_empty() {
        lines.push(detail("Submitter", &view.submitter));
    }
    if let Some(source) = &view.source_url {
        lines.push(detail("Source", source));
    }
    if let Some(target) = &view.redirect_to {
        lines.push(detail("Redirects to", target));
    }
    if view.is_clean {
        lines.push(detail("Clean", "yes"));
    }
    lines.push(detail("Image", &view.image_url));
    lines.push(detail("Thumbnail", &view.thumb_url));
    lines
}

pub fn print_entry(view: &EntryView) {
    for line in format_entry(view) {
        println!("{}", line);
    }
}

// ============================================================================
// list / search
// ============================================================================

pub fn format_entry_list(views: &[EntryView]) -> Vec<String> {
    if views.is_empty() {
        return vec!["No entries".to_string()];
    }
    views
        .iter()
        .enumerate()
        .map(|(i, view)| entry_line(i + 1, view))
        .collect()
}

pub fn print_entry_list(views: &[EntryView]) {
    for line in format_entry_list(views) {
        println!("{}", line);
    }
}

/// Search header followed by the winning entries.
pub fn format_search_results(query: &[String], views: &[EntryView]) -> Vec<String> {
    let noun = if views.len() == 1 { "match" } else { "matches" };
    let mut lines = vec![format!(
        "Search: {} ({} {})",
        query.join(" "),
        views.len(),
        noun
    )];
    if !views.is_empty() {
        lines.extend(format_entry_list(views));
    }
    lines
}

pub fn print_search_results(query: &[String], views: &[EntryView]) {
    for line in format_search_results(query, views) {
        println!("{}", line);
    }
}

/// Pretty JSON array for `--json`.
pub fn format_json(views: &[EntryView]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(views)
}

// ============================================================================
// import / thumbs
// ============================================================================

/// Format a single import progress event as display lines.
pub fn format_import_event(event: &ImportEvent, codec: &IdCodec) -> Vec<String> {
    match event {
        ImportEvent::Imported { path, id, title } => vec![
            format!(
                "Imported {} {}",
                codec.public_id(*id).unwrap_or_default(),
                title
            ),
            format!("{}Source: {}", indent(1), path.display()),
        ],
        ImportEvent::Skipped { path, reason } => vec![
            format!("Skipped {}", path.display()),
            format!("{}Reason: {}", indent(1), reason),
        ],
    }
}

pub fn format_import_summary(summary: &ImportSummary) -> Vec<String> {
    vec![format!(
        "Imported {}, skipped {}",
        summary.imported, summary.skipped
    )]
}

pub fn print_import_summary(summary: &ImportSummary) {
    for line in format_import_summary(summary) {
        println!("{}", line);
    }
}

pub fn format_thumb_stats(stats: &ThumbStats) -> Vec<String> {
    vec![format!("Thumbnails: {}", stats)]
}

pub fn print_thumb_stats(stats: &ThumbStats) {
    for line in format_thumb_stats(stats) {
        println!("{}", line);
    }
}
