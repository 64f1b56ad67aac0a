//! Host configuration.
//!
//! Handles loading, validating, and merging the `rehost.toml` file. Stock
//! defaults form the base layer; the user's file is merged on top of them
//! key by key, so a file only needs the values it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_folder = "."          # Holds sqlite.db, store/, thumb/ and tmp/
//!
//! [thumbnails]
//! size = 200                 # Side of the square thumbnail, in pixels
//!
//! [encoding]
//! jpeg_quality = 100         # JPEG quality for thumbnails and crops (1-100)
//!
//! [ids]
//! offset = 10000             # Added to row ids before base62 encoding
//! alphabet = "shuffled"      # "shuffled", "natural", or 62 literal characters
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//!
//! [fetch]
//! timeout_secs = 30          # Whole-request deadline for image downloads
//! max_bytes = 20971520       # Larger downloads are refused
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::base62::{Base62, IdCodec, IdCodecError, NATURAL, SHUFFLED};
use crate::imaging::{Quality, ThumbnailConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "rehost.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

impl From<IdCodecError> for ConfigError {
    fn from(e: IdCodecError) -> Self {
        ConfigError::Validation(format!("ids.alphabet: {e}"))
    }
}

/// Host configuration loaded from `rehost.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Root of the catalog database and derivative folders.
    pub base_folder: PathBuf,
    pub thumbnails: ThumbnailsConfig,
    pub encoding: EncodingConfig,
    /// Public id encoding.
    pub ids: IdsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Remote image downloads.
    pub fetch: FetchConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_folder: PathBuf::from("."),
            thumbnails: ThumbnailsConfig::default(),
            encoding: EncodingConfig::default(),
            ids: IdsConfig::default(),
            processing: ProcessingConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl HostConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.size must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.encoding.jpeg_quality) {
            return Err(ConfigError::Validation(
                "encoding.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be non-zero".into(),
            ));
        }
        if self.fetch.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "fetch.max_bytes must be non-zero".into(),
            ));
        }
        self.ids.base62()?;
        Ok(())
    }

    pub fn id_codec(&self) -> Result<IdCodec, ConfigError> {
        Ok(IdCodec::new(self.ids.base62()?, self.ids.offset))
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.encoding.jpeg_quality)
    }

    pub fn thumbnail_config(&self) -> ThumbnailConfig {
        ThumbnailConfig {
            size: self.thumbnails.size,
            quality: self.quality(),
        }
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub size: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self { size: 200 }
    }
}

/// Encoder settings for written derivatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub jpeg_quality: u32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self { jpeg_quality: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdsConfig {
    pub offset: u64,
    /// `"shuffled"`, `"natural"`, or a literal 62-character alphabet.
    pub alphabet: String,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            offset: 10_000,
            alphabet: "shuffled".to_string(),
        }
    }
}

impl IdsConfig {
    pub fn base62(&self) -> Result<Base62, IdCodecError> {
        match self.alphabet.as_str() {
            "shuffled" => Base62::new(SHUFFLED),
            "natural" => Base62::new(NATURAL),
            literal => Base62::new(literal),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel thumbnail workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(HostConfig::default())?)
}

/// Lay a user `rehost.toml` tree over the stock defaults.
///
/// Sections merge key by key, so `[ids] offset = 5` keeps the stock
/// alphabet. Any other user value replaces the default outright.
pub fn merge_toml(mut defaults: toml::Value, user: toml::Value) -> toml::Value {
    overlay(&mut defaults, user);
    defaults
}

fn overlay(target: &mut toml::Value, user: toml::Value) {
    match (target, user) {
        (toml::Value::Table(section), toml::Value::Table(user)) => {
            for (key, value) in user {
                match section.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        section.insert(key, value);
                    }
                }
            }
        }
        (target, user) => *target = user,
    }
}

/// Read the `rehost.toml` at `path` as an untyped tree.
///
/// A missing file is `Ok(None)`: every key then comes from the defaults.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&text)?))
}

/// Build a checked [`HostConfig`] from the stock tree and the user's tree.
pub fn resolve_config(
    defaults: toml::Value,
    user: Option<toml::Value>,
) -> Result<HostConfig, ConfigError> {
    let config: HostConfig = user.into_iter().fold(defaults, merge_toml).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`, or stock defaults if it is missing.
pub fn load_config(path: &Path) -> Result<HostConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `rehost.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# rehost configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Folder holding sqlite.db and the store/, thumb/ and tmp/ directories.
# Overridden by --base on the command line.
base_folder = "."

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Side length of the square thumbnail. Sources are center-cropped to a
# square first, then resized with a Lanczos filter.
size = 200

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# JPEG quality for thumbnails and crops of JPEG sources (1-100).
# PNG and GIF output is lossless and ignores this.
jpeg_quality = 100

# ---------------------------------------------------------------------------
# Public ids
# ---------------------------------------------------------------------------
[ids]
# Added to the row id before encoding, so the first ids are not one
# character long. Changing it changes every public id.
offset = 10000

# "shuffled", "natural" (a-z 0-9 A-Z), or any 62 distinct ASCII characters.
alphabet = "shuffled"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for thumbnail rebuilds.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4

# ---------------------------------------------------------------------------
# Downloads
# ---------------------------------------------------------------------------
[fetch]
# Deadline for the whole request when `rehost add` is given a URL.
timeout_secs = 30

# Downloads larger than this are refused (20 MiB).
max_bytes = 20971520
"##
}
