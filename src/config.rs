//! Application configuration.
//!
//! Handles loading, validating, and merging `instagrandad.toml`. The stock
//! defaults are the base layer; a user file overrides just the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! bind = "127.0.0.1:8787"       # Address the HTTP API listens on
//! max_body_bytes = 33554432     # Largest accepted request body (32 MiB)
//!
//! [storage]
//! backend = "file"              # "file" or "memory"
//! path = "data"                 # Root directory for the file backend
//! namespace = "family-photos"   # Sub-directory / store name
//! key = "family-photos-list"    # Key of the photo document
//! write_policy = "optimistic"   # "optimistic" or "last-write-wins"
//! max_write_attempts = 5        # Bound on optimistic retries
//!
//! [upload]
//! batch_size = 3                # Files uploaded concurrently per batch
//! max_file_size = 10485760      # Reject source files above this (10 MiB)
//! compress_threshold = 2097152  # Re-encode full-size above this (2 MiB)
//! cache_capacity = 256          # Encode cache entries (0 = unbounded)
//!
//! [images]
//! format = "webp"               # "webp" or "jpeg"
//!
//! [images.full]
//! max_width = 1200
//! max_height = 1200
//! quality = 80
//!
//! [images.thumbnail]
//! max_width = 300
//! max_height = 300
//! quality = 70
//!
//! [client]
//! server_url = "http://127.0.0.1:8787"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{CodecConfig, EncodeParams, MAX_FILE_SIZE, OutputFormat, Quality};
use crate::store::{PHOTOS_KEY, WritePolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "instagrandad.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadSettings,
    pub images: ImagesConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "server.bind '{}' is not a socket address",
                self.server.bind
            )));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_body_bytes must be non-zero".into(),
            ));
        }
        if self.storage.key.is_empty() {
            return Err(ConfigError::Validation("storage.key must not be empty".into()));
        }
        if self.storage.namespace.is_empty()
            || self.storage.namespace.contains(['/', '\\'])
            || self.storage.namespace.starts_with('.')
        {
            return Err(ConfigError::Validation(
                "storage.namespace must be a plain directory name".into(),
            ));
        }
        if self.storage.max_write_attempts == 0 {
            return Err(ConfigError::Validation(
                "storage.max_write_attempts must be at least 1".into(),
            ));
        }
        if self.upload.batch_size == 0 {
            return Err(ConfigError::Validation(
                "upload.batch_size must be at least 1".into(),
            ));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "upload.max_file_size must be non-zero".into(),
            ));
        }
        self.images.full.validate("images.full")?;
        self.images.thumbnail.validate("images.thumbnail")?;
        Ok(())
    }

    /// Storage directory for the file backend: `path/namespace`.
    pub fn storage_root(&self) -> PathBuf {
        Path::new(&self.storage.path).join(&self.storage.namespace)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    /// Largest accepted request body. Photos travel as base64 data-URIs, so
    /// this has to cover two encoded images plus JSON framing.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

/// Where and how the photo document is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: String,
    pub namespace: String,
    pub key: String,
    pub write_policy: WritePolicy,
    pub max_write_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: "data".to_string(),
            namespace: "family-photos".to_string(),
            key: PHOTOS_KEY.to_string(),
            write_policy: WritePolicy::Optimistic,
            max_write_attempts: 5,
        }
    }
}

/// Upload pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadSettings {
    pub batch_size: usize,
    pub max_file_size: u64,
    pub compress_threshold: u64,
    pub cache_capacity: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            max_file_size: MAX_FILE_SIZE,
            compress_threshold: 2 * 1024 * 1024,
            cache_capacity: 256,
        }
    }
}

/// Bounding box and quality for one output representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl SizeConfig {
    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ConfigError::Validation(format!(
                "{section} dimensions must be non-zero"
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation(format!(
                "{section}.quality must be 1-100"
            )));
        }
        Ok(())
    }

    fn to_params(self, format: OutputFormat) -> EncodeParams {
        EncodeParams {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: Quality::new(self.quality),
            format,
        }
    }
}

impl From<EncodeParams> for SizeConfig {
    fn from(params: EncodeParams) -> Self {
        Self {
            max_width: params.max_width,
            max_height: params.max_height,
            quality: params.quality.value(),
        }
    }
}

/// Image encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub format: OutputFormat,
    pub full: SizeConfig,
    pub thumbnail: SizeConfig,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        let format = OutputFormat::default();
        Self {
            format,
            full: EncodeParams::full_size(format).into(),
            thumbnail: EncodeParams::thumbnail(format).into(),
        }
    }
}

impl ImagesConfig {
    pub fn codec(&self) -> CodecConfig {
        CodecConfig {
            full: self.full.to_params(self.format),
            thumbnail: self.thumbnail.to_params(self.format),
        }
    }
}

/// Settings for CLI commands that talk to a running server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub server_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8787".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. Missing files are `Ok(None)`.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective configuration.
///
/// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] in the
/// working directory is used if present, stock defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let overlay = match path {
        Some(explicit) => Some(
            load_raw_config(explicit)?
                .ok_or_else(|| ConfigError::NotFound(explicit.to_path_buf()))?,
        ),
        None => load_raw_config(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# instagrandad configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# HTTP API
# ---------------------------------------------------------------------------
[server]
# Address the API listens on.
bind = "127.0.0.1:8787"

# Largest accepted request body in bytes. Uploads carry two base64 images.
max_body_bytes = 33554432

# ---------------------------------------------------------------------------
# Photo storage
# ---------------------------------------------------------------------------
[storage]
# "file" keeps the gallery on disk; "memory" loses it on restart.
backend = "file"

# Root directory for the file backend. Files live under path/namespace.
path = "data"
namespace = "family-photos"

# Key of the single document holding every photo, newest first.
key = "family-photos-list"

# "optimistic" retries a write when another writer got there first.
# "last-write-wins" overwrites blindly and can lose concurrent uploads.
write_policy = "optimistic"

# Attempts per write before reporting a conflict.
max_write_attempts = 5

# ---------------------------------------------------------------------------
# Upload pipeline
# ---------------------------------------------------------------------------
[upload]
# Files uploaded concurrently; the next batch starts when this one finishes.
batch_size = 3

# Source files larger than this (bytes) are rejected.
max_file_size = 10485760

# Full-size images at or below this size (bytes) are sent unmodified.
compress_threshold = 2097152

# Encoded images remembered for re-selected files (0 = unbounded).
cache_capacity = 256

# ---------------------------------------------------------------------------
# Image encoding
# ---------------------------------------------------------------------------
[images]
# "webp" (smaller) or "jpeg" (universally supported).
format = "webp"

[images.full]
max_width = 1200
max_height = 1200
quality = 80

[images.thumbnail]
max_width = 300
max_height = 300
quality = 70

# ---------------------------------------------------------------------------
# CLI client
# ---------------------------------------------------------------------------
[client]
# Server used by `upload`, `list` and `delete` unless --local is given.
server_url = "http://127.0.0.1:8787"
"##
}
