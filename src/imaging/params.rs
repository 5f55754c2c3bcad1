//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. They are the interface
//! between the high-level [`operations`](super::operations) module (which
//! decides which representations a photo needs) and the
//! [`backend`](super::backend) (which does the pixel work). Keeping them apart
//! lets tests swap in a mock backend without touching operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`OutputFormat`]: Target encoding: lossy WebP, or JPEG as the universal fallback.
//! - [`EncodeParams`]: Bounding box, quality and format for one encode.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Webp,
    Jpeg,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Webp => "image/webp",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Parameters for a single bounded re-encode.
///
/// The image is scaled down to fit inside `max_width` × `max_height`
/// (never up), then encoded as `format` at `quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodeParams {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
    pub format: OutputFormat,
}

impl EncodeParams {
    /// Full-size gallery image: 1200×1200 at quality 80.
    pub fn full_size(format: OutputFormat) -> Self {
        Self {
            max_width: 1200,
            max_height: 1200,
            quality: Quality::new(80),
            format,
        }
    }

    /// Gallery thumbnail: 300×300 at quality 70.
    pub fn thumbnail(format: OutputFormat) -> Self {
        Self {
            max_width: 300,
            max_height: 300,
            quality: Quality::new(70),
            format,
        }
    }
}
