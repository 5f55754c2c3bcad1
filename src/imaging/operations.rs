//! High-level image operations.
//!
//! These functions combine calculations, validation limits and backend
//! execution. They decide which representations an uploaded photo needs and
//! call the backend to produce them.

use super::backend::{BackendError, EncodedImage, ImageBackend};
use super::params::{EncodeParams, OutputFormat};
use thiserror::Error;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// MIME types accepted for upload.
pub const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Largest accepted source file: 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file type '{0}'. Please use JPEG, PNG, GIF, or WebP.")]
    UnsupportedType(String),
    #[error("File too large ({size} bytes). Maximum size is {} MB.", max / (1024 * 1024))]
    TooLarge { size: u64, max: u64 },
}

/// Reject files outside the type allow-list or above `max_size` bytes.
///
/// The type check runs first, so a file that fails both reports
/// [`ValidationError::UnsupportedType`].
pub fn validate(mime_type: &str, size: u64, max_size: u64) -> std::result::Result<(), ValidationError> {
    let normalized = mime_type.trim().to_ascii_lowercase();
    if !ALLOWED_TYPES.contains(&normalized.as_str()) {
        return Err(ValidationError::UnsupportedType(mime_type.to_string()));
    }
    if size > max_size {
        return Err(ValidationError::TooLarge {
            size,
            max: max_size,
        });
    }
    Ok(())
}

/// Configuration for the two representations produced per photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub full: EncodeParams,
    pub thumbnail: EncodeParams,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            full: EncodeParams::full_size(OutputFormat::default()),
            thumbnail: EncodeParams::thumbnail(OutputFormat::default()),
        }
    }
}

/// Re-encode an image to fit `params`.
pub fn encode(
    backend: &impl ImageBackend,
    bytes: &[u8],
    params: &EncodeParams,
) -> Result<EncodedImage> {
    backend.encode(bytes, params)
}

/// Create the full-size gallery representation.
pub fn create_full_size(
    backend: &impl ImageBackend,
    bytes: &[u8],
    config: &CodecConfig,
) -> Result<EncodedImage> {
    encode(backend, bytes, &config.full)
}

/// Create the gallery thumbnail.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    bytes: &[u8],
    config: &CodecConfig,
) -> Result<EncodedImage> {
    encode(backend, bytes, &config.thumbnail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    // =========================================================================
    // validate
    // =========================================================================

    #[test]
    fn validate_accepts_allowed_types() {
        for mime in ALLOWED_TYPES {
            assert_eq!(validate(mime, 1024, MAX_FILE_SIZE), Ok(()));
        }
    }

    #[test]
    fn validate_is_case_insensitive() {
        assert_eq!(validate("IMAGE/JPEG", 1, MAX_FILE_SIZE), Ok(()));
    }

    #[test]
    fn validate_rejects_disallowed_type() {
        for mime in ["image/tiff", "image/svg+xml", "application/pdf", ""] {
            assert!(matches!(
                validate(mime, 10, MAX_FILE_SIZE),
                Err(ValidationError::UnsupportedType(_))
            ));
        }
    }

    #[test]
    fn validate_rejects_oversized() {
        assert_eq!(
            validate("image/png", MAX_FILE_SIZE + 1, MAX_FILE_SIZE),
            Err(ValidationError::TooLarge {
                size: MAX_FILE_SIZE + 1,
                max: MAX_FILE_SIZE
            })
        );
    }

    #[test]
    fn validate_limit_is_inclusive() {
        assert_eq!(validate("image/png", MAX_FILE_SIZE, MAX_FILE_SIZE), Ok(()));
    }

    #[test]
    fn validate_type_checked_before_size() {
        assert!(matches!(
            validate("text/plain", MAX_FILE_SIZE * 2, MAX_FILE_SIZE),
            Err(ValidationError::UnsupportedType(_))
        ));
    }

    #[test]
    fn too_large_message_mentions_limit() {
        let err = validate("image/png", MAX_FILE_SIZE + 1, MAX_FILE_SIZE).unwrap_err();
        assert!(err.to_string().contains("10 MB"));
    }

    // =========================================================================
    // encode helpers
    // =========================================================================

    #[test]
    fn create_thumbnail_uses_thumbnail_params() {
        let backend = MockBackend::new();
        let thumb = create_thumbnail(&backend, b"img", &CodecConfig::default()).unwrap();
        assert_eq!((thumb.width, thumb.height), (300, 225));

        let ops = backend.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                max_width: 300,
                max_height: 300,
                quality: 70,
                ..
            }
        ));
    }

    #[test]
    fn create_full_size_uses_full_params() {
        let backend = MockBackend::new();
        let full = create_full_size(&backend, b"img", &CodecConfig::default()).unwrap();
        assert_eq!((full.width, full.height), (1200, 900));

        let ops = backend.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                max_width: 1200,
                quality: 80,
                format: OutputFormat::Webp,
                ..
            }
        ));
    }
}
