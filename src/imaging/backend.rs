//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and encode. Both work on in-memory bytes. The codec
//! never touches the filesystem or the network.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate for decoding and resampling and `webp` for lossy WebP output.

use super::params::EncodeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A re-encoded image ready to be wrapped in a data-URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Send + Sync` so a single backend can be shared across concurrent uploads
/// and moved onto the blocking thread pool.
pub trait ImageBackend: Send + Sync {
    /// Decode just enough to report the image dimensions.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode, scale down to fit the bounding box, and re-encode.
    fn encode(&self, bytes: &[u8], params: &EncodeParams) -> Result<EncodedImage, BackendError>;
}
