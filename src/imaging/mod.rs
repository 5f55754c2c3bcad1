//! Image codec: validation, resizing and re-encoding of in-memory images.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Validate** | MIME allow-list + size limit |
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Full size** | fit 1200×1200, Lanczos3, WebP/JPEG @ 80 |
//! | **Thumbnail** | fit 300×300, Lanczos3, WebP/JPEG @ 70 |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing an encode
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Validation and the full-size/thumbnail entry points
//!
//! Nothing here performs I/O.

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
pub use calculations::{calculate_fit_dimensions, needs_resize};
pub use operations::{
    ALLOWED_TYPES, CodecConfig, MAX_FILE_SIZE, ValidationError, create_full_size,
    create_thumbnail, encode, validate,
};
pub use params::{EncodeParams, OutputFormat, Quality};
pub use rust_backend::RustBackend;
