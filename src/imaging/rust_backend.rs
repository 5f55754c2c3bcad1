//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image::ImageReader` with format sniffing |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → WebP (lossy) | `webp::Encoder` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! Animated GIFs are flattened to their first frame. The EXIF orientation tag
//! is applied at decode time, so output pixels are upright and need no
//! metadata.

use super::backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
use super::calculations::{calculate_fit_dimensions, needs_resize};
use super::params::{EncodeParams, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(format!("Failed to sniff image format: {e}")))
}

/// Decode an in-memory image of any compiled-in format, rotated upright.
fn load_image(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    let mut decoder = reader(bytes)?
        .into_decoder()
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    // Unreadable EXIF is not fatal; the pixels are still usable as stored.
    let orientation = decoder.orientation().ok();
    let mut img =
        DynamicImage::from_decoder(decoder).map_err(|e| BackendError::Decode(e.to_string()))?;
    if let Some(orientation) = orientation {
        img.apply_orientation(orientation);
    }
    Ok(img)
}

/// Encode as lossy WebP. `quality` is on the 1–100 scale.
fn encode_webp(img: &DynamicImage, quality: u32) -> Result<Vec<u8>, BackendError> {
    // The webp encoder only accepts 8-bit RGB/RGBA buffers.
    let normalized = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&normalized)
        .map_err(|e| BackendError::Encode(format!("WebP encoder rejected image: {e}")))?;
    let encoded = encoder
        .encode_simple(false, quality as f32)
        .map_err(|e| BackendError::Encode(format!("WebP encode failed: {e:?}")))?;
    Ok(encoded.to_vec())
}

/// Encode as baseline JPEG. Alpha is dropped.
fn encode_jpeg(img: &DynamicImage, quality: u32) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality as u8);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(bytes)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn encode(&self, bytes: &[u8], params: &EncodeParams) -> Result<EncodedImage, BackendError> {
        let img = load_image(bytes)?;
        let source = (img.width(), img.height());
        let bounds = (params.max_width, params.max_height);

        let resized = if needs_resize(source, bounds) {
            let (width, height) = calculate_fit_dimensions(source, bounds);
            img.resize_exact(width, height, FilterType::Lanczos3)
        } else {
            img
        };

        let quality = params.quality.value();
        let bytes = match params.format {
            OutputFormat::Webp => encode_webp(&resized, quality)?,
            OutputFormat::Jpeg => encode_jpeg(&resized, quality)?,
        };

        Ok(EncodedImage {
            bytes,
            mime_type: params.format.mime_type().to_string(),
            width: resized.width(),
            height: resized.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{gif_bytes, jpeg_bytes, png_rgba_bytes, with_exif_orientation};

    fn bounded(max: u32, format: OutputFormat) -> EncodeParams {
        EncodeParams {
            max_width: max,
            max_height: max,
            quality: Quality::new(80),
            format,
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let backend = RustBackend::new();
        let dims = backend.identify(&jpeg_bytes(200, 150)).unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn identify_garbage_errors() {
        let backend = RustBackend::new();
        let result = backend.identify(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn encode_downscales_to_webp() {
        let backend = RustBackend::new();
        let encoded = backend
            .encode(&jpeg_bytes(400, 300), &bounded(200, OutputFormat::Webp))
            .unwrap();

        assert_eq!((encoded.width, encoded.height), (200, 150));
        assert_eq!(encoded.mime_type, "image/webp");
        let dims = backend.identify(&encoded.bytes).unwrap();
        assert_eq!((dims.width, dims.height), (200, 150));
    }

    #[test]
    fn encode_does_not_upscale() {
        let backend = RustBackend::new();
        let encoded = backend
            .encode(&jpeg_bytes(120, 80), &bounded(300, OutputFormat::Jpeg))
            .unwrap();

        assert_eq!((encoded.width, encoded.height), (120, 80));
        assert_eq!(encoded.mime_type, "image/jpeg");
    }

    #[test]
    fn encode_portrait_fits_height() {
        let backend = RustBackend::new();
        let encoded = backend
            .encode(&jpeg_bytes(300, 600), &bounded(300, OutputFormat::Jpeg))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (150, 300));
    }

    #[test]
    fn encode_transparent_png_to_jpeg_drops_alpha() {
        let backend = RustBackend::new();
        let encoded = backend
            .encode(&png_rgba_bytes(64, 64), &bounded(32, OutputFormat::Jpeg))
            .unwrap();
        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert!(!decoded.color().has_alpha());
        assert_eq!(decoded.width(), 32);
    }

    #[test]
    fn encode_transparent_png_to_webp() {
        let backend = RustBackend::new();
        let encoded = backend
            .encode(&png_rgba_bytes(64, 48), &bounded(300, OutputFormat::Webp))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (64, 48));
        assert!(!encoded.bytes.is_empty());
    }

    #[test]
    fn encode_gif_input() {
        let backend = RustBackend::new();
        let encoded = backend
            .encode(&gif_bytes(50, 40), &bounded(25, OutputFormat::Webp))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (25, 20));
    }

    #[test]
    fn encode_corrupt_input_is_decode_error() {
        let backend = RustBackend::new();
        let mut bytes = jpeg_bytes(100, 100);
        bytes.truncate(40);
        let result = backend.encode(&bytes, &bounded(50, OutputFormat::Jpeg));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn lower_quality_produces_smaller_jpeg() {
        let backend = RustBackend::new();
        let source = jpeg_bytes(256, 256);
        let high = backend
            .encode(
                &source,
                &EncodeParams {
                    quality: Quality::new(95),
                    ..bounded(256, OutputFormat::Jpeg)
                },
            )
            .unwrap();
        let low = backend
            .encode(
                &source,
                &EncodeParams {
                    quality: Quality::new(10),
                    ..bounded(256, OutputFormat::Jpeg)
                },
            )
            .unwrap();
        assert!(low.bytes.len() < high.bytes.len());
    }

    // =========================================================================
    // EXIF orientation
    // =========================================================================

    #[test]
    fn rotated_exif_is_fitted_upright() {
        // Stored landscape, tagged "rotate 90 CW" as phone portraits are
        let source = with_exif_orientation(&jpeg_bytes(400, 200), 6);
        let backend = RustBackend::new();
        let encoded = backend
            .encode(&source, &bounded(300, OutputFormat::Webp))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (150, 300));
        let dims = backend.identify(&encoded.bytes).unwrap();
        assert_eq!((dims.width, dims.height), (150, 300));
    }

    #[test]
    fn rotated_exif_below_bounds_keeps_size_but_turns() {
        let source = with_exif_orientation(&jpeg_bytes(120, 80), 8);
        let encoded = RustBackend::new()
            .encode(&source, &bounded(300, OutputFormat::Jpeg))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (80, 120));
    }

    #[test]
    fn upright_exif_changes_nothing() {
        let source = with_exif_orientation(&jpeg_bytes(400, 200), 1);
        let encoded = RustBackend::new()
            .encode(&source, &bounded(300, OutputFormat::Jpeg))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (300, 150));
    }

    // =========================================================================
    // Encoder limits
    // =========================================================================

    #[test]
    fn webp_over_dimension_limit_is_encode_error() {
        // WebP caps each side at 16383 px
        let wide = jpeg_bytes(16_400, 2);
        let result = RustBackend::new().encode(&wide, &bounded(20_000, OutputFormat::Webp));
        assert!(matches!(result, Err(BackendError::Encode(_))));
    }
}
