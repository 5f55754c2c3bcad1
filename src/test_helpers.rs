//! Shared test utilities.
//!
//! Synthetic images for the codec and pipeline tests, plus photo record
//! fixtures for the store and pagination tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let bytes = jpeg_bytes(400, 300);
//! let gallery = photos(125);
//! assert_eq!(gallery[0].id, "photo-000");
//! ```

use chrono::{TimeZone, Utc};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

use crate::types::Photo;

// =========================================================================
// Synthetic images
// =========================================================================

fn write(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// An opaque RGB gradient encoded as JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    write(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// A PNG with a transparent left half.
pub fn png_rgba_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        Rgba([200, 40, 40, alpha])
    });
    write(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// A single-frame GIF.
pub fn gif_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([10, 120, 200, 255]));
    write(DynamicImage::ImageRgba8(img), ImageFormat::Gif)
}

/// Insert an EXIF APP1 segment carrying only an Orientation tag (1-8)
/// right after the JPEG SOI marker.
pub fn with_exif_orientation(jpeg: &[u8], orientation: u8) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");
    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    // Big-endian TIFF header, first IFD at offset 8
    app1.extend_from_slice(&[b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
    // One entry: tag 0x0112 (Orientation), SHORT, count 1
    app1.extend_from_slice(&[0x00, 0x01, 0x01, 0x12, 0x00, 0x03]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x00, orientation, 0x00, 0x00]);
    // No next IFD
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// =========================================================================
// Photo records
// =========================================================================

/// A small, fully-populated photo record with the given id.
pub fn photo(id: &str) -> Photo {
    Photo {
        id: id.to_string(),
        filename: format!("{id}.jpg"),
        description: format!("Description of {id}"),
        uploaded_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        uploaded_by: "sam".to_string(),
        url: "data:image/jpeg;base64,/9j/4AAQ".to_string(),
        thumbnail_url: "data:image/webp;base64,UklGRg==".to_string(),
    }
}

/// `count` photos with ids `photo-000`, `photo-001`, ... in that order.
pub fn photos(count: usize) -> Vec<Photo> {
    (0..count).map(|i| photo(&format!("photo-{i:03}"))).collect()
}
