//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the largest size that fits inside a bounding box.
///
/// Aspect ratio is preserved. Images are only ever scaled down: a source that
/// already fits is returned unchanged. Width is clamped first, then height,
/// and the result is rounded to whole pixels (never below 1).
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `max` - Bounding box (max width, max height)
///
/// # Examples
/// ```
/// # use instagrandad::imaging::calculate_fit_dimensions;
/// // 2400x1600 landscape into 1200x1200 → 1200x800
/// assert_eq!(calculate_fit_dimensions((2400, 1600), (1200, 1200)), (1200, 800));
///
/// // Already small enough: untouched
/// assert_eq!(calculate_fit_dimensions((640, 480), (1200, 1200)), (640, 480));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), max: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = max;

    let mut width = src_w as f64;
    let mut height = src_h as f64;

    if width > max_w as f64 {
        height = height * max_w as f64 / width;
        width = max_w as f64;
    }

    if height > max_h as f64 {
        width = width * max_h as f64 / height;
        height = max_h as f64;
    }

    (
        (width.round() as u32).max(1),
        (height.round() as u32).max(1),
    )
}

/// Whether an image of `source` size needs resampling to fit `max`.
pub fn needs_resize(source: (u32, u32), max: (u32, u32)) -> bool {
    source.0 > max.0 || source.1 > max.1
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_fit_dimensions tests
    // =========================================================================

    #[test]
    fn fit_landscape_clamps_width() {
        assert_eq!(
            calculate_fit_dimensions((2400, 1600), (1200, 1200)),
            (1200, 800)
        );
    }

    #[test]
    fn fit_portrait_clamps_height() {
        assert_eq!(
            calculate_fit_dimensions((1600, 2400), (1200, 1200)),
            (800, 1200)
        );
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(calculate_fit_dimensions((200, 100), (300, 300)), (200, 100));
    }

    #[test]
    fn fit_exact_box_unchanged() {
        assert_eq!(calculate_fit_dimensions((300, 300), (300, 300)), (300, 300));
    }

    #[test]
    fn fit_both_dimensions_over_non_square_box() {
        // Width pass: 4000x3000 → 800x600, then height pass: 600 > 400 → 533x400
        assert_eq!(calculate_fit_dimensions((4000, 3000), (800, 400)), (533, 400));
    }

    #[test]
    fn fit_extreme_panorama_keeps_one_pixel() {
        assert_eq!(calculate_fit_dimensions((10000, 1), (300, 300)), (300, 1));
    }

    #[test]
    fn fit_never_exceeds_bounds() {
        let boxes = [(1200, 1200), (300, 300), (800, 400), (1, 1)];
        let sources = [
            (1, 1),
            (299, 301),
            (301, 299),
            (1201, 1199),
            (4032, 3024),
            (3024, 4032),
            (7, 9000),
        ];
        for max in boxes {
            for src in sources {
                let (w, h) = calculate_fit_dimensions(src, max);
                assert!(w <= max.0.max(1) && h <= max.1.max(1), "{src:?} in {max:?} → {w}x{h}");
                assert!(w <= src.0 && h <= src.1, "{src:?} upscaled to {w}x{h}");
            }
        }
    }

    // =========================================================================
    // needs_resize tests
    // =========================================================================

    #[test]
    fn needs_resize_when_either_edge_exceeds() {
        assert!(needs_resize((1201, 10), (1200, 1200)));
        assert!(needs_resize((10, 1201), (1200, 1200)));
        assert!(!needs_resize((1200, 1200), (1200, 1200)));
    }
}
