//! Pure dimension math for the compression engine.

/// Target dimensions for a source image under an optional longer-side bound.
///
/// Never upscales. When the image exceeds `max_dimension` on either side,
/// the longer side becomes exactly `max_dimension` and the shorter side is
/// scaled proportionally, rounding half away from zero. Neither axis is
/// ever returned as 0.
///
/// ```
/// # use upload_compressor::compression::calculate_dimensions;
/// assert_eq!(calculate_dimensions(4000, 3000, Some(2048)), (2048, 1536));
/// assert_eq!(calculate_dimensions(100, 100, Some(2048)), (100, 100));
/// assert_eq!(calculate_dimensions(4000, 3000, None), (4000, 3000));
/// ```
pub fn calculate_dimensions(width: u32, height: u32, max_dimension: Option<u32>) -> (u32, u32) {
    let max = match max_dimension {
        Some(max) if max > 0 => max,
        _ => return (width, height),
    };

    if width <= max && height <= max {
        return (width, height);
    }

    let (w, h) = if width >= height {
        // Landscape or square: width is the longer side
        let ratio = max as f64 / width as f64;
        (max, (height as f64 * ratio).round() as u32)
    } else {
        let ratio = max as f64 / height as f64;
        ((width as f64 * ratio).round() as u32, max)
    };

    (w.max(1), h.max(1))
}
