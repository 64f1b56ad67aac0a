//! Pure rectangle math for derivatives.
//!
//! All functions here are pure and testable without any I/O or images.

use super::pixels::Rect;

/// The largest square centered inside `bounds`.
///
/// `offset = (long - short) / 2` is trimmed from the leading edge of the
/// longer axis and the square is exactly `short` on each side, so an odd
/// difference leaves the extra row or column on the trailing edge. Square
/// bounds are returned unchanged.
///
/// ```
/// # use rehost::imaging::{Rect, center_square_bounds};
/// // 400x300 landscape → 300x300 starting 50px in
/// assert_eq!(center_square_bounds(Rect::from_size(400, 300)), Rect::new(50, 0, 350, 300));
/// ```
pub fn center_square_bounds(bounds: Rect) -> Rect {
    let (width, height) = (bounds.width(), bounds.height());
    let short = width.min(height);
    let offset = (width.max(height) - short) / 2;

    if width > height {
        let left = bounds.left + offset;
        Rect::new(left, bounds.top, left + short, bounds.bottom)
    } else if height > width {
        let top = bounds.top + offset;
        Rect::new(bounds.left, top, bounds.right, top + short)
    } else {
        bounds
    }
}

/// Whether `rect` is a usable crop of `bounds`: non-empty, not inverted and
/// fully contained.
pub fn crop_fits(bounds: Rect, rect: Rect) -> bool {
    bounds.contains_rect(&rect)
}
