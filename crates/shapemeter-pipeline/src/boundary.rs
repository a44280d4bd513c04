//! Frame-contact test: does the object touch the image border?
//!
//! Objects cut off by the frame have biased size and shape measurements,
//! so the record flags them with `in_bounds`.

use crate::geometry::{Containment, containment};
use crate::types::{Dimensions, Point};

/// The border traced around an all-ones raster of the given size.
#[must_use]
pub fn frame_contour(dimensions: Dimensions) -> Vec<Point> {
    let right = i32::try_from(dimensions.width.saturating_sub(1)).unwrap_or(i32::MAX);
    let bottom = i32::try_from(dimensions.height.saturating_sub(1)).unwrap_or(i32::MAX);
    vec![
        Point::new(0, 0),
        Point::new(right, 0),
        Point::new(right, bottom),
        Point::new(0, bottom),
    ]
}

/// Returns `true` when every contour point lies strictly inside the frame.
///
/// Points on the outermost row or column classify as on the boundary and
/// make the object out of bounds.
#[must_use]
pub fn in_bounds(contour: &[Point], dimensions: Dimensions) -> bool {
    let frame = frame_contour(dimensions);
    contour
        .iter()
        .all(|&p| containment(&frame, p) == Containment::Inside)
}
