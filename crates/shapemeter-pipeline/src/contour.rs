//! Object borders traced from binary rasters.
//!
//! Wraps Suzuki-Abe border following via
//! `imageproc::contours::find_contours`. The raster is padded with one
//! background pixel on every side before tracing: an outer border only
//! starts at a pixel whose left neighbour is background, so an object in
//! column 0 would otherwise come back as a hole border, or not at all.

use image::{GrayImage, imageops};
use imageproc::contours::{BorderType, find_contours};

use crate::types::Point;

/// Outer borders of all top-level objects in `mask`, in raster order.
///
/// Nonzero pixels are foreground. Borders of objects nested inside holes
/// of other objects are skipped.
#[must_use]
pub fn outer_borders(mask: &GrayImage) -> Vec<Vec<Point>> {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut padded, mask, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| c.parent.is_none() && matches!(c.border_type, BorderType::Outer))
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect()
        })
        .collect()
}

/// The outer border with the most points, or `None` for an empty mask.
#[must_use]
pub fn largest_outer_border(mask: &GrayImage) -> Option<Vec<Point>> {
    outer_borders(mask).into_iter().max_by_key(Vec::len)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn block(
        width: u32,
        height: u32,
        xs: std::ops::Range<u32>,
        ys: std::ops::Range<u32>,
    ) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if xs.contains(&x) && ys.contains(&y) {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        })
    }

    #[test]
    fn interior_square_border() {
        let mask = block(30, 30, 5..15, 5..15);
        let border = largest_outer_border(&mask).unwrap();
        assert_eq!(border.len(), 36);
        assert!(border.contains(&Point::new(5, 5)));
        assert!(border.contains(&Point::new(14, 14)));
        assert!(border.iter().all(|p| (5..15).contains(&p.x) && (5..15).contains(&p.y)));
    }

    #[test]
    fn object_on_left_edge_is_traced() {
        let mask = block(50, 50, 0..10, 20..30);
        let border = largest_outer_border(&mask).unwrap();
        assert_eq!(border.len(), 36);
        assert!(border.contains(&Point::new(0, 20)));
        assert!(border.contains(&Point::new(9, 29)));
        assert!(border.iter().all(|p| p.x >= 0 && p.y >= 0));
    }

    #[test]
    fn traced_box_is_one_less_than_pixel_extent() {
        let mask = block(30, 30, 5..15, 5..15);
        let border = largest_outer_border(&mask).unwrap();
        let bbox = crate::types::BoundingBox::of(&border).unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (5, 5, 9, 9));
    }

    #[test]
    fn full_width_stripe_is_traced() {
        let mask = block(20, 20, 0..20, 8..12);
        let border = largest_outer_border(&mask).unwrap();
        assert!(border.contains(&Point::new(0, 8)));
        assert!(border.contains(&Point::new(19, 11)));
    }

    #[test]
    fn hole_borders_are_skipped() {
        let mut mask = block(30, 30, 5..25, 5..25);
        for y in 10..20 {
            for x in 10..20 {
                mask.put_pixel(x, y, image::Luma([0]));
            }
        }
        let borders = outer_borders(&mask);
        assert_eq!(borders.len(), 1);
        assert!(borders[0].contains(&Point::new(5, 5)));
    }

    #[test]
    fn largest_of_several_objects() {
        let mut mask = block(40, 40, 2..6, 2..6);
        for y in 20..35 {
            for x in 20..35 {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
        assert_eq!(outer_borders(&mask).len(), 2);
        let border = largest_outer_border(&mask).unwrap();
        assert!(border.contains(&Point::new(20, 20)));
    }

    #[test]
    fn empty_mask_has_no_border() {
        assert!(largest_outer_border(&GrayImage::new(10, 10)).is_none());
    }
}
