//! Binary rasters used as a stand-in for vector intersection.
//!
//! The caliper draws a thick line and a filled hull into two separate
//! full-size rasters and keeps the pixels set in both. Drawing is clipped
//! to the canvas, so endpoints far outside the frame are fine.

use image::{GrayImage, Luma};
use imageproc::drawing::{BresenhamLineIter, draw_filled_circle_mut, draw_polygon_mut};

use crate::types::{Dimensions, Point};

/// Value written for set pixels.
pub const FOREGROUND: Luma<u8> = Luma([255]);

/// An all-zero raster of the given size.
#[must_use]
pub fn blank(dimensions: Dimensions) -> GrayImage {
    GrayImage::new(dimensions.width, dimensions.height)
}

/// Draw a line `thickness` pixels wide from `from` to `to`.
///
/// Every Bresenham pixel of the centre line is stamped with a filled disk
/// of radius `thickness / 2`; thickness 1 draws the bare centre line.
pub fn draw_thick_line(canvas: &mut GrayImage, from: Point, to: Point, thickness: u32) {
    let radius = i32::try_from(thickness / 2).unwrap_or(i32::MAX);
    let Some((start, end)) = clip_segment(from, to, canvas.dimensions(), radius) else {
        return;
    };
    #[allow(clippy::cast_precision_loss)]
    let line = BresenhamLineIter::new(
        (start.x as f32, start.y as f32),
        (end.x as f32, end.y as f32),
    );
    for (x, y) in line {
        stamp(canvas, Point::new(x, y), radius);
    }
}

/// Fill the polygon with the given vertices, boundary included.
///
/// Fewer than three vertices degrade to a one pixel line or a single
/// pixel.
pub fn fill_polygon(canvas: &mut GrayImage, vertices: &[Point]) {
    match vertices {
        [] => {}
        [only] => stamp(canvas, *only, 0),
        [a, b] => draw_thick_line(canvas, *a, *b, 1),
        _ => {
            let mut poly: Vec<imageproc::point::Point<i32>> = vertices
                .iter()
                .map(|p| imageproc::point::Point::new(p.x, p.y))
                .collect();
            // imageproc rejects an explicitly closed polygon.
            if poly.len() > 3 && poly.first() == poly.last() {
                poly.pop();
            }
            draw_polygon_mut(canvas, &poly, FOREGROUND);
        }
    }
}

/// Pixels set in both rasters, sorted by `(x, y)`.
///
/// Rasters of different sizes are compared over their common area.
#[must_use]
pub fn intersect(a: &GrayImage, b: &GrayImage) -> Vec<Point> {
    let width = a.width().min(b.width());
    let height = a.height().min(b.height());
    let mut points = Vec::new();
    for x in 0..width {
        for y in 0..height {
            if a.get_pixel(x, y).0[0] != 0 && b.get_pixel(x, y).0[0] != 0 {
                #[allow(clippy::cast_possible_wrap)]
                points.push(Point::new(x as i32, y as i32));
            }
        }
    }
    points
}

/// Set the pixel at `center`, or a filled disk around it.
fn stamp(canvas: &mut GrayImage, center: Point, radius: i32) {
    if radius > 0 {
        draw_filled_circle_mut(canvas, (center.x, center.y), radius, FOREGROUND);
        return;
    }
    let (Ok(x), Ok(y)) = (u32::try_from(center.x), u32::try_from(center.y)) else {
        return;
    };
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, FOREGROUND);
    }
}

/// Liang–Barsky clip of a segment to the canvas grown by `margin` pixels.
///
/// Returns the rounded endpoints of the visible part, or `None` when the
/// segment misses the canvas entirely.
fn clip_segment(
    from: Point,
    to: Point,
    (width, height): (u32, u32),
    margin: i32,
) -> Option<(Point, Point)> {
    let x0 = f64::from(from.x);
    let y0 = f64::from(from.y);
    let dx = f64::from(to.x) - x0;
    let dy = f64::from(to.y) - y0;
    let m = f64::from(margin);
    let (x_min, y_min) = (-m, -m);
    let x_max = f64::from(width) - 1.0 + m;
    let y_max = f64::from(height) - 1.0 + m;

    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [
        (-dx, x0 - x_min),
        (dx, x_max - x0),
        (-dy, y0 - y_min),
        (dy, y_max - y0),
    ] {
        if p.abs() < f64::EPSILON {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let at = |t: f64| Point::new(t.mul_add(dx, x0).round() as i32, t.mul_add(dy, y0).round() as i32);
    Some((at(t0), at(t1)))
}
