//! Longest axis through the centroid.
//!
//! The caliper picks the hull vertex farthest from a small marker disk at
//! the centroid, extends the line through the centroid and that vertex
//! across the frame, and counts the pixels where a thick rasterization of
//! that line overlaps the filled hull.
//!
//! Line placement follows four cases:
//!
//! | Case                     | Segment drawn                          |
//! |--------------------------|----------------------------------------|
//! | same column              | `(mid_x, 0)` to `(mid_x, H)`           |
//! | same row                 | `(W, mid_y)` to `(0, mid_y)`           |
//! | both row intercepts fit  | `(x_bot, H)` to `(x_top, 0)`           |
//! | otherwise                | `(0, b)` to `(W, slope * W + b)`       |
//!
//! The last case is an approximation for steep or shallow lines whose
//! top or bottom intercept falls outside the frame.

use serde::{Deserialize, Serialize};

use crate::contour;
use crate::geometry::signed_distance;
use crate::hull::ConvexHull;
use crate::moments::Centroid;
use crate::raster;
use crate::types::{Dimensions, Point};

/// The full-frame line the caliper rasterizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaliperLine {
    /// Vertical line at column `x`, spanning the frame height.
    Vertical {
        /// Column of the line.
        x: i32,
    },
    /// Horizontal line at row `y`, spanning the frame width.
    Horizontal {
        /// Row of the line.
        y: i32,
    },
    /// Line between its intercepts with the bottom and top rows.
    Intercepts {
        /// Intercept with `y = H`.
        bottom: Point,
        /// Intercept with `y = 0`.
        top: Point,
    },
    /// Line between its intercepts with the left and right edges.
    EdgeToEdge {
        /// Intercept with `x = 0`.
        left: Point,
        /// Intercept with `x = W`.
        right: Point,
    },
}

impl CaliperLine {
    /// Choose the line through `mid` and `far` for a frame of `dimensions`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn plan(mid: Point, far: Point, dimensions: Dimensions) -> Self {
        if far.x == mid.x {
            return Self::Vertical { x: mid.x };
        }
        if far.y == mid.y {
            return Self::Horizontal { y: mid.y };
        }

        let slope = f64::from(far.y - mid.y) / f64::from(far.x - mid.x);
        let intercept = slope.mul_add(-f64::from(mid.x), f64::from(mid.y));
        let width = f64::from(dimensions.width);
        let height = f64::from(dimensions.height);

        let x_top = (-intercept / slope).trunc();
        let x_bottom = ((height - intercept) / slope).trunc();
        let spans_width = |x: f64| (0.0..=width).contains(&x);

        if spans_width(x_top) && spans_width(x_bottom) {
            Self::Intercepts {
                bottom: Point::new(x_bottom as i32, frame_coord(dimensions.height)),
                top: Point::new(x_top as i32, 0),
            }
        } else {
            tracing::debug!(
                slope,
                intercept,
                x_top,
                x_bottom,
                "caliper intercepts leave the frame, drawing edge to edge"
            );
            Self::EdgeToEdge {
                left: Point::new(0, intercept.trunc() as i32),
                right: Point::new(
                    frame_coord(dimensions.width),
                    slope.mul_add(width, intercept).trunc() as i32,
                ),
            }
        }
    }

    /// Endpoints of the segment to rasterize.
    #[must_use]
    pub fn segment(self, dimensions: Dimensions) -> (Point, Point) {
        match self {
            Self::Vertical { x } => (Point::new(x, 0), Point::new(x, frame_coord(dimensions.height))),
            Self::Horizontal { y } => (Point::new(frame_coord(dimensions.width), y), Point::new(0, y)),
            Self::Intercepts { bottom, top } => (bottom, top),
            Self::EdgeToEdge { left, right } => (left, right),
        }
    }
}

fn frame_coord(extent: u32) -> i32 {
    i32::try_from(extent).unwrap_or(i32::MAX)
}

/// Raster points of the caliper line inside the hull, sorted by `(x, y)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaliperSegment {
    points: Vec<Point>,
    line: CaliperLine,
}

impl CaliperSegment {
    /// The overlapping pixels.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of overlapping pixels: the longest axis length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the line missed the hull entirely.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First and last pixel, used to draw the axis.
    #[must_use]
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        Some((*self.points.first()?, *self.points.last()?))
    }

    /// The full-frame line the segment was cut from.
    #[must_use]
    pub const fn line(&self) -> CaliperLine {
        self.line
    }
}

/// Measure the longest axis of `hull` through `centroid`.
#[must_use]
pub fn measure(
    hull: &ConvexHull,
    centroid: Centroid,
    dimensions: Dimensions,
    line_thickness: u32,
    marker_radius: u32,
) -> CaliperSegment {
    let mid = centroid.pixel();
    let marker = marker_border(mid, marker_radius, dimensions);
    let far = farthest_vertex(hull.vertices(), &marker).unwrap_or(mid);
    let line = CaliperLine::plan(mid, far, dimensions);
    let (from, to) = line.segment(dimensions);

    let mut line_raster = raster::blank(dimensions);
    raster::draw_thick_line(&mut line_raster, from, to, line_thickness);
    let mut hull_raster = raster::blank(dimensions);
    raster::fill_polygon(&mut hull_raster, hull.vertices());

    let points = raster::intersect(&line_raster, &hull_raster);
    tracing::trace!(?mid, ?far, ?line, longest_axis = points.len(), "caliper");
    CaliperSegment { points, line }
}

/// Outer border of a filled disk of `radius` at `center`.
///
/// Falls back to the bare center when the disk leaves no traceable border.
fn marker_border(center: Point, radius: u32, dimensions: Dimensions) -> Vec<Point> {
    let mut canvas = raster::blank(dimensions);
    let radius = i32::try_from(radius).unwrap_or(i32::MAX);
    imageproc::drawing::draw_filled_circle_mut(
        &mut canvas,
        (center.x, center.y),
        radius,
        raster::FOREGROUND,
    );
    contour::largest_outer_border(&canvas).unwrap_or_else(|| vec![center])
}

/// The vertex with the largest absolute distance to `marker`, first on
/// ties.
fn farthest_vertex(vertices: &[Point], marker: &[Point]) -> Option<Point> {
    let mut best: Option<(f64, Point)> = None;
    for &vertex in vertices {
        let distance = signed_distance(marker, vertex).abs();
        if best.is_none_or(|(farthest, _)| distance > farthest) {
            best = Some((distance, vertex));
        }
    }
    best.map(|(_, vertex)| vertex)
}
