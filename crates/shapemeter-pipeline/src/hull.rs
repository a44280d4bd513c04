//! Convex hull and the descriptors derived from it.
//!
//! The hull is computed with `geo`'s QuickHull on the contour points.
//! Collinear vertices are removed so that `hull_vertices` counts corners
//! only: a rasterized square with dozens of edge pixels has four.

use geo::{ConvexHull as _, MultiPoint};
use serde::{Deserialize, Serialize};

use crate::geometry::{closed_arc_length, polygon_area};
use crate::types::{BoundingBox, Point};

/// Ordered vertices of the convex polygon enclosing a contour.
///
/// Degenerate inputs yield degenerate hulls: a single vertex when all
/// points coincide, two vertices when all points are collinear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvexHull(Vec<Point>);

impl ConvexHull {
    /// Compute the convex hull of `points`.
    #[must_use]
    pub fn of(points: &[Point]) -> Self {
        if points.is_empty() {
            return Self(Vec::new());
        }

        let multi: MultiPoint<f64> = points
            .iter()
            .map(|p| geo::Point::from(p.to_coord()))
            .collect();
        let polygon = multi.convex_hull();

        #[allow(clippy::cast_possible_truncation)]
        let mut ring: Vec<Point> = polygon
            .exterior()
            .coords()
            .map(|c| Point::new(c.x.round() as i32, c.y.round() as i32))
            .collect();
        ring.dedup();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }

        if polygon_area(&ring) < 0.5 {
            return Self(degenerate_extremes(points));
        }

        remove_collinear(&mut ring);
        Self(ring)
    }

    /// The hull vertices, without repeating the first one at the end.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        &self.0
    }

    /// Number of hull vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the hull has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shoelace area of the hull polygon.
    #[must_use]
    pub fn area(&self) -> f64 {
        polygon_area(&self.0)
    }
}

/// Hull of a zero-area point set: its two lexicographic extremes, or a
/// single point when they coincide.
fn degenerate_extremes(points: &[Point]) -> Vec<Point> {
    let min = points.iter().min().copied();
    let max = points.iter().max().copied();
    match (min, max) {
        (Some(a), Some(b)) if a == b => vec![a],
        (Some(a), Some(b)) => vec![a, b],
        _ => Vec::new(),
    }
}

/// Drop vertices that lie on the segment between their neighbours.
fn remove_collinear(ring: &mut Vec<Point>) {
    let mut i = 0;
    while ring.len() > 3 && i < ring.len() {
        let n = ring.len();
        let prev = ring[(i + n - 1) % n];
        let cur = ring[i];
        let next = ring[(i + 1) % n];
        let cross = i64::from(cur.x - prev.x) * i64::from(next.y - prev.y)
            - i64::from(cur.y - prev.y) * i64::from(next.x - prev.x);
        if cross == 0 {
            ring.remove(i);
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
}

/// Contour descriptors computed alongside the convex hull.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HullMetrics {
    /// Number of hull vertices.
    pub hull_vertices: usize,
    /// Area of the hull polygon.
    pub hull_area: f64,
    /// Object pixel area divided by hull area; 1 for degenerate hulls.
    pub solidity: f64,
    /// Closed arc length of the input contour.
    pub perimeter: f64,
    /// Bounding box of the input contour.
    pub bounding_box: BoundingBox,
}

/// Solidity of an object with `pixel_area` pixels and the given hull area.
///
/// A hull whose area truncates to zero is degenerate and has solidity 1.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn solidity(pixel_area: u64, hull_area: f64) -> f64 {
    if hull_area.trunc() as i64 == 0 {
        return 1.0;
    }
    pixel_area as f64 / hull_area
}

/// Compute the hull of `contour` and its derived descriptors.
///
/// Returns `None` for an empty contour.
#[must_use]
pub fn analyze(contour: &[Point], pixel_area: u64) -> Option<(ConvexHull, HullMetrics)> {
    let bounding_box = BoundingBox::of(contour)?;
    let hull = ConvexHull::of(contour);
    let hull_area = hull.area();
    if hull_area < 1.0 {
        tracing::debug!(hull_area, "degenerate convex hull, solidity defaults to 1");
    }
    let metrics = HullMetrics {
        hull_vertices: hull.len(),
        hull_area,
        solidity: solidity(pixel_area, hull_area),
        perimeter: closed_arc_length(contour),
        bounding_box,
    };
    Some((hull, metrics))
}
