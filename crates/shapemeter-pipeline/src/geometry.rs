//! Polygon primitives shared by the measurement stages.
//!
//! Polygons are given as open rings of integer [`Point`]s; the closing edge
//! from the last point back to the first is implied.

use geo::coordinate_position::CoordPos;
use geo::line_measures::{Distance, Length};
use geo::{Area, Coord, CoordinatePosition, Euclidean, Line, LineString, Polygon};

use crate::types::Point;

/// Where a point lies relative to a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Strictly inside.
    Inside,
    /// On an edge or vertex.
    OnBoundary,
    /// Strictly outside.
    Outside,
}

impl Containment {
    /// The classic `+1 / 0 / -1` classification value.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Inside => 1.0,
            Self::OnBoundary => 0.0,
            Self::Outside => -1.0,
        }
    }
}

/// Build a `geo` polygon from an open ring of points.
fn to_polygon(ring: &[Point]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = ring.iter().map(|p| p.to_coord()).collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// Classify `point` against the polygon `ring`.
///
/// Rings with fewer than three points have no interior: a point on one
/// of their vertices or edges is on the boundary, anything else is
/// outside.
#[must_use]
pub fn containment(ring: &[Point], point: Point) -> Containment {
    if ring.len() < 3 {
        return if boundary_distance(ring, point) < f64::EPSILON {
            Containment::OnBoundary
        } else {
            Containment::Outside
        };
    }
    match to_polygon(ring).coordinate_position(&point.to_coord()) {
        CoordPos::Inside => Containment::Inside,
        CoordPos::OnBoundary => Containment::OnBoundary,
        CoordPos::Outside => Containment::Outside,
    }
}

/// Shortest Euclidean distance from `point` to the edges of `ring`.
///
/// Returns `f64::INFINITY` for an empty ring.
#[must_use]
pub fn boundary_distance(ring: &[Point], point: Point) -> f64 {
    let origin = geo::Point::from(point.to_coord());
    match ring {
        [] => f64::INFINITY,
        [only] => point.distance(*only),
        _ => ring
            .iter()
            .zip(ring.iter().cycle().skip(1))
            .map(|(a, b)| Euclidean.distance(&origin, &Line::new(a.to_coord(), b.to_coord())))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Signed distance from `point` to the polygon `ring`: positive inside,
/// negative outside, zero on the boundary.
#[must_use]
pub fn signed_distance(ring: &[Point], point: Point) -> f64 {
    match containment(ring, point) {
        Containment::OnBoundary => 0.0,
        position => position.sign() * boundary_distance(ring, point),
    }
}

/// Length of the closed path through `ring`, including the closing edge.
#[must_use]
pub fn closed_arc_length(ring: &[Point]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }
    let mut coords: Vec<Coord<f64>> = ring.iter().map(|p| p.to_coord()).collect();
    coords.push(ring[0].to_coord());
    Euclidean.length(&LineString::new(coords))
}

/// Unsigned shoelace area of the polygon `ring`.
#[must_use]
pub fn polygon_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    to_polygon(ring).unsigned_area()
}
