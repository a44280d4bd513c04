//! Best-fit ellipse of a contour.
//!
//! The primary fit is the direct least-squares method of Fitzgibbon et al.
//! in the numerically stable form of Halíř and Flusser (1998): the conic
//! design matrix is split into quadratic and linear parts, the linear part
//! is eliminated, and the remaining 3×3 eigenproblem is solved for the one
//! eigenvector satisfying the ellipse constraint `4AC − B² > 0`. Points are
//! shifted to their mean and scaled before fitting for conditioning.
//!
//! When the direct fit is undefined (collinear or too few points, or no
//! eigenvector is an ellipse) the second-moment ellipse of the contour
//! points is used instead.
//!
//! Axis lengths are full lengths (diameters): a circle of radius 20 fits
//! with both axes close to 40.

use nalgebra::{Matrix2, Matrix3, SymmetricEigen, Vector3};
use serde::{Deserialize, Serialize};

use crate::types::{MIN_CONTOUR_POINTS, Point};

/// A fitted ellipse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    /// Center x coordinate.
    pub center_x: f64,
    /// Center y coordinate.
    pub center_y: f64,
    /// Full length of the major axis.
    pub major_axis: f64,
    /// Full length of the minor axis (`<= major_axis`).
    pub minor_axis: f64,
    /// Rotation of the major axis in degrees, in `[0, 180)`, measured from
    /// the +x axis toward +y (clockwise on screen).
    pub angle: f64,
}

impl Ellipse {
    /// `sqrt(1 − (minor/major)²)`, or `None` when the major axis is zero.
    #[must_use]
    pub fn eccentricity(&self) -> Option<f64> {
        if self.major_axis <= 0.0 {
            return None;
        }
        let ratio = self.minor_axis / self.major_axis;
        Some(ratio.mul_add(-ratio, 1.0).max(0.0).sqrt())
    }

    fn is_valid(&self) -> bool {
        self.major_axis > 0.0
            && self.minor_axis > 0.0
            && self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.major_axis.is_finite()
            && self.minor_axis.is_finite()
            && self.angle.is_finite()
    }
}

/// Fit an ellipse to `contour`.
///
/// Returns `None` only for an empty contour.
#[must_use]
pub fn fit(contour: &[Point]) -> Option<Ellipse> {
    if contour.is_empty() {
        return None;
    }
    let points: Vec<[f64; 2]> = contour
        .iter()
        .map(|p| [f64::from(p.x), f64::from(p.y)])
        .collect();

    if let Some(ellipse) = fit_direct(&points) {
        return Some(ellipse);
    }
    tracing::warn!(
        points = points.len(),
        "direct ellipse fit undefined, using second-moment ellipse"
    );
    Some(fit_moments(&points))
}

/// Halíř–Flusser direct least-squares fit.
fn fit_direct(points: &[[f64; 2]]) -> Option<Ellipse> {
    if points.len() < MIN_CONTOUR_POINTS {
        return None;
    }
    let (mean_x, mean_y, scale) = normalization(points);

    let mut s1 = Matrix3::<f64>::zeros();
    let mut s2 = Matrix3::<f64>::zeros();
    let mut s3 = Matrix3::<f64>::zeros();
    for &[px, py] in points {
        let x = (px - mean_x) * scale;
        let y = (py - mean_y) * scale;
        let quad = Vector3::new(x * x, x * y, y * y);
        let lin = Vector3::new(x, y, 1.0);
        s1 += quad * quad.transpose();
        s2 += quad * lin.transpose();
        s3 += lin * lin.transpose();
    }

    // Collinear points make the linear scatter singular.
    let s3_norm = s3.norm();
    if s3.determinant().abs() <= 1e-10 * s3_norm * s3_norm * s3_norm {
        return None;
    }
    let s3_inv = s3.try_inverse()?;
    let t = -s3_inv * s2.transpose();
    let m = s1 + s2 * t;

    // Premultiply by the inverse constraint matrix
    //   C1 = [[0, 0, 2], [0, -1, 0], [2, 0, 0]].
    let reduced = Matrix3::new(
        m[(2, 0)] / 2.0,
        m[(2, 1)] / 2.0,
        m[(2, 2)] / 2.0,
        -m[(1, 0)],
        -m[(1, 1)],
        -m[(1, 2)],
        m[(0, 0)] / 2.0,
        m[(0, 1)] / 2.0,
        m[(0, 2)] / 2.0,
    );

    let a1 = ellipse_eigenvector(&reduced)?;
    let a2 = t * a1;
    let conic = denormalize(
        [a1[0], a1[1], a1[2], a2[0], a2[1], a2[2]],
        mean_x,
        mean_y,
        scale,
    );
    conic_to_ellipse(conic).filter(Ellipse::is_valid)
}

/// Mean and isotropic scale that brings the mean distance from the
/// centroid to `sqrt(2)`.
#[allow(clippy::cast_precision_loss)]
fn normalization(points: &[[f64; 2]]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| (p[0] - mean_x).hypot(p[1] - mean_y))
        .sum::<f64>()
        / n;
    let scale = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    (mean_x, mean_y, scale)
}

/// Eigenvector of the reduced system that satisfies the ellipse
/// constraint, preferring the smallest eigenvalue magnitude.
fn ellipse_eigenvector(system: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let a = system;
    let trace = a.trace();
    let minor_sum = a[(0, 0)].mul_add(a[(1, 1)], -(a[(0, 1)] * a[(1, 0)]))
        + a[(0, 0)].mul_add(a[(2, 2)], -(a[(0, 2)] * a[(2, 0)]))
        + a[(1, 1)].mul_add(a[(2, 2)], -(a[(1, 2)] * a[(2, 1)]));
    let det = a.determinant();

    let mut best: Option<(f64, Vector3<f64>)> = None;
    for ev in real_cubic_roots(-trace, minor_sum, -det) {
        let Some(v) = null_vector(&(system - Matrix3::identity() * ev)) else {
            continue;
        };
        let constraint = (4.0 * v[0]).mul_add(v[2], -(v[1] * v[1]));
        if constraint > 0.0 && best.is_none_or(|(best_ev, _)| ev.abs() < best_ev) {
            best = Some((ev.abs(), v));
        }
    }
    best.map(|(_, v)| v)
}

/// Null vector of a rank-2 3×3 matrix: the largest row of its adjugate.
fn null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let rows = [
        Vector3::new(
            m[(1, 1)].mul_add(m[(2, 2)], -(m[(1, 2)] * m[(2, 1)])),
            -m[(1, 0)].mul_add(m[(2, 2)], -(m[(1, 2)] * m[(2, 0)])),
            m[(1, 0)].mul_add(m[(2, 1)], -(m[(1, 1)] * m[(2, 0)])),
        ),
        Vector3::new(
            -m[(0, 1)].mul_add(m[(2, 2)], -(m[(0, 2)] * m[(2, 1)])),
            m[(0, 0)].mul_add(m[(2, 2)], -(m[(0, 2)] * m[(2, 0)])),
            -m[(0, 0)].mul_add(m[(2, 1)], -(m[(0, 1)] * m[(2, 0)])),
        ),
        Vector3::new(
            m[(0, 1)].mul_add(m[(1, 2)], -(m[(0, 2)] * m[(1, 1)])),
            -m[(0, 0)].mul_add(m[(1, 2)], -(m[(0, 2)] * m[(1, 0)])),
            m[(0, 0)].mul_add(m[(1, 1)], -(m[(0, 1)] * m[(1, 0)])),
        ),
    ];
    let best = rows
        .into_iter()
        .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))?;
    let norm = best.norm();
    if norm < 1e-15 {
        return None;
    }
    Some(best / norm)
}

/// Real roots of the monic cubic `x³ + b x² + c x + d`.
fn real_cubic_roots(b: f64, c: f64, d: f64) -> Vec<f64> {
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = -b / 3.0;
    let disc = -4.0 * p * p * p - 27.0 * q * q;

    if disc >= 0.0 {
        let r = (-p / 3.0).max(0.0).sqrt();
        let cos_arg = if r < 1e-15 {
            0.0
        } else {
            (-q / (2.0 * r * r * r)).clamp(-1.0, 1.0)
        };
        let theta = cos_arg.acos();
        let tau = std::f64::consts::TAU;
        (0..3)
            .map(|k| {
                let angle = f64::from(k).mul_add(tau, theta) / 3.0;
                (2.0 * r).mul_add(angle.cos(), shift)
            })
            .collect()
    } else {
        let sqrt_disc = (q * q / 4.0 + p * p * p / 27.0).sqrt();
        let u = (-q / 2.0 + sqrt_disc).cbrt();
        let v = (-q / 2.0 - sqrt_disc).cbrt();
        vec![u + v + shift]
    }
}

/// Undo the normalization `x' = s(x − mx)`, `y' = s(y − my)` on conic
/// coefficients `[A, B, C, D, E, F]`.
fn denormalize(c: [f64; 6], mx: f64, my: f64, s: f64) -> [f64; 6] {
    let [a, b, cc, d, e, f] = c;
    let s2 = s * s;
    [
        a * s2,
        b * s2,
        cc * s2,
        -2.0 * a * s2 * mx - b * s2 * my + d * s,
        -b * s2 * mx - 2.0 * cc * s2 * my + e * s,
        a * s2 * mx * mx + b * s2 * mx * my + cc * s2 * my * my - d * s * mx - e * s * my + f,
    ]
}

/// Geometric parameters of the conic `Ax² + Bxy + Cy² + Dx + Ey + F = 0`.
fn conic_to_ellipse([a, b, c, d, e, f]: [f64; 6]) -> Option<Ellipse> {
    let denom = (4.0 * a).mul_add(c, -(b * b));
    if denom <= 0.0 {
        return None;
    }
    let cx = b.mul_add(e, -(2.0 * c * d)) / denom;
    let cy = b.mul_add(d, -(2.0 * a * e)) / denom;
    let value_at_center = a * cx * cx + b * cx * cy + c * cy * cy + d * cx + e * cy + f;

    let quadratic = Matrix2::new(a, b / 2.0, b / 2.0, c);
    let eigen = SymmetricEigen::new(quadratic);
    let semi_sq = [
        -value_at_center / eigen.eigenvalues[0],
        -value_at_center / eigen.eigenvalues[1],
    ];
    if semi_sq.iter().any(|&v| v <= 0.0 || !v.is_finite()) {
        return None;
    }
    let major_idx = usize::from(semi_sq[1] > semi_sq[0]);
    let minor_idx = 1 - major_idx;
    let direction = eigen.eigenvectors.column(major_idx);

    Some(Ellipse {
        center_x: cx,
        center_y: cy,
        major_axis: 2.0 * semi_sq[major_idx].sqrt(),
        minor_axis: 2.0 * semi_sq[minor_idx].sqrt(),
        angle: axis_angle_degrees(direction[0], direction[1]),
    })
}

/// Second-moment ellipse of a point set, treating the points as samples of
/// an ellipse outline.
#[allow(clippy::cast_precision_loss)]
fn fit_moments(points: &[[f64; 2]]) -> Ellipse {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &[x, y] in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let covariance = Matrix2::new(sxx / n, sxy / n, sxy / n, syy / n);
    let eigen = SymmetricEigen::new(covariance);
    let major_idx = usize::from(eigen.eigenvalues[1] > eigen.eigenvalues[0]);
    let minor_idx = 1 - major_idx;
    // Points spread uniformly on an outline with semi-axis `a` have
    // variance `a² / 2` along that axis.
    let full_axis = |variance: f64| 2.0 * (2.0 * variance.max(0.0)).sqrt();
    let direction = eigen.eigenvectors.column(major_idx);

    Ellipse {
        center_x: mean_x,
        center_y: mean_y,
        major_axis: full_axis(eigen.eigenvalues[major_idx]),
        minor_axis: full_axis(eigen.eigenvalues[minor_idx]),
        angle: axis_angle_degrees(direction[0], direction[1]),
    }
}

/// Orientation of the direction `(x, y)` folded into `[0, 180)` degrees.
fn axis_angle_degrees(x: f64, y: f64) -> f64 {
    let degrees = y.atan2(x).to_degrees().rem_euclid(180.0);
    if degrees >= 180.0 { 0.0 } else { degrees }
}
