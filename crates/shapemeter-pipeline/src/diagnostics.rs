//! Measurement diagnostics: timing and key values for each stage.
//!
//! Every measurement runs through [`measure_staged`], which times each
//! stage with a [`Clock`]. [`measure_object`](crate::measure_object)
//! passes [`NoopClock`] and drops the diagnostics;
//! [`measure_with_diagnostics`] takes a real clock and adds the overlay as
//! a final timed stage.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::types::{AnalysisConfig, AnalysisError, Dimensions, Point};
use crate::{ObjectMeasurement, boundary, caliper, ellipse, hull, overlay};

/// Source of timestamps for stage timing.
///
/// Kept abstract so the library needs no platform clock.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that never advances, for measuring without timing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClock;

impl Clock for NoopClock {
    type Instant = ();

    fn now(&self) -> Self::Instant {}

    fn elapsed(&self, _: &Self::Instant) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from measuring one object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementDiagnostics {
    /// Pixel area and centroid.
    pub moments: StageDiagnostics,
    /// Convex hull and contour descriptors.
    pub hull: StageDiagnostics,
    /// Ellipse fit.
    pub ellipse: StageDiagnostics,
    /// Frame contact test.
    pub boundary: StageDiagnostics,
    /// Longest axis.
    pub caliper: StageDiagnostics,
    /// Overlay rendering (only when `config.render_overlay == true`).
    pub overlay: Option<StageDiagnostics>,
    /// Total wall-clock duration (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Input sizes.
    pub summary: MeasurementSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific values.
    pub metrics: StageMetrics,
}

/// Stage-specific values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Moment computation.
    Moments {
        /// Nonzero mask pixels.
        pixel_area: u64,
        /// Centroid x.
        centroid_x: f64,
        /// Centroid y.
        centroid_y: f64,
    },
    /// Convex hull analysis.
    Hull {
        /// Number of hull vertices.
        hull_vertices: usize,
        /// Hull polygon area.
        hull_area: f64,
        /// Pixel area over hull area.
        solidity: f64,
    },
    /// Ellipse fit.
    Ellipse {
        /// Full major axis.
        major_axis: f64,
        /// Full minor axis.
        minor_axis: f64,
        /// Major axis angle in degrees.
        angle: f64,
    },
    /// Frame contact test.
    Boundary {
        /// Whether every contour point is inside the frame.
        in_bounds: bool,
    },
    /// Longest axis.
    Caliper {
        /// The rasterized line.
        line: caliper::CaliperLine,
        /// Pixels inside the hull.
        longest_axis: usize,
    },
    /// Overlay rendering.
    Overlay {
        /// Overlay width in pixels.
        width: u32,
        /// Overlay height in pixels.
        height: u32,
    },
}

/// Input sizes of the measured object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Points in the object contour.
    pub contour_points: usize,
    /// Nonzero mask pixels.
    pub pixel_area: u64,
}

impl MeasurementDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Measurement Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}  |  Contour points: {}  |  Pixel area: {}",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.contour_points,
            self.summary.pixel_area,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![
            ("Moments", &self.moments),
            ("Convex Hull", &self.hull),
            ("Ellipse Fit", &self.ellipse),
            ("Boundary", &self.boundary),
            ("Caliper", &self.caliper),
        ];
        if let Some(ref o) = self.overlay {
            stages.push(("Overlay", o));
        }

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Moments {
            pixel_area,
            centroid_x,
            centroid_y,
        } => format!("area={pixel_area} centroid=({centroid_x:.2}, {centroid_y:.2})"),
        StageMetrics::Hull {
            hull_vertices,
            hull_area,
            solidity,
        } => format!("{hull_vertices} vertices, area={hull_area:.1} solidity={solidity:.3}"),
        StageMetrics::Ellipse {
            major_axis,
            minor_axis,
            angle,
        } => format!("axes={major_axis:.2}x{minor_axis:.2} angle={angle:.1}"),
        StageMetrics::Boundary { in_bounds } => format!("in_bounds={in_bounds}"),
        StageMetrics::Caliper { line, longest_axis } => {
            let case = match line {
                caliper::CaliperLine::Vertical { .. } => "vertical",
                caliper::CaliperLine::Horizontal { .. } => "horizontal",
                caliper::CaliperLine::Intercepts { .. } => "intercepts",
                caliper::CaliperLine::EdgeToEdge { .. } => "edge-to-edge",
            };
            format!("{case} line, longest_axis={longest_axis}")
        }
        StageMetrics::Overlay { width, height } => format!("{width}x{height}"),
    }
}

/// Run `f`, returning its value and the time it took.
fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let value = f();
    (value, clock.elapsed(&start))
}

/// Run every measurement stage under `clock`.
///
/// The overlay stage is left empty.
pub(crate) fn measure_staged<C: Clock>(
    dimensions: Dimensions,
    contour: &[Point],
    mask: &GrayImage,
    config: &AnalysisConfig,
    clock: &C,
) -> Result<(ObjectMeasurement, MeasurementDiagnostics), AnalysisError> {
    let total_start = clock.now();
    crate::validate(dimensions, contour, mask, config)?;

    let (moments, moments_duration) = timed(clock, || crate::PrimaryMoments::of(mask));
    let centroid = moments.centroid().ok_or(AnalysisError::DegenerateArea)?;

    let (hull_result, hull_duration) = timed(clock, || hull::analyze(contour, moments.area()));
    let (convex_hull, hull_metrics) = hull_result.ok_or(AnalysisError::InvalidObject {
        points: contour.len(),
    })?;

    let (ellipse_result, ellipse_duration) = timed(clock, || ellipse::fit(contour));
    let fitted = ellipse_result.ok_or(AnalysisError::InvalidObject {
        points: contour.len(),
    })?;

    let (in_bounds, boundary_duration) = timed(clock, || boundary::in_bounds(contour, dimensions));

    let (segment, caliper_duration) = timed(clock, || {
        caliper::measure(
            &convex_hull,
            centroid,
            dimensions,
            config.line_thickness,
            config.marker_radius,
        )
    });

    let diagnostics = MeasurementDiagnostics {
        moments: StageDiagnostics {
            duration: moments_duration,
            metrics: StageMetrics::Moments {
                pixel_area: moments.area(),
                centroid_x: centroid.x,
                centroid_y: centroid.y,
            },
        },
        hull: StageDiagnostics {
            duration: hull_duration,
            metrics: StageMetrics::Hull {
                hull_vertices: hull_metrics.hull_vertices,
                hull_area: hull_metrics.hull_area,
                solidity: hull_metrics.solidity,
            },
        },
        ellipse: StageDiagnostics {
            duration: ellipse_duration,
            metrics: StageMetrics::Ellipse {
                major_axis: fitted.major_axis,
                minor_axis: fitted.minor_axis,
                angle: fitted.angle,
            },
        },
        boundary: StageDiagnostics {
            duration: boundary_duration,
            metrics: StageMetrics::Boundary { in_bounds },
        },
        caliper: StageDiagnostics {
            duration: caliper_duration,
            metrics: StageMetrics::Caliper {
                line: segment.line(),
                longest_axis: segment.len(),
            },
        },
        overlay: None,
        total_duration: clock.elapsed(&total_start),
        summary: MeasurementSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            contour_points: contour.len(),
            pixel_area: moments.area(),
        },
    };

    let measurement = ObjectMeasurement::assemble(
        moments,
        centroid,
        convex_hull,
        hull_metrics,
        fitted,
        in_bounds,
        segment,
    );
    Ok((measurement, diagnostics))
}

/// Measure one object, collecting per-stage diagnostics.
///
/// The overlay is rendered when `config.render_overlay` is set.
///
/// # Errors
///
/// The same errors as [`measure_object`](crate::measure_object).
pub fn measure_with_diagnostics<C: Clock>(
    image: &DynamicImage,
    contour: &[Point],
    mask: &GrayImage,
    config: &AnalysisConfig,
    clock: &C,
) -> Result<(ObjectMeasurement, Option<RgbImage>, MeasurementDiagnostics), AnalysisError> {
    let total_start = clock.now();
    let (measurement, mut diagnostics) =
        measure_staged(Dimensions::of(image), contour, mask, config, clock)?;

    let rendered = if config.render_overlay {
        let (rendered, duration) = timed(clock, || {
            overlay::render(image, contour, &measurement, config.line_thickness)
        });
        let (width, height) = rendered.dimensions();
        diagnostics.overlay = Some(StageDiagnostics {
            duration,
            metrics: StageMetrics::Overlay { width, height },
        });
        Some(rendered)
    } else {
        None
    };
    diagnostics.total_duration = clock.elapsed(&total_start);

    Ok((measurement, rendered, diagnostics))
}
