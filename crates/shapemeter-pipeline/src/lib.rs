//! shapemeter-pipeline: shape descriptors for one segmented object (sans-IO).
//!
//! Given an image, the object's boundary contour and its binary mask,
//! computes:
//!
//! pixel area and centroid -> convex hull, solidity, perimeter, bounding
//! box -> best-fit ellipse -> frame contact -> longest axis through the
//! centroid.
//!
//! The results form one [`ShapeMeasurementRecord`], which
//! [`analyze_object`] appends to the context's [`MeasurementSink`] together
//! with an annotated overlay image. [`measure_object`] is the same
//! computation without any side effects and can run in parallel across
//! objects.
//!
//! This crate has **no I/O dependencies**. Writing debug images and
//! displaying them is delegated to a [`DebugSink`] supplied by the caller.

pub mod boundary;
pub mod caliper;
pub mod context;
pub mod contour;
pub mod diagnostics;
pub mod ellipse;
pub mod geometry;
pub mod hull;
pub mod moments;
pub mod overlay;
pub mod raster;
pub mod record;
pub mod types;

pub use caliper::{CaliperLine, CaliperSegment};
pub use context::{AnalysisContext, AnalysisImages, DebugSink};
pub use diagnostics::{Clock, MeasurementDiagnostics, NoopClock};
pub use ellipse::Ellipse;
pub use hull::{ConvexHull, HullMetrics};
pub use moments::{Centroid, PrimaryMoments};
pub use record::{
    DataType, MeasurementSink, MeasurementValue, Observation, Outputs, Scale, SharedSink,
    ShapeMeasurementRecord,
};
pub use types::{
    AnalysisConfig, AnalysisError, BoundingBox, DebugMode, Dimensions, DynamicImage, GrayImage,
    MIN_CONTOUR_POINTS, Point, RgbImage,
};

/// Everything computed for one object.
///
/// Besides the record, keeps the intermediate geometry the overlay and
/// callers may want to inspect.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeasurement {
    /// The measurement record.
    pub record: ShapeMeasurementRecord,
    /// Center of mass of the mask.
    pub centroid: Centroid,
    /// Convex hull of the contour.
    pub hull: ConvexHull,
    /// Bounding box of the contour.
    pub bounding_box: BoundingBox,
    /// Fitted ellipse.
    pub ellipse: Ellipse,
    /// Caliper pixels along the longest axis.
    pub caliper: CaliperSegment,
}

impl ObjectMeasurement {
    /// Combine component results into the record.
    pub(crate) fn assemble(
        moments: PrimaryMoments,
        centroid: Centroid,
        hull: ConvexHull,
        hull_metrics: HullMetrics,
        ellipse: Ellipse,
        in_bounds: bool,
        caliper: CaliperSegment,
    ) -> Self {
        let record = ShapeMeasurementRecord {
            pixel_area: moments.area(),
            area: hull_metrics.hull_area,
            solidity: hull_metrics.solidity,
            perimeter: hull_metrics.perimeter,
            width: hull_metrics.bounding_box.width,
            height: hull_metrics.bounding_box.height,
            longest_axis: caliper.len() as u64,
            center_of_mass_x: centroid.x,
            center_of_mass_y: centroid.y,
            hull_vertices: hull_metrics.hull_vertices as u64,
            in_bounds,
            ellipse_center_x: ellipse.center_x,
            ellipse_center_y: ellipse.center_y,
            ellipse_major_axis: ellipse.major_axis,
            ellipse_minor_axis: ellipse.minor_axis,
            ellipse_angle: ellipse.angle,
            ellipse_eccentricity: ellipse.eccentricity(),
        };
        Self {
            record,
            centroid,
            hull,
            bounding_box: hull_metrics.bounding_box,
            ellipse,
            caliper,
        }
    }
}

/// Check the inputs of one measurement.
///
/// # Errors
///
/// See [`measure_object`].
pub(crate) fn validate(
    dimensions: Dimensions,
    contour: &[Point],
    mask: &GrayImage,
    config: &AnalysisConfig,
) -> Result<(), AnalysisError> {
    if contour.len() < MIN_CONTOUR_POINTS {
        return Err(AnalysisError::InvalidObject {
            points: contour.len(),
        });
    }
    config.validate()?;
    let mask_dimensions = Dimensions::of(mask);
    if mask_dimensions != dimensions {
        return Err(AnalysisError::DimensionMismatch {
            image: dimensions,
            mask: mask_dimensions,
        });
    }
    Ok(())
}

/// Measure one object in an image of `dimensions`.
///
/// Pure: nothing outside the returned value is touched.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidObject`] if `contour` has fewer than
/// [`MIN_CONTOUR_POINTS`] points.
/// Returns [`AnalysisError::InvalidConfig`] if `config` is invalid.
/// Returns [`AnalysisError::DimensionMismatch`] if `mask` is not of
/// `dimensions`.
/// Returns [`AnalysisError::DegenerateArea`] if `mask` has no nonzero
/// pixels.
pub fn measure_object(
    dimensions: Dimensions,
    contour: &[Point],
    mask: &GrayImage,
    config: &AnalysisConfig,
) -> Result<ObjectMeasurement, AnalysisError> {
    diagnostics::measure_staged(dimensions, contour, mask, config, &NoopClock)
        .map(|(measurement, _)| measurement)
}

/// Analyze one object and emit its record.
///
/// Advances the context's invocation counter, measures the object, appends
/// every observation of the record to the sink and, when overlays are
/// enabled, collects the overlay and mask images and performs the
/// configured debug output.
///
/// Rejected objects leave the sink and image list untouched.
///
/// # Errors
///
/// Any error of [`measure_object`], or [`AnalysisError::DebugOutput`] if
/// the debug collaborator fails. A debug failure happens after the record
/// was emitted.
pub fn analyze_object<S: MeasurementSink>(
    ctx: &mut AnalysisContext<S>,
    image: &DynamicImage,
    contour: &[Point],
    mask: &GrayImage,
) -> Result<ShapeMeasurementRecord, AnalysisError> {
    analyze_object_with_diagnostics(ctx, image, contour, mask, &NoopClock).map(|(record, _)| record)
}

/// [`analyze_object`], timing every stage with `clock`.
///
/// The object is measured once; the returned diagnostics describe the
/// same measurement that was emitted.
///
/// # Errors
///
/// The same errors as [`analyze_object`].
pub fn analyze_object_with_diagnostics<S: MeasurementSink, C: Clock>(
    ctx: &mut AnalysisContext<S>,
    image: &DynamicImage,
    contour: &[Point],
    mask: &GrayImage,
    clock: &C,
) -> Result<(ShapeMeasurementRecord, MeasurementDiagnostics), AnalysisError> {
    let device = ctx.next_device();
    let _span = tracing::debug_span!("analyze_object", device).entered();

    let (measurement, overlay, diagnostics) =
        match diagnostics::measure_with_diagnostics(image, contour, mask, ctx.config(), clock) {
            Ok(measured) => measured,
            Err(e) => {
                tracing::debug!(error = %e, "object rejected");
                return Err(e);
            }
        };

    measurement.record.emit(ctx.sink_mut());
    tracing::debug!(
        pixel_area = measurement.record.pixel_area,
        longest_axis = measurement.record.longest_axis,
        in_bounds = measurement.record.in_bounds,
        "object measured"
    );

    if let Some(overlay) = overlay {
        let debug_result = ctx.debug_output(&overlay);
        ctx.push_images(AnalysisImages {
            overlay,
            mask: mask.clone(),
        });
        debug_result?;
    } else if ctx.config().debug.is_some() {
        tracing::debug!("overlay rendering disabled, no debug output");
    }

    Ok((measurement.record, diagnostics))
}
