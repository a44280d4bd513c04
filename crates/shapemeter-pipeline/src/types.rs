//! Shared types for the shapemeter measurement pipeline.

use std::path::PathBuf;

use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can build masks without
/// depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can consume the annotated
/// overlay without depending on `image` directly.
pub use image::RgbImage;

/// Re-export `DynamicImage`, the accepted input image type (grayscale or
/// color).
pub use image::DynamicImage;

/// Minimum number of contour points for an object to be measurable.
///
/// Five points are required for the convex hull and the ellipse fit to be
/// well defined.
pub const MIN_CONTOUR_POINTS: usize = 5;

/// A pixel position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from left edge).
    pub x: i32,
    /// Row (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }

    pub(crate) fn to_coord(self) -> geo::Coord<f64> {
        geo::Coord {
            x: f64::from(self.x),
            y: f64::from(self.y),
        }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of any `image` buffer.
    #[must_use]
    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned bounding box of a contour polygon.
///
/// `width` and `height` are the polygon's extents (`max - min`), so a
/// square with corners ten pixels apart is ten pixels wide.
///
/// Traced contours run through pixel centres, so for a contour from
/// [`crate::contour`] both extents are one less than the number of
/// pixel columns or rows the object covers: a 10x10 pixel blob is 9x9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left column.
    pub x: i32,
    /// Top row.
    pub y: i32,
    /// Horizontal extent.
    pub width: u32,
    /// Vertical extent.
    pub height: u32,
}

impl BoundingBox {
    /// Bounding box of a non-empty point set.
    ///
    /// Returns `None` for an empty slice.
    #[must_use]
    pub fn of(points: &[Point]) -> Option<Self> {
        let line: LineString<i32> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
        let rect = line.bounding_rect()?;
        Some(Self {
            x: rect.min().x,
            y: rect.min().y,
            width: rect.max().x.abs_diff(rect.min().x),
            height: rect.max().y.abs_diff(rect.min().y),
        })
    }
}

/// What to do with the annotated overlay when debugging is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugMode {
    /// Write `{device}_shapes.png` into `outdir` via the debug sink.
    Print {
        /// Directory the overlay is written to.
        outdir: PathBuf,
    },
    /// Hand the overlay to the debug sink for interactive display.
    Plot,
}

/// Configuration for object analysis.
///
/// Defaults reproduce the reference measurement outputs: a five pixel
/// wide caliper line and a radius-4 centroid marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Stroke width, in pixels, of the rasterized caliper line and of the
    /// overlay annotations. Must be in `1..=MAX_LINE_THICKNESS`.
    ///
    /// The caliper line thickness feeds directly into `longest_axis`,
    /// which counts every pixel of the thick line inside the hull.
    pub line_thickness: u32,

    /// Radius of the centroid marker disk whose border is used as the
    /// reference for selecting the farthest hull vertex. Must be in
    /// `1..=MAX_MARKER_RADIUS`.
    pub marker_radius: u32,

    /// Whether to render the annotated overlay and collect analysis
    /// images.
    pub render_overlay: bool,

    /// Optional debug output of the overlay.
    pub debug: Option<DebugMode>,
}

impl AnalysisConfig {
    /// Default caliper and annotation stroke width.
    pub const DEFAULT_LINE_THICKNESS: u32 = 5;
    /// Default centroid marker radius.
    pub const DEFAULT_MARKER_RADIUS: u32 = 4;
    /// Largest accepted `line_thickness`.
    pub const MAX_LINE_THICKNESS: u32 = 255;
    /// Largest accepted `marker_radius`.
    pub const MAX_MARKER_RADIUS: u32 = 255;

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] when `line_thickness` or
    /// `marker_radius` is zero or above its maximum.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.line_thickness == 0 {
            return Err(AnalysisError::InvalidConfig(
                "line_thickness must be at least 1".to_string(),
            ));
        }
        if self.marker_radius == 0 {
            return Err(AnalysisError::InvalidConfig(
                "marker_radius must be at least 1".to_string(),
            ));
        }
        if self.line_thickness > Self::MAX_LINE_THICKNESS {
            return Err(AnalysisError::InvalidConfig(format!(
                "line_thickness must be at most {} (got {})",
                Self::MAX_LINE_THICKNESS,
                self.line_thickness,
            )));
        }
        if self.marker_radius > Self::MAX_MARKER_RADIUS {
            return Err(AnalysisError::InvalidConfig(format!(
                "marker_radius must be at most {} (got {})",
                Self::MAX_MARKER_RADIUS,
                self.marker_radius,
            )));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            line_thickness: Self::DEFAULT_LINE_THICKNESS,
            marker_radius: Self::DEFAULT_MARKER_RADIUS,
            render_overlay: true,
            debug: None,
        }
    }
}

/// Errors that can occur while analyzing an object.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The contour has too few points to describe a measurable object.
    #[error("object contour has {points} points, at least {MIN_CONTOUR_POINTS} are required")]
    InvalidObject {
        /// Number of points the contour actually had.
        points: usize,
    },

    /// The mask does not have the same size as the image.
    #[error("mask is {mask} but image is {image}")]
    DimensionMismatch {
        /// Image dimensions.
        image: Dimensions,
        /// Mask dimensions.
        mask: Dimensions,
    },

    /// The mask has no object pixels, so no geometry is defined.
    #[error("object mask has zero pixel area")]
    DegenerateArea,

    /// Analysis configuration is invalid.
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),

    /// The debug collaborator failed to print or plot the overlay.
    #[error("debug output failed: {0}")]
    DebugOutput(String),
}
