//! Annotated overlay for visual checks of a measurement.
//!
//! Annotations are stroked with `tiny-skia` onto an RGB copy of the input
//! image: the contour in blue, everything else in magenta.

use image::{DynamicImage, Rgb, RgbImage};
use tiny_skia::{LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

use crate::ObjectMeasurement;
use crate::types::Point;

/// Stroke color of the object contour.
pub const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Stroke color of the hull, bounding box, centroid and caliper.
pub const ANNOTATION_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

/// Radius of the circle drawn around the centroid.
const CENTROID_CIRCLE_RADIUS: f32 = 10.0;

/// Render the overlay for `measurement` of the object outlined by
/// `contour`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn render(
    image: &DynamicImage,
    contour: &[Point],
    measurement: &ObjectMeasurement,
    line_thickness: u32,
) -> RgbImage {
    let base = image.to_rgb8();
    let (width, height) = base.dimensions();
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return base;
    };
    for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(base.pixels()) {
        dst.copy_from_slice(&[src.0[0], src.0[1], src.0[2], 255]);
    }

    let stroke = Stroke {
        width: line_thickness as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    let bbox = measurement.bounding_box;
    let mark_x = measurement.centroid.pixel().x;
    let bbox_right = bbox.x.saturating_add_unsigned(bbox.width);
    let bbox_bottom = bbox.y.saturating_add_unsigned(bbox.height);

    let annotations = [
        polyline(measurement.hull.vertices(), true),
        polyline(&[Point::new(bbox.x, bbox.y), Point::new(bbox_right, bbox.y)], false),
        polyline(&[Point::new(mark_x, bbox.y), Point::new(mark_x, bbox_bottom)], false),
        PathBuilder::from_circle(
            measurement.centroid.x as f32 + 0.5,
            measurement.centroid.y as f32 + 0.5,
            CENTROID_CIRCLE_RADIUS,
        ),
        measurement
            .caliper
            .endpoints()
            .and_then(|(a, b)| polyline(&[a, b], false)),
    ];

    stroke_onto(&mut pixmap, polyline(contour, true).as_ref(), CONTOUR_COLOR, &stroke);
    for path in &annotations {
        stroke_onto(&mut pixmap, path.as_ref(), ANNOTATION_COLOR, &stroke);
    }

    // Every stroke is opaque over an opaque base, so the premultiplied
    // pixmap data is already straight RGB.
    let mut out = RgbImage::new(width, height);
    for (dst, src) in out.pixels_mut().zip(pixmap.data().chunks_exact(4)) {
        *dst = Rgb([src[0], src[1], src[2]]);
    }
    out
}

/// Path through pixel centres of `points`, optionally closed.
///
/// Returns `None` for paths `tiny-skia` cannot build, such as a single
/// point.
#[allow(clippy::cast_precision_loss)]
fn polyline(points: &[Point], closed: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32 + 0.5, first.y as f32 + 0.5);
    for p in rest {
        pb.line_to(p.x as f32 + 0.5, p.y as f32 + 0.5);
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

fn stroke_onto(pixmap: &mut Pixmap, path: Option<&Path>, color: Rgb<u8>, stroke: &Stroke) {
    let Some(path) = path else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.0[0], color.0[1], color.0[2], 255);
    paint.anti_alias = true;
    pixmap.stroke_path(path, &paint, stroke, Transform::identity(), None);
}
