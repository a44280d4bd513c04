//! Integration tests: measure synthetic objects through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use shapemeter_pipeline::{
    AnalysisConfig, AnalysisContext, AnalysisError, DebugMode, DebugSink, Dimensions,
    DynamicImage, GrayImage, MeasurementValue, Outputs, Point, RgbImage, SharedSink,
    NoopClock, analyze_object, analyze_object_with_diagnostics, measure_object,
};

/// Set every pixel with `x0 <= x < x1` and `y0 <= y < y1`.
fn fill_rect(mask: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    for y in y0..y1 {
        for x in x0..x1 {
            mask.put_pixel(x, y, image::Luma([255]));
        }
    }
}

/// Polygon through the outer pixel corners of a filled rectangle, with an
/// extra point halfway down the left edge.
fn corner_contour(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point> {
    vec![
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
        Point::new(x0, (y0 + y1) / 2),
    ]
}

fn blank_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::new(width, height))
}

fn traced_contour(mask: &GrayImage) -> Vec<Point> {
    shapemeter_pipeline::contour::largest_outer_border(mask).unwrap()
}

fn value(outputs: &Outputs, variable: &str) -> MeasurementValue {
    outputs.get(variable).unwrap().value
}

fn float(outputs: &Outputs, variable: &str) -> f64 {
    match value(outputs, variable) {
        MeasurementValue::Float(v) => v,
        other => panic!("{variable} is not a float: {other:?}"),
    }
}

fn context() -> AnalysisContext<Outputs> {
    AnalysisContext::new(AnalysisConfig::default(), Outputs::new()).unwrap()
}

#[test]
fn short_contour_is_rejected_without_side_effects() {
    let mut ctx = context();
    let mut mask = GrayImage::new(50, 50);
    fill_rect(&mut mask, 10, 10, 20, 20);
    let contour = [
        Point::new(10, 10),
        Point::new(20, 10),
        Point::new(20, 20),
        Point::new(10, 20),
    ];

    let result = analyze_object(&mut ctx, &blank_image(50, 50), &contour, &mask);

    assert!(matches!(
        result,
        Err(AnalysisError::InvalidObject { points: 4 })
    ));
    assert!(ctx.sink().is_empty());
    assert!(ctx.images().is_empty());
    assert_eq!(ctx.device(), 1);
}

#[test]
fn square_scenario() {
    let mut ctx = context();
    let mut mask = GrayImage::new(80, 80);
    fill_rect(&mut mask, 20, 30, 30, 40);
    let contour = corner_contour(20, 30, 30, 40);

    let record = analyze_object(&mut ctx, &blank_image(80, 80), &contour, &mask).unwrap();

    assert_eq!(record.pixel_area, 100);
    assert_eq!(record.width, 10);
    assert_eq!(record.height, 10);
    assert!((record.area - 100.0).abs() < 1e-9);
    assert!((record.solidity - 1.0).abs() < 1e-12);
    assert_eq!(record.hull_vertices, 4);
    assert!(record.in_bounds);
    assert!((record.center_of_mass_x - 24.5).abs() < 1e-12);
    assert!((record.center_of_mass_y - 34.5).abs() < 1e-12);
    // The caliper runs along y = x + 10 and its 5 pixel stroke covers the
    // diagonals |y - x - 10| <= 3 of the 11x11 filled hull.
    assert_eq!(record.longest_axis, 8 + 9 + 10 + 11 + 10 + 9 + 8);

    let outputs = ctx.sink();
    assert_eq!(value(outputs, "pixel_area"), MeasurementValue::Int(100));
    assert_eq!(value(outputs, "hull_vertices"), MeasurementValue::Int(4));
    assert_eq!(value(outputs, "in_bounds"), MeasurementValue::Bool(true));
}

#[test]
fn pixel_area_counts_mask_pixels() {
    let mut mask = GrayImage::new(60, 60);
    fill_rect(&mut mask, 10, 10, 40, 20);
    fill_rect(&mut mask, 10, 20, 20, 45);
    mask.put_pixel(50, 50, image::Luma([7]));
    let expected = mask.pixels().filter(|p| p.0[0] != 0).count() as u64;
    let contour = traced_contour(&mask);

    let measured = measure_object(
        Dimensions::of(&mask),
        &contour,
        &mask,
        &AnalysisConfig::default(),
    )
    .unwrap();

    assert_eq!(measured.record.pixel_area, expected);
}

#[test]
fn concave_object_solidity_and_hull() {
    let mut mask = GrayImage::new(60, 60);
    fill_rect(&mut mask, 20, 20, 40, 30);
    fill_rect(&mut mask, 20, 30, 30, 40);
    let contour = vec![
        Point::new(20, 20),
        Point::new(40, 20),
        Point::new(40, 30),
        Point::new(30, 30),
        Point::new(30, 40),
        Point::new(20, 40),
    ];

    let measured = measure_object(
        Dimensions::of(&mask),
        &contour,
        &mask,
        &AnalysisConfig::default(),
    )
    .unwrap();
    let record = &measured.record;

    assert_eq!(record.pixel_area, 300);
    assert!((record.area - 350.0).abs() < 1e-9);
    assert!(record.solidity > 0.0 && record.solidity <= 1.0);
    assert!((record.solidity - 300.0 / 350.0).abs() < 1e-12);
    assert_eq!(record.hull_vertices, 5);
    assert!(!measured.hull.vertices().contains(&Point::new(30, 30)));
}

#[test]
fn disk_fits_round_ellipse() {
    let mut mask = GrayImage::new(100, 100);
    imageproc::drawing::draw_filled_circle_mut(&mut mask, (50, 50), 20, image::Luma([255]));
    let contour = traced_contour(&mask);
    let mut ctx = context();

    analyze_object(&mut ctx, &blank_image(100, 100), &contour, &mask).unwrap();
    let outputs = ctx.sink();

    let major = float(outputs, "ellipse_major_axis");
    let minor = float(outputs, "ellipse_minor_axis");
    let eccentricity = float(outputs, "ellipse_eccentricity");
    assert!((major - 40.0).abs() < 3.0, "major {major}");
    assert!((minor - 40.0).abs() < 3.0, "minor {minor}");
    assert!(major >= minor);
    assert!((0.0..0.3).contains(&eccentricity), "eccentricity {eccentricity}");
    assert!((float(outputs, "ellipse_center_x") - 50.0).abs() < 1.0);
    assert!((float(outputs, "ellipse_center_y") - 50.0).abs() < 1.0);
    let angle = float(outputs, "ellipse_angle");
    assert!((0.0..180.0).contains(&angle));
}

#[test]
fn elongated_object_has_high_eccentricity() {
    let mut mask = GrayImage::new(120, 60);
    fill_rect(&mut mask, 10, 25, 110, 35);
    let contour = traced_contour(&mask);

    let measured = measure_object(
        Dimensions::of(&mask),
        &contour,
        &mask,
        &AnalysisConfig::default(),
    )
    .unwrap();

    let e = measured.record.ellipse_eccentricity.unwrap();
    assert!(e > 0.9 && e < 1.0, "eccentricity {e}");
    let angle = measured.record.ellipse_angle;
    assert!(angle < 5.0 || angle > 175.0, "angle {angle}");
}

#[test]
fn empty_mask_is_degenerate() {
    let mut ctx = context();
    let mask = GrayImage::new(40, 40);
    let contour = corner_contour(5, 5, 15, 15);

    let result = analyze_object(&mut ctx, &blank_image(40, 40), &contour, &mask);

    assert!(matches!(result, Err(AnalysisError::DegenerateArea)));
    assert!(ctx.sink().is_empty());
    assert!(ctx.images().is_empty());
}

#[test]
fn mask_size_must_match_image() {
    let mut mask = GrayImage::new(30, 40);
    fill_rect(&mut mask, 5, 5, 15, 15);
    let result = measure_object(
        Dimensions {
            width: 40,
            height: 40,
        },
        &corner_contour(5, 5, 15, 15),
        &mask,
        &AnalysisConfig::default(),
    );
    assert!(matches!(
        result,
        Err(AnalysisError::DimensionMismatch { .. })
    ));
}

#[test]
fn in_bounds_tracks_frame_contact() {
    let config = AnalysisConfig::default();

    let mut touching = GrayImage::new(50, 50);
    fill_rect(&mut touching, 0, 20, 10, 30);
    let measured = measure_object(
        Dimensions::of(&touching),
        &traced_contour(&touching),
        &touching,
        &config,
    )
    .unwrap();
    assert!(!measured.record.in_bounds);

    let mut bottom = GrayImage::new(50, 50);
    fill_rect(&mut bottom, 20, 40, 30, 50);
    let measured = measure_object(
        Dimensions::of(&bottom),
        &traced_contour(&bottom),
        &bottom,
        &config,
    )
    .unwrap();
    assert!(!measured.record.in_bounds);

    let mut interior = GrayImage::new(50, 50);
    fill_rect(&mut interior, 1, 1, 49, 49);
    let measured = measure_object(
        Dimensions::of(&interior),
        &traced_contour(&interior),
        &interior,
        &config,
    )
    .unwrap();
    assert!(measured.record.in_bounds);
}

#[test]
fn diagnostics_describe_the_emitted_record() {
    let mut ctx = context();
    let mut mask = GrayImage::new(80, 80);
    fill_rect(&mut mask, 20, 30, 30, 40);
    let contour = corner_contour(20, 30, 30, 40);

    let (record, diagnostics) = analyze_object_with_diagnostics(
        &mut ctx,
        &blank_image(80, 80),
        &contour,
        &mask,
        &NoopClock,
    )
    .unwrap();

    assert_eq!(ctx.device(), 1);
    assert_eq!(ctx.images().len(), 1);
    assert_eq!(value(ctx.sink(), "pixel_area"), MeasurementValue::Int(100));
    assert_eq!(diagnostics.summary.pixel_area, record.pixel_area);
    assert!(diagnostics.overlay.is_some());
    let json = serde_json::to_value(&diagnostics).unwrap();
    assert_eq!(
        json["caliper"]["metrics"]["Caliper"]["longest_axis"].as_u64(),
        Some(record.longest_axis)
    );
}

#[test]
fn longest_axis_grows_with_scale() {
    let config = AnalysisConfig::default();
    let mut previous = 0;
    for half_width in [10_i32, 16, 22, 28, 34] {
        let half_height = half_width / 2;
        let (x0, x1) = (100 - half_width, 100 + half_width);
        let (y0, y1) = (100 - half_height, 100 + half_height);
        let mut mask = GrayImage::new(200, 200);
        fill_rect(
            &mut mask,
            x0.unsigned_abs(),
            y0.unsigned_abs(),
            x1.unsigned_abs(),
            y1.unsigned_abs(),
        );
        let measured = measure_object(
            Dimensions::of(&mask),
            &corner_contour(x0, y0, x1, y1),
            &mask,
            &config,
        )
        .unwrap();
        let longest = measured.record.longest_axis;
        assert!(
            longest >= previous,
            "longest_axis shrank from {previous} to {longest} at half width {half_width}"
        );
        previous = longest;
    }
}

#[test]
fn thicker_caliper_line_counts_more_pixels() {
    let mut mask = GrayImage::new(100, 100);
    fill_rect(&mut mask, 20, 30, 80, 60);
    let contour = corner_contour(20, 30, 80, 60);
    let thin = AnalysisConfig {
        line_thickness: 1,
        ..AnalysisConfig::default()
    };
    let thick = AnalysisConfig {
        line_thickness: 9,
        ..AnalysisConfig::default()
    };
    let dims = Dimensions::of(&mask);
    let a = measure_object(dims, &contour, &mask, &thin).unwrap();
    let b = measure_object(dims, &contour, &mask, &thick).unwrap();
    assert!(b.record.longest_axis > a.record.longest_axis);
    // A one pixel line crosses most of the box's columns.
    assert!(a.record.longest_axis >= 50);
}

#[test]
fn overlay_and_mask_are_collected() {
    let mut ctx = context();
    let mut mask = GrayImage::new(64, 48);
    fill_rect(&mut mask, 10, 10, 30, 30);
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, image::Rgb([10, 200, 10])));

    analyze_object(&mut ctx, &image, &corner_contour(10, 10, 30, 30), &mask).unwrap();

    let images = ctx.images();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].overlay.dimensions(), (64, 48));
    assert_eq!(images[0].mask, mask);
    assert_eq!(images[0].overlay.get_pixel(60, 44), &image::Rgb([10, 200, 10]));
}

#[test]
fn disabled_overlay_collects_no_images() {
    let config = AnalysisConfig {
        render_overlay: false,
        ..AnalysisConfig::default()
    };
    let mut ctx = AnalysisContext::new(config, Outputs::new()).unwrap();
    let mut mask = GrayImage::new(40, 40);
    fill_rect(&mut mask, 10, 10, 20, 20);

    analyze_object(&mut ctx, &blank_image(40, 40), &corner_contour(10, 10, 20, 20), &mask)
        .unwrap();

    assert!(ctx.images().is_empty());
    assert!(!ctx.sink().is_empty());
}

#[derive(Clone, Default)]
struct RecordingDebugSink(Arc<Mutex<Vec<PathBuf>>>);

impl DebugSink for RecordingDebugSink {
    fn print_image(&mut self, _image: &RgbImage, path: &Path) -> Result<(), String> {
        self.0.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn plot_image(&mut self, _image: &RgbImage) -> Result<(), String> {
        Ok(())
    }
}

#[test]
fn debug_print_names_files_by_invocation() {
    let recorder = RecordingDebugSink::default();
    let config = AnalysisConfig {
        debug: Some(DebugMode::Print {
            outdir: PathBuf::from("debug"),
        }),
        ..AnalysisConfig::default()
    };
    let mut ctx = AnalysisContext::new(config, Outputs::new())
        .unwrap()
        .with_debug_sink(Box::new(recorder.clone()));
    let mut mask = GrayImage::new(40, 40);
    fill_rect(&mut mask, 10, 10, 20, 20);
    let image = blank_image(40, 40);

    // The rejected first call still advances the counter.
    let short = [Point::new(0, 0)];
    assert!(analyze_object(&mut ctx, &image, &short, &mask).is_err());
    analyze_object(&mut ctx, &image, &corner_contour(10, 10, 20, 20), &mask).unwrap();

    let printed = recorder.0.lock().unwrap().clone();
    assert_eq!(printed, vec![Path::new("debug").join("2_shapes.png")]);
}

#[test]
fn parallel_contexts_share_one_sink() {
    let sink = SharedSink::new();
    let mut mask = GrayImage::new(50, 50);
    fill_rect(&mut mask, 10, 10, 30, 25);
    let image = blank_image(50, 50);
    let contour = corner_contour(10, 10, 30, 25);

    let per_object = {
        let mut ctx = context();
        analyze_object(&mut ctx, &image, &contour, &mask).unwrap();
        ctx.sink().len()
    };

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let sink = sink.clone();
            let (image, contour, mask) = (&image, &contour, &mask);
            scope.spawn(move || {
                let mut ctx = AnalysisContext::new(AnalysisConfig::default(), sink).unwrap();
                analyze_object(&mut ctx, image, contour, mask).unwrap();
            });
        }
    });

    let outputs = sink.snapshot();
    assert_eq!(outputs.len(), 4 * per_object);
    let pixel_areas = outputs
        .observations()
        .iter()
        .filter(|o| o.variable == "pixel_area")
        .count();
    assert_eq!(pixel_areas, 4);
}

#[test]
fn eccentricity_stays_below_one() {
    let shapes: [(u32, u32, u32, u32); 3] = [(10, 10, 20, 20), (5, 20, 45, 26), (12, 3, 18, 47)];
    for (x0, y0, x1, y1) in shapes {
        let mut mask = GrayImage::new(50, 50);
        fill_rect(&mut mask, x0, y0, x1, y1);
        let measured = measure_object(
            Dimensions::of(&mask),
            &traced_contour(&mask),
            &mask,
            &AnalysisConfig::default(),
        )
        .unwrap();
        if let Some(e) = measured.record.ellipse_eccentricity {
            assert!((0.0..1.0).contains(&e), "eccentricity {e}");
        }
    }
}
