//! shapemeter: measure the shape of one segmented object.
//!
//! Loads an image and the object's binary mask, traces the mask's largest
//! outer border as the object contour, and prints the measurement record.
//! Optionally prints per-stage diagnostics and writes the annotated
//! overlay.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin shapemeter -- [OPTIONS] <IMAGE> <MASK>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use shapemeter_pipeline::{
    AnalysisConfig, AnalysisContext, Clock, DebugMode, DebugSink, DynamicImage, GrayImage,
    MeasurementDiagnostics, NoopClock, Outputs, RgbImage, analyze_object_with_diagnostics,
    contour,
};

/// Shape descriptors for a single segmented object.
///
/// Prints pixel area, hull area, solidity, perimeter, bounding box,
/// longest axis, center of mass, frame contact and best-fit ellipse.
#[derive(Parser)]
#[command(name = "shapemeter", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image: PathBuf,

    /// Path to the object mask; nonzero pixels belong to the object.
    mask: PathBuf,

    /// Caliper line and annotation stroke width in pixels.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_LINE_THICKNESS, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..=u64::from(AnalysisConfig::MAX_LINE_THICKNESS)))]
    line_thickness: u32,

    /// Radius of the centroid marker used to pick the caliper vertex.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_MARKER_RADIUS, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..=u64::from(AnalysisConfig::MAX_MARKER_RADIUS)))]
    marker_radius: u32,

    /// Skip rendering the annotated overlay.
    #[arg(long)]
    no_overlay: bool,

    /// Debug output of the overlay.
    #[arg(long, value_enum)]
    debug: Option<DebugChoice>,

    /// Directory for `--debug print` output.
    #[arg(long, default_value = ".")]
    debug_outdir: PathBuf,

    /// Print observations as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Print per-stage timing diagnostics to stderr.
    #[arg(long)]
    diagnostics: bool,

    /// Full analysis config as a JSON string.
    ///
    /// When provided, all other analysis parameter flags are ignored.
    /// The JSON must be a valid `AnalysisConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Debug output selection.
#[derive(Clone, Copy, ValueEnum)]
enum DebugChoice {
    /// Write `<n>_shapes.png` into `--debug-outdir`.
    Print,
    /// Display the overlay.
    Plot,
}

/// Build an [`AnalysisConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.  Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<AnalysisConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(AnalysisConfig {
        line_thickness: cli.line_thickness,
        marker_radius: cli.marker_radius,
        render_overlay: !cli.no_overlay,
        debug: cli.debug.map(|mode| match mode {
            DebugChoice::Print => DebugMode::Print {
                outdir: cli.debug_outdir.clone(),
            },
            DebugChoice::Plot => DebugMode::Plot,
        }),
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image = match image::open(&cli.image) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image.display());
            return ExitCode::FAILURE;
        }
    };
    let mask = match image::open(&cli.mask) {
        Ok(img) => img.to_luma8(),
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.mask.display());
            return ExitCode::FAILURE;
        }
    };

    let mut ctx = match AnalysisContext::new(config, Outputs::new()) {
        Ok(ctx) => ctx.with_debug_sink(Box::new(FsDebugSink)),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let measured = if cli.diagnostics {
        measure_mask(&mut ctx, &image, &mask, &StdClock)
    } else {
        measure_mask(&mut ctx, &image, &mask, &NoopClock)
    };
    match measured {
        Ok(diagnostics) if cli.diagnostics => eprintln!("{}\n", diagnostics.report()),
        Ok(_) => {}
        Err(msg) => {
            eprintln!("{}: {msg}", cli.mask.display());
            return ExitCode::FAILURE;
        }
    }

    let outputs = ctx.into_sink();
    if cli.json {
        match serde_json::to_string_pretty(outputs.observations()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing observations: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_table(&outputs);
    }

    ExitCode::SUCCESS
}

/// Trace the mask's largest outer border and analyze it as the object.
fn measure_mask<C: Clock>(
    ctx: &mut AnalysisContext<Outputs>,
    image: &DynamicImage,
    mask: &GrayImage,
    clock: &C,
) -> Result<MeasurementDiagnostics, String> {
    let border = contour::largest_outer_border(mask).ok_or("no object found")?;
    tracing::info!(
        width = image.width(),
        height = image.height(),
        contour_points = border.len(),
        "measuring object"
    );
    analyze_object_with_diagnostics(ctx, image, &border, mask, clock)
        .map(|(_, diagnostics)| diagnostics)
        .map_err(|e| format!("analysis error: {e}"))
}

/// Print observations as an aligned table.
fn print_table(outputs: &Outputs) {
    println!("{:<22} {:>14}  {:<8} {}", "Variable", "Value", "Scale", "Trait");
    println!("{}", "-".repeat(80));
    for obs in outputs.observations() {
        println!(
            "{:<22} {:>14}  {:<8} {}",
            obs.variable,
            obs.value.to_string(),
            obs.scale.as_str(),
            obs.trait_description,
        );
    }
}

/// [`DebugSink`] that writes overlays to the filesystem.
struct FsDebugSink;

impl DebugSink for FsDebugSink {
    fn print_image(&mut self, image: &RgbImage, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(|e| format!("{}: {e}", dir.display()))?;
        }
        image
            .save(path)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        eprintln!("Overlay written to {}", path.display());
        Ok(())
    }

    fn plot_image(&mut self, image: &RgbImage) -> Result<(), String> {
        tracing::warn!(
            width = image.width(),
            height = image.height(),
            "interactive display is not available, use --debug print"
        );
        Ok(())
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
