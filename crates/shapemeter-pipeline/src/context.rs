//! Per-run analysis state.
//!
//! An [`AnalysisContext`] is created once per pipeline run and passed to
//! every [`analyze_object`](crate::analyze_object) call. It owns the
//! configuration, the invocation counter used to name debug output, the
//! measurement sink, the collected analysis images and the optional debug
//! collaborator.

use std::path::Path;

use image::{GrayImage, RgbImage};

use crate::record::MeasurementSink;
use crate::types::{AnalysisConfig, AnalysisError, DebugMode};

/// Images produced for one analyzed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisImages {
    /// Input image with measurement annotations.
    pub overlay: RgbImage,
    /// The object mask as given.
    pub mask: GrayImage,
}

/// Receiver of debug overlays.
///
/// Implemented by callers that can write or display images; the pipeline
/// itself does no I/O.
pub trait DebugSink {
    /// Persist `image` at `path`.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure.
    fn print_image(&mut self, image: &RgbImage, path: &Path) -> Result<(), String>;

    /// Display `image` interactively.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure.
    fn plot_image(&mut self, image: &RgbImage) -> Result<(), String>;
}

/// State shared by all objects analyzed in one run.
pub struct AnalysisContext<S> {
    config: AnalysisConfig,
    device: u64,
    sink: S,
    images: Vec<AnalysisImages>,
    debug_sink: Option<Box<dyn DebugSink + Send>>,
}

impl<S: MeasurementSink> AnalysisContext<S> {
    /// Create a context after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if the configuration is
    /// invalid.
    pub fn new(config: AnalysisConfig, sink: S) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            config,
            device: 0,
            sink,
            images: Vec::new(),
            debug_sink: None,
        })
    }

    /// Attach the collaborator that receives debug overlays.
    #[must_use]
    pub fn with_debug_sink(mut self, debug_sink: Box<dyn DebugSink + Send>) -> Self {
        self.debug_sink = Some(debug_sink);
        self
    }

    /// The analysis configuration.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Number of `analyze_object` invocations so far, rejected ones
    /// included.
    #[must_use]
    pub const fn device(&self) -> u64 {
        self.device
    }

    /// The measurement sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the measurement sink.
    pub const fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the context, returning the sink.
    #[must_use]
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Images collected so far, one entry per measured object.
    #[must_use]
    pub fn images(&self) -> &[AnalysisImages] {
        &self.images
    }

    /// Advance the invocation counter and return its new value.
    pub(crate) const fn next_device(&mut self) -> u64 {
        self.device += 1;
        self.device
    }

    pub(crate) fn push_images(&mut self, images: AnalysisImages) {
        self.images.push(images);
    }

    /// Hand `overlay` to the debug collaborator according to the debug
    /// mode.
    pub(crate) fn debug_output(&mut self, overlay: &RgbImage) -> Result<(), AnalysisError> {
        let Some(mode) = &self.config.debug else {
            return Ok(());
        };
        let Some(debug_sink) = self.debug_sink.as_mut() else {
            tracing::warn!(?mode, "debug mode set without a debug sink, skipping");
            return Ok(());
        };
        match mode {
            DebugMode::Print { outdir } => {
                let path = outdir.join(format!("{}_shapes.png", self.device));
                tracing::debug!(path = %path.display(), "printing debug overlay");
                debug_sink
                    .print_image(overlay, &path)
                    .map_err(AnalysisError::DebugOutput)
            }
            DebugMode::Plot => debug_sink
                .plot_image(overlay)
                .map_err(AnalysisError::DebugOutput),
        }
    }
}

impl<S> std::fmt::Debug for AnalysisContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("config", &self.config)
            .field("device", &self.device)
            .field("images", &self.images.len())
            .field("debug_sink", &self.debug_sink.is_some())
            .finish_non_exhaustive()
    }
}
