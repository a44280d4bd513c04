//! The measurement record and the sink it is emitted to.
//!
//! A [`ShapeMeasurementRecord`] is a fixed typed struct. It is flattened
//! into named [`Observation`]s only at the sink boundary, where every value
//! carries its variable name, trait description, scale and declared type.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Name of the producing method recorded with every observation.
pub const METHOD: &str = "shapemeter_pipeline::analyze_object";

/// Measurement scale of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Raw pixel counts or lengths.
    Pixels,
    /// Angle in degrees.
    Degrees,
    /// Dimensionless or coordinate value.
    None,
}

impl Scale {
    /// Label used for the scale in sinks and printouts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pixels => "pixels",
            Self::Degrees => "degrees",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for Scale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared value type of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Integer.
    Int,
    /// Floating point.
    Float,
    /// Boolean.
    Bool,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        })
    }
}

/// A measured value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    /// Integer value.
    Int(u64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
}

impl MeasurementValue {
    /// The type this value declares.
    #[must_use]
    pub const fn datatype(&self) -> DataType {
        match self {
            Self::Int(_) => DataType::Int,
            Self::Float(_) => DataType::Float,
            Self::Bool(_) => DataType::Bool,
        }
    }
}

impl std::fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.4}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// One named value as handed to a [`MeasurementSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Variable name, e.g. `pixel_area`.
    pub variable: String,
    /// Human-readable description of the trait.
    pub trait_description: String,
    /// Producing method name.
    pub method: String,
    /// Measurement scale.
    pub scale: Scale,
    /// Declared value type.
    pub datatype: DataType,
    /// The value.
    pub value: MeasurementValue,
    /// Unit label.
    pub label: String,
}

impl Observation {
    fn new(variable: &str, trait_description: &str, scale: Scale, value: MeasurementValue) -> Self {
        Self {
            variable: variable.to_string(),
            trait_description: trait_description.to_string(),
            method: METHOD.to_string(),
            scale,
            datatype: value.datatype(),
            value,
            label: scale.as_str().to_string(),
        }
    }
}

/// Receiver of measurement observations.
pub trait MeasurementSink {
    /// Append one observation.
    fn record(&mut self, observation: Observation);
}

/// The shape descriptors of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeMeasurementRecord {
    /// Count of nonzero mask pixels.
    pub pixel_area: u64,
    /// Convex hull area.
    pub area: f64,
    /// `pixel_area / area`, or 1 for a degenerate hull.
    pub solidity: f64,
    /// Closed contour length.
    pub perimeter: f64,
    /// Bounding box width.
    pub width: u32,
    /// Bounding box height.
    pub height: u32,
    /// Caliper pixel count.
    pub longest_axis: u64,
    /// Centroid x.
    pub center_of_mass_x: f64,
    /// Centroid y.
    pub center_of_mass_y: f64,
    /// Convex hull vertex count.
    pub hull_vertices: u64,
    /// Whether the object stays clear of the image frame.
    pub in_bounds: bool,
    /// Ellipse center x.
    pub ellipse_center_x: f64,
    /// Ellipse center y.
    pub ellipse_center_y: f64,
    /// Full major axis length.
    pub ellipse_major_axis: f64,
    /// Full minor axis length.
    pub ellipse_minor_axis: f64,
    /// Major axis angle in degrees, `[0, 180)`.
    pub ellipse_angle: f64,
    /// Ellipse eccentricity; `None` when the major axis is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ellipse_eccentricity: Option<f64>,
}

impl ShapeMeasurementRecord {
    /// Flatten the record into named observations, in a fixed order.
    ///
    /// `ellipse_eccentricity` is left out when undefined.
    #[must_use]
    pub fn observations(&self) -> Vec<Observation> {
        use MeasurementValue::{Bool, Float, Int};

        let mut out = vec![
            Observation::new("pixel_area", "object area", Scale::Pixels, Int(self.pixel_area)),
            Observation::new("area", "convex hull area", Scale::Pixels, Float(self.area)),
            Observation::new(
                "solidity",
                "object area divided by convex hull area",
                Scale::None,
                Float(self.solidity),
            ),
            Observation::new(
                "perimeter",
                "object perimeter length",
                Scale::Pixels,
                Float(self.perimeter),
            ),
            Observation::new(
                "width",
                "object bounding box width",
                Scale::Pixels,
                Int(u64::from(self.width)),
            ),
            Observation::new(
                "height",
                "object bounding box height",
                Scale::Pixels,
                Int(u64::from(self.height)),
            ),
            Observation::new(
                "longest_axis",
                "longest chord of the convex hull through the center of mass",
                Scale::Pixels,
                Int(self.longest_axis),
            ),
            Observation::new(
                "center-of-mass-x",
                "x coordinate of the object center of mass",
                Scale::None,
                Float(self.center_of_mass_x),
            ),
            Observation::new(
                "center-of-mass-y",
                "y coordinate of the object center of mass",
                Scale::None,
                Float(self.center_of_mass_y),
            ),
            Observation::new(
                "hull_vertices",
                "number of convex hull vertices",
                Scale::None,
                Int(self.hull_vertices),
            ),
            Observation::new(
                "in_bounds",
                "whether the object stays clear of the image border",
                Scale::None,
                Bool(self.in_bounds),
            ),
            Observation::new(
                "ellipse_center_x",
                "x coordinate of the best-fit ellipse center",
                Scale::None,
                Float(self.ellipse_center_x),
            ),
            Observation::new(
                "ellipse_center_y",
                "y coordinate of the best-fit ellipse center",
                Scale::None,
                Float(self.ellipse_center_y),
            ),
            Observation::new(
                "ellipse_major_axis",
                "major axis length of the best-fit ellipse",
                Scale::Pixels,
                Float(self.ellipse_major_axis),
            ),
            Observation::new(
                "ellipse_minor_axis",
                "minor axis length of the best-fit ellipse",
                Scale::Pixels,
                Float(self.ellipse_minor_axis),
            ),
            Observation::new(
                "ellipse_angle",
                "rotation of the best-fit ellipse major axis",
                Scale::Degrees,
                Float(self.ellipse_angle),
            ),
        ];
        if let Some(eccentricity) = self.ellipse_eccentricity {
            out.push(Observation::new(
                "ellipse_eccentricity",
                "eccentricity of the best-fit ellipse",
                Scale::None,
                Float(eccentricity),
            ));
        }
        out
    }

    /// Append every observation to `sink`.
    pub fn emit<S: MeasurementSink + ?Sized>(&self, sink: &mut S) {
        for observation in self.observations() {
            sink.record(observation);
        }
    }
}

/// In-memory append-only collection of observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outputs {
    observations: Vec<Observation>,
}

impl Outputs {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            observations: Vec::new(),
        }
    }

    /// All observations in append order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// The most recent observation of `variable`.
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&Observation> {
        self.observations.iter().rev().find(|o| o.variable == variable)
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl MeasurementSink for Outputs {
    fn record(&mut self, observation: Observation) {
        self.observations.push(observation);
    }
}

/// A cloneable handle to one [`Outputs`] shared between threads.
///
/// Appends are serialized by the mutex.
#[derive(Debug, Clone, Default)]
pub struct SharedSink(Arc<Mutex<Outputs>>);

impl SharedSink {
    /// Create an empty shared collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Outputs {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl MeasurementSink for SharedSink {
    fn record(&mut self, observation: Observation) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(observation);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> ShapeMeasurementRecord {
        ShapeMeasurementRecord {
            pixel_area: 100,
            area: 100.0,
            solidity: 1.0,
            perimeter: 40.0,
            width: 10,
            height: 10,
            longest_axis: 70,
            center_of_mass_x: 24.5,
            center_of_mass_y: 14.5,
            hull_vertices: 4,
            in_bounds: true,
            ellipse_center_x: 25.0,
            ellipse_center_y: 15.0,
            ellipse_major_axis: 11.0,
            ellipse_minor_axis: 11.0,
            ellipse_angle: 0.0,
            ellipse_eccentricity: Some(0.0),
        }
    }

    #[test]
    fn observations_cover_every_field() {
        let obs = sample().observations();
        let names: Vec<&str> = obs.iter().map(|o| o.variable.as_str()).collect();
        assert_eq!(
            names,
            [
                "pixel_area",
                "area",
                "solidity",
                "perimeter",
                "width",
                "height",
                "longest_axis",
                "center-of-mass-x",
                "center-of-mass-y",
                "hull_vertices",
                "in_bounds",
                "ellipse_center_x",
                "ellipse_center_y",
                "ellipse_major_axis",
                "ellipse_minor_axis",
                "ellipse_angle",
                "ellipse_eccentricity",
            ]
        );
        assert!(obs.iter().all(|o| o.method == METHOD));
        assert!(obs.iter().all(|o| o.datatype == o.value.datatype()));
        assert!(obs.iter().all(|o| o.label == o.scale.as_str()));
    }

    #[test]
    fn declared_scales_and_types() {
        let obs = sample().observations();
        let find = |name: &str| obs.iter().find(|o| o.variable == name).unwrap();
        assert_eq!(find("pixel_area").datatype, DataType::Int);
        assert_eq!(find("area").datatype, DataType::Float);
        assert_eq!(find("in_bounds").value, MeasurementValue::Bool(true));
        assert_eq!(find("ellipse_angle").scale, Scale::Degrees);
        assert_eq!(find("ellipse_eccentricity").scale, Scale::None);
        assert_eq!(find("longest_axis").scale, Scale::Pixels);
    }

    #[test]
    fn undefined_eccentricity_is_omitted() {
        let record = ShapeMeasurementRecord {
            ellipse_eccentricity: None,
            ..sample()
        };
        let obs = record.observations();
        assert_eq!(obs.len(), 16);
        assert!(obs.iter().all(|o| o.variable != "ellipse_eccentricity"));
    }

    #[test]
    fn emit_appends_to_outputs() {
        let mut outputs = Outputs::new();
        sample().emit(&mut outputs);
        assert_eq!(outputs.len(), 17);
        assert_eq!(
            outputs.get("pixel_area").unwrap().value,
            MeasurementValue::Int(100)
        );
    }

    #[test]
    fn shared_sink_clones_append_to_one_collection() {
        let sink = SharedSink::new();
        let mut a = sink.clone();
        let mut b = sink.clone();
        sample().emit(&mut a);
        sample().emit(&mut b);
        assert_eq!(sink.snapshot().len(), 34);
    }

    #[test]
    fn observation_serializes_lowercase_enums() {
        let obs = &sample().observations()[0];
        let json = serde_json::to_value(obs).unwrap();
        assert_eq!(json["scale"], "pixels");
        assert_eq!(json["datatype"], "int");
        assert_eq!(json["value"], 100);
    }
}
