//! Core record types for annotations, predictions and matchings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in center/size representation.
///
/// Coordinates are in image pixel units with the y-axis pointing downwards:
///
/// ```text
///   (x_min, y_min)--------------+
///         |                     |
///       height   (c_x, c_y)     |
///         |                     |
///         +---- width ----(x_max, y_max)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Center coordinates (x, y).
    pub center: (f64, f64),
    /// Width and height.
    pub size: (f64, f64),
}

impl BoundingBox {
    /// Create a new bounding box from center coordinates and size.
    pub fn new(center: (f64, f64), size: (f64, f64)) -> Self {
        Self { center, size }
    }

    /// Area of the bounding box.
    pub fn area(&self) -> f64 {
        self.size.0 * self.size.1
    }

    /// Left coordinate.
    pub fn x_min(&self) -> f64 {
        self.center.0 - 0.5 * self.size.0
    }

    /// Top coordinate.
    pub fn y_min(&self) -> f64 {
        self.center.1 - 0.5 * self.size.1
    }

    /// Right coordinate.
    pub fn x_max(&self) -> f64 {
        self.center.0 + 0.5 * self.size.0
    }

    /// Bottom coordinate.
    pub fn y_max(&self) -> f64 {
        self.center.1 + 0.5 * self.size.1
    }

    /// Build a bounding box from min/max corner coordinates.
    pub fn from_corners(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            center: (0.5 * (x_min + x_max), 0.5 * (y_min + y_max)),
            size: (x_max - x_min, y_max - y_min),
        }
    }

    /// Check that the box has non-negative dimensions.
    pub fn is_valid(&self) -> bool {
        self.size.0 >= 0.0 && self.size.1 >= 0.0
    }
}

/// A scalar or sequence attribute value carried by a record.
///
/// Records store their schema-fixed fields in typed struct members; any
/// additional per-record data (occlusion estimates, semantic areas, flags)
/// lives in an attribute map of these values and is only ever inspected by
/// the filter engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Float(f64),
    Int(i64),
    Str(String),
    Bool(bool),
    FloatSeq(Vec<f64>),
}

impl AttrValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Float(_) => "float",
            AttrValue::Int(_) => "int",
            AttrValue::Str(_) => "str",
            AttrValue::Bool(_) => "bool",
            AttrValue::FloatSeq(_) => "float sequence",
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(v: Vec<f64>) -> Self {
        AttrValue::FloatSeq(v)
    }
}

/// Dynamic field lookup used by the filter engine.
///
/// Implementations expose the schema-fixed record fields under stable column
/// names and fall back to the attribute map for everything else.
pub trait FieldAccess {
    /// Resolve a top-level column name to its value, `None` if absent.
    fn field(&self, name: &str) -> Option<AttrValue>;
}

/// A ground-truth annotation for one object in one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Identifier, unique within the sample.
    pub id: String,
    /// Identifier of the sample (image/frame) this annotation belongs to.
    pub sample_id: String,
    /// Annotated bounding box.
    pub bbox: BoundingBox,
    /// Class label.
    pub class_label: String,
    /// Additional attributes, addressable by filters only.
    #[serde(default)]
    pub attributes: HashMap<String, AttrValue>,
}

impl AnnotationRecord {
    /// Create an annotation record without additional attributes.
    pub fn new(id: &str, sample_id: &str, bbox: BoundingBox, class_label: &str) -> Self {
        Self {
            id: id.to_string(),
            sample_id: sample_id.to_string(),
            bbox,
            class_label: class_label.to_string(),
            attributes: HashMap::new(),
        }
    }

    /// Attach an attribute, consuming and returning the record.
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

impl FieldAccess for AnnotationRecord {
    fn field(&self, name: &str) -> Option<AttrValue> {
        match name {
            "id" | "annotation_id" => Some(AttrValue::Str(self.id.clone())),
            "sample_id" => Some(AttrValue::Str(self.sample_id.clone())),
            "class_label" => Some(AttrValue::Str(self.class_label.clone())),
            "center" => Some(AttrValue::FloatSeq(vec![self.bbox.center.0, self.bbox.center.1])),
            "size" => Some(AttrValue::FloatSeq(vec![self.bbox.size.0, self.bbox.size.1])),
            "area" => Some(AttrValue::Float(self.bbox.area())),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

/// A predicted detection for one object in one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Identifier, unique within the sample.
    pub id: String,
    /// Identifier of the sample (image/frame) this prediction belongs to.
    pub sample_id: String,
    /// Predicted bounding box.
    pub bbox: BoundingBox,
    /// Class label.
    pub class_label: String,
    /// Confidence score in [0, 1].
    pub confidence: f64,
    /// Additional attributes, addressable by filters only.
    #[serde(default)]
    pub attributes: HashMap<String, AttrValue>,
}

impl PredictionRecord {
    /// Create a prediction record without additional attributes.
    pub fn new(
        id: &str,
        sample_id: &str,
        bbox: BoundingBox,
        class_label: &str,
        confidence: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            sample_id: sample_id.to_string(),
            bbox,
            class_label: class_label.to_string(),
            confidence,
            attributes: HashMap::new(),
        }
    }

    /// Attach an attribute, consuming and returning the record.
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

impl FieldAccess for PredictionRecord {
    fn field(&self, name: &str) -> Option<AttrValue> {
        match name {
            "id" | "prediction_id" => Some(AttrValue::Str(self.id.clone())),
            "sample_id" => Some(AttrValue::Str(self.sample_id.clone())),
            "class_label" => Some(AttrValue::Str(self.class_label.clone())),
            "center" => Some(AttrValue::FloatSeq(vec![self.bbox.center.0, self.bbox.center.1])),
            "size" => Some(AttrValue::FloatSeq(vec![self.bbox.size.0, self.bbox.size.1])),
            "area" => Some(AttrValue::Float(self.bbox.area())),
            "confidence" => Some(AttrValue::Float(self.confidence)),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

/// One qualifying annotation/prediction correlation.
///
/// Produced by the correlator for every pair whose IoU reaches the
/// configured threshold. Unmatched annotations and predictions are not
/// materialized; downstream consumers derive them by set difference against
/// the filtered record sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub annotation_id: String,
    pub prediction_id: String,
    pub sample_id: String,
    /// Class label shared by both endpoints.
    pub class_label: String,
    /// Intersection over union of the two boxes, in [threshold, 1].
    pub iou: f64,
    /// Confidence of the prediction, copied through for ranking.
    pub confidence: f64,
}

impl FieldAccess for MatchRecord {
    fn field(&self, name: &str) -> Option<AttrValue> {
        match name {
            "annotation_id" => Some(AttrValue::Str(self.annotation_id.clone())),
            "prediction_id" => Some(AttrValue::Str(self.prediction_id.clone())),
            "sample_id" => Some(AttrValue::Str(self.sample_id.clone())),
            "class_label" => Some(AttrValue::Str(self.class_label.clone())),
            "iou" => Some(AttrValue::Float(self.iou)),
            "confidence" => Some(AttrValue::Float(self.confidence)),
            _ => None,
        }
    }
}

/// The annotation and prediction sets of one sample, as delivered by an
/// external loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleRecords {
    pub sample_id: String,
    pub annotations: Vec<AnnotationRecord>,
    pub predictions: Vec<PredictionRecord>,
}

impl SampleRecords {
    pub fn new(sample_id: &str) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            annotations: Vec::new(),
            predictions: Vec::new(),
        }
    }
}

/// A computed metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    /// A precision-recall curve as (recall, precision) points.
    Curve(Vec<(f64, f64)>),
}

impl MetricValue {
    /// Scalar view of the value, `None` for curves.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(v) => Some(*v),
            MetricValue::Curve(_) => None,
        }
    }
}

/// One metric result, the unit handed to the external writer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub metric_id: u32,
    pub metric_name: String,
    /// Class label the value applies to; `None` for the global value.
    pub class_label: Option<String>,
    pub value: MetricValue,
}
