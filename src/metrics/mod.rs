//! Metric processors for detection-quality evaluation.

pub mod ap;
pub mod counts;
pub mod f1_score;
pub mod mean_iou;
pub mod pr_curve;
pub mod precision_recall;

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::error::Result;
use crate::types::{AnnotationRecord, MatchRecord, MetricValue, PredictionRecord};

pub use ap::MeanAveragePrecision;
pub use counts::{FalseNegatives, FalsePositives, TruePositives};
pub use f1_score::{calculate_f1_score, F1Score};
pub use mean_iou::MeanIntersectionOverUnion;
pub use pr_curve::PrecisionRecallCurve;
pub use precision_recall::{calculate_precision, calculate_recall, Precision, Recall};

/// Key of one entry in a metric result: a class label or the global value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClassKey {
    Global,
    Class(String),
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKey::Global => write!(f, "global"),
            ClassKey::Class(label) => write!(f, "{label}"),
        }
    }
}

/// Metric values keyed by class label or the global entry.
pub type ClassValues = BTreeMap<ClassKey, MetricValue>;

/// Per-metric configuration parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricParams {
    /// Whether to emit one value per class in addition to the global value.
    pub calculate_per_class: bool,
    /// AP integration mode, `"11point"` or `"exact"`.
    pub ap_integration_mode: String,
}

impl Default for MetricParams {
    fn default() -> Self {
        Self {
            calculate_per_class: true,
            ap_integration_mode: "11point".to_string(),
        }
    }
}

/// A metric computation over filtered record sets and their matching.
///
/// Processors are stateless; per-sample and whole-run results come from
/// calling [`MetricProcessor::compute`] with the respective record slices.
pub trait MetricProcessor: Send + Sync {
    /// Stable numeric identifier of the metric, carried through
    /// configuration as an opaque key.
    fn id(&self) -> u32;

    /// Human-readable metric name.
    fn name(&self) -> &'static str;

    /// Whether the metric needs the whole run in one pass (rank-based
    /// metrics such as AP) rather than being computable sample by sample.
    fn global_scope(&self) -> bool {
        false
    }

    /// Compute the metric over the given record sets.
    fn compute(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
        matching: &[MatchRecord],
        params: &MetricParams,
    ) -> Result<ClassValues>;
}
