//! Average precision and mean average precision.

use std::str::FromStr;

use crate::error::{ConfigError, Result};
use crate::metrics::counts::class_labels;
use crate::metrics::pr_curve::precision_recall_points;
use crate::metrics::{ClassKey, ClassValues, MetricParams, MetricProcessor};
use crate::types::{AnnotationRecord, MatchRecord, MetricValue, PredictionRecord};

/// How the area under the precision-recall curve is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApIntegrationMode {
    /// VOC 2007 style: sample the precision envelope at the 11 recall
    /// levels 0.0, 0.1, ..., 1.0 and average.
    #[default]
    ElevenPoint,
    /// VOC 2010-2012 style: exact area under the monotone precision
    /// envelope.
    Exact,
}

impl FromStr for ApIntegrationMode {
    type Err = ConfigError;

    fn from_str(mode: &str) -> std::result::Result<Self, Self::Err> {
        match mode {
            "11point" => Ok(ApIntegrationMode::ElevenPoint),
            "exact" => Ok(ApIntegrationMode::Exact),
            other => Err(ConfigError::UnknownIntegrationMode(other.to_string())),
        }
    }
}

/// 11-point interpolated average precision.
///
/// For each recall level the maximum precision at recall at or above that
/// level enters the average, `0.0` when the curve never reaches the level.
pub fn ap_eleven_point(recalls: &[f64], precisions: &[f64]) -> f64 {
    let mut ap = 0.0;
    for step in 0..=10 {
        let level = step as f64 / 10.0;
        let best = recalls
            .iter()
            .zip(precisions)
            .filter(|(r, _)| **r >= level)
            .map(|(_, p)| *p)
            .fold(0.0f64, f64::max);
        ap += best;
    }
    ap / 11.0
}

/// Exact area under the precision envelope.
///
/// Pads the curve with (0, 0) and (1, 0) sentinels, makes the precision
/// monotonically non-increasing from right to left, then sums the
/// rectangles where the recall changes.
pub fn ap_exact(recalls: &[f64], precisions: &[f64]) -> f64 {
    let mut mrec = Vec::with_capacity(recalls.len() + 2);
    mrec.push(0.0);
    mrec.extend_from_slice(recalls);
    mrec.push(1.0);

    let mut mpre = Vec::with_capacity(precisions.len() + 2);
    mpre.push(0.0);
    mpre.extend_from_slice(precisions);
    mpre.push(0.0);

    for i in (1..mpre.len()).rev() {
        mpre[i - 1] = mpre[i - 1].max(mpre[i]);
    }

    let mut ap = 0.0;
    for i in 1..mrec.len() {
        if mrec[i] != mrec[i - 1] {
            ap += (mrec[i] - mrec[i - 1]) * mpre[i];
        }
    }
    ap
}

/// Mean average precision over classes (metric 1003).
///
/// The AP of each class is the area under its precision-recall curve; the
/// global entry is the mean over all class APs. Requires the whole run's
/// matching in one confidence-sorted pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAveragePrecision;

impl MetricProcessor for MeanAveragePrecision {
    fn id(&self) -> u32 {
        1003
    }

    fn name(&self) -> &'static str {
        "Mean Average Precision"
    }

    fn global_scope(&self) -> bool {
        true
    }

    fn compute(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
        matching: &[MatchRecord],
        params: &MetricParams,
    ) -> Result<ClassValues> {
        let mode: ApIntegrationMode = params.ap_integration_mode.parse()?;
        let integrate: fn(&[f64], &[f64]) -> f64 = match mode {
            ApIntegrationMode::ElevenPoint => ap_eleven_point,
            ApIntegrationMode::Exact => ap_exact,
        };

        let mut out = ClassValues::new();
        let mut ap_sum = 0.0;
        let mut class_count = 0usize;

        for label in class_labels(annotations, predictions, matching) {
            let (recalls, precisions) =
                precision_recall_points(annotations, predictions, matching, Some(&label));
            let ap = integrate(&recalls, &precisions);
            ap_sum += ap;
            class_count += 1;
            if params.calculate_per_class {
                out.insert(ClassKey::Class(label), MetricValue::Scalar(ap));
            }
        }

        let map = if class_count > 0 {
            ap_sum / class_count as f64
        } else {
            0.0
        };
        out.insert(ClassKey::Global, MetricValue::Scalar(map));
        Ok(out)
    }
}
