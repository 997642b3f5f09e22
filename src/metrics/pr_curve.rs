//! Precision-recall curves from confidence-ranked predictions.

use std::collections::HashSet;

use crate::error::Result;
use crate::metrics::counts::class_labels;
use crate::metrics::{ClassKey, ClassValues, MetricParams, MetricProcessor};
use crate::types::{AnnotationRecord, MatchRecord, MetricValue, PredictionRecord};

/// Compute the points of a precision-recall curve.
///
/// Predictions are ranked by descending confidence (ties broken by
/// identifier for determinism). Walking down the ranking, each prediction
/// is a true positive iff it appears in the matching; after every step one
/// (recall, precision) pair is emitted from the cumulative counts, so the
/// curve is ordered by non-increasing confidence. Zero denominators yield
/// `0.0` rather than an undefined value.
///
/// With `class` set, predictions, annotations and matching are partitioned
/// by class label first.
pub fn precision_recall_points(
    annotations: &[AnnotationRecord],
    predictions: &[PredictionRecord],
    matching: &[MatchRecord],
    class: Option<&str>,
) -> (Vec<f64>, Vec<f64>) {
    let in_class = |label: &str| class.map_or(true, |c| c == label);

    let matched: HashSet<(&str, &str)> = matching
        .iter()
        .filter(|m| in_class(&m.class_label))
        .map(|m| (m.sample_id.as_str(), m.prediction_id.as_str()))
        .collect();

    let num_annotations = annotations
        .iter()
        .filter(|a| in_class(&a.class_label))
        .count();

    let mut ranked: Vec<&PredictionRecord> = predictions
        .iter()
        .filter(|p| in_class(&p.class_label))
        .collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.sample_id.cmp(&b.sample_id))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut recalls = Vec::with_capacity(ranked.len());
    let mut precisions = Vec::with_capacity(ranked.len());
    let mut tp = 0usize;
    let mut fp = 0usize;

    for prediction in ranked {
        if matched.contains(&(prediction.sample_id.as_str(), prediction.id.as_str())) {
            tp += 1;
        } else {
            fp += 1;
        }

        let recall = if num_annotations > 0 {
            tp as f64 / num_annotations as f64
        } else {
            0.0
        };
        let precision = tp as f64 / (tp + fp) as f64;

        recalls.push(recall);
        precisions.push(precision);
    }

    (recalls, precisions)
}

/// Precision-recall curve (metric 1040).
///
/// Emits one curve of (recall, precision) points per class plus the
/// combined curve as the global entry. Requires the whole run's matching in
/// one pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecisionRecallCurve;

impl MetricProcessor for PrecisionRecallCurve {
    fn id(&self) -> u32 {
        1040
    }

    fn name(&self) -> &'static str {
        "Precision-Recall Curve"
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
        let mut out = ClassValues::new();

        let (recalls, precisions) =
            precision_recall_points(annotations, predictions, matching, None);
        out.insert(
            ClassKey::Global,
            MetricValue::Curve(recalls.into_iter().zip(precisions).collect()),
        );

        if params.calculate_per_class {
            for label in class_labels(annotations, predictions, matching) {
                let (recalls, precisions) =
                    precision_recall_points(annotations, predictions, matching, Some(&label));
                out.insert(
                    ClassKey::Class(label),
                    MetricValue::Curve(recalls.into_iter().zip(precisions).collect()),
                );
            }
        }
        Ok(out)
    }
}
