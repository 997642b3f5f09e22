//! Precision and recall.

use crate::error::Result;
use crate::metrics::counts::{class_labels, confusion_counts};
use crate::metrics::{ClassKey, ClassValues, MetricParams, MetricProcessor};
use crate::types::{AnnotationRecord, MatchRecord, MetricValue, PredictionRecord};

/// Precision from TP and FP counts; `0.0` when there are no predictions.
pub fn calculate_precision(tp: usize, fp: usize) -> f64 {
    if tp + fp == 0 {
        return 0.0;
    }
    tp as f64 / (tp + fp) as f64
}

/// Recall from TP and FN counts; `0.0` when there are no annotations.
pub fn calculate_recall(tp: usize, fn_: usize) -> f64 {
    if tp + fn_ == 0 {
        return 0.0;
    }
    tp as f64 / (tp + fn_) as f64
}

fn ratio_values(
    annotations: &[AnnotationRecord],
    predictions: &[PredictionRecord],
    matching: &[MatchRecord],
    params: &MetricParams,
    ratio: impl Fn(usize, usize, usize) -> f64,
) -> ClassValues {
    let mut out = ClassValues::new();
    let total = confusion_counts(annotations, predictions, matching, None);
    out.insert(
        ClassKey::Global,
        MetricValue::Scalar(ratio(total.tp, total.fp, total.fn_)),
    );

    if params.calculate_per_class {
        for label in class_labels(annotations, predictions, matching) {
            let counts = confusion_counts(annotations, predictions, matching, Some(&label));
            out.insert(
                ClassKey::Class(label),
                MetricValue::Scalar(ratio(counts.tp, counts.fp, counts.fn_)),
            );
        }
    }
    out
}

/// Precision of the matching (metric 1027).
#[derive(Debug, Clone, Copy, Default)]
pub struct Precision;

impl MetricProcessor for Precision {
    fn id(&self) -> u32 {
        1027
    }

    fn name(&self) -> &'static str {
        "Precision"
    }

    fn compute(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
        matching: &[MatchRecord],
        params: &MetricParams,
    ) -> Result<ClassValues> {
        Ok(ratio_values(
            annotations,
            predictions,
            matching,
            params,
            |tp, fp, _| calculate_precision(tp, fp),
        ))
    }
}

/// Recall of the matching (metric 1028).
#[derive(Debug, Clone, Copy, Default)]
pub struct Recall;

impl MetricProcessor for Recall {
    fn id(&self) -> u32 {
        1028
    }

    fn name(&self) -> &'static str {
        "Recall"
    }

    fn compute(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
        matching: &[MatchRecord],
        params: &MetricParams,
    ) -> Result<ClassValues> {
        Ok(ratio_values(
            annotations,
            predictions,
            matching,
            params,
            |tp, _, fn_| calculate_recall(tp, fn_),
        ))
    }
}
