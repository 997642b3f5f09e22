//! F1 score.

use crate::error::Result;
use crate::metrics::counts::{class_labels, confusion_counts};
use crate::metrics::{ClassKey, ClassValues, MetricParams, MetricProcessor};
use crate::types::{AnnotationRecord, MatchRecord, MetricValue, PredictionRecord};

/// F1 score as the harmonic mean of precision and recall.
///
/// Returns `0.0` when both precision and recall are zero.
pub fn calculate_f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * (precision * recall) / (precision + recall)
}

fn f1_from_counts(tp: usize, fp: usize, fn_: usize) -> f64 {
    // Equivalent to 2PR/(P+R) but stable when only one denominator is zero.
    let denominator = 2 * tp + fp + fn_;
    if denominator == 0 {
        return 0.0;
    }
    2.0 * tp as f64 / denominator as f64
}

/// F1 score of the matching (metric 1001).
#[derive(Debug, Clone, Copy, Default)]
pub struct F1Score;

impl MetricProcessor for F1Score {
    fn id(&self) -> u32 {
        1001
    }

    fn name(&self) -> &'static str {
        "F1-Score"
    }

    fn compute(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
        matching: &[MatchRecord],
        params: &MetricParams,
    ) -> Result<ClassValues> {
        let mut out = ClassValues::new();
        let total = confusion_counts(annotations, predictions, matching, None);
        out.insert(
            ClassKey::Global,
            MetricValue::Scalar(f1_from_counts(total.tp, total.fp, total.fn_)),
        );

        if params.calculate_per_class {
            for label in class_labels(annotations, predictions, matching) {
                let counts = confusion_counts(annotations, predictions, matching, Some(&label));
                out.insert(
                    ClassKey::Class(label),
                    MetricValue::Scalar(f1_from_counts(counts.tp, counts.fp, counts.fn_)),
                );
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_f1() {
        assert!((calculate_f1_score(1.0, 1.0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_f1() {
        assert_eq!(calculate_f1_score(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_harmonic_mean() {
        // F1 = 2 * (0.8 * 0.6) / (0.8 + 0.6)
        assert!((calculate_f1_score(0.8, 0.6) - 0.96 / 1.4).abs() < 1e-10);
    }

    #[test]
    fn test_f1_from_counts_matches_ratio_form() {
        let tp = 8;
        let fp = 2;
        let fn_ = 3;
        let precision = tp as f64 / (tp + fp) as f64;
        let recall = tp as f64 / (tp + fn_) as f64;
        assert!(
            (f1_from_counts(tp, fp, fn_) - calculate_f1_score(precision, recall)).abs() < 1e-10
        );
    }

    #[test]
    fn test_f1_empty_inputs() {
        let values = F1Score
            .compute(&[], &[], &[], &MetricParams::default())
            .unwrap();
        assert_eq!(values[&ClassKey::Global], MetricValue::Scalar(0.0));
    }
}
