//! Counting statistics: true positives, false positives, false negatives.

use std::collections::{BTreeSet, HashSet};

use crate::error::Result;
use crate::metrics::{ClassKey, ClassValues, MetricParams, MetricProcessor};
use crate::types::{AnnotationRecord, MatchRecord, MetricValue, PredictionRecord};

/// TP/FP/FN counts for one class or for the whole record sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
}

/// Derive confusion counts from a matching and its surrounding record sets.
///
/// True positives are the matching entries themselves; false negatives and
/// false positives are the annotations and predictions whose identifier
/// does not appear in the matching. With `class` set, all three record sets
/// are partitioned by class label first.
pub(crate) fn confusion_counts(
    annotations: &[AnnotationRecord],
    predictions: &[PredictionRecord],
    matching: &[MatchRecord],
    class: Option<&str>,
) -> ConfusionCounts {
    let in_class = |label: &str| class.map_or(true, |c| c == label);

    let mut tp = 0;
    let mut matched_annotations: HashSet<(&str, &str)> = HashSet::new();
    let mut matched_predictions: HashSet<(&str, &str)> = HashSet::new();
    for record in matching {
        if !in_class(&record.class_label) {
            continue;
        }
        tp += 1;
        matched_annotations.insert((record.sample_id.as_str(), record.annotation_id.as_str()));
        matched_predictions.insert((record.sample_id.as_str(), record.prediction_id.as_str()));
    }

    let fn_ = annotations
        .iter()
        .filter(|a| in_class(&a.class_label))
        .filter(|a| !matched_annotations.contains(&(a.sample_id.as_str(), a.id.as_str())))
        .count();

    let fp = predictions
        .iter()
        .filter(|p| in_class(&p.class_label))
        .filter(|p| !matched_predictions.contains(&(p.sample_id.as_str(), p.id.as_str())))
        .count();

    ConfusionCounts { tp, fp, fn_ }
}

/// All class labels occurring in the given record sets, in sorted order.
pub(crate) fn class_labels(
    annotations: &[AnnotationRecord],
    predictions: &[PredictionRecord],
    matching: &[MatchRecord],
) -> BTreeSet<String> {
    let mut labels = BTreeSet::new();
    labels.extend(annotations.iter().map(|a| a.class_label.clone()));
    labels.extend(predictions.iter().map(|p| p.class_label.clone()));
    labels.extend(matching.iter().map(|m| m.class_label.clone()));
    labels
}

fn count_values(
    annotations: &[AnnotationRecord],
    predictions: &[PredictionRecord],
    matching: &[MatchRecord],
    params: &MetricParams,
    select: impl Fn(&ConfusionCounts) -> usize,
) -> ClassValues {
    let mut out = ClassValues::new();
    let total = confusion_counts(annotations, predictions, matching, None);
    out.insert(ClassKey::Global, MetricValue::Scalar(select(&total) as f64));

    if params.calculate_per_class {
        for label in class_labels(annotations, predictions, matching) {
            let counts = confusion_counts(annotations, predictions, matching, Some(&label));
            out.insert(
                ClassKey::Class(label),
                MetricValue::Scalar(select(&counts) as f64),
            );
        }
    }
    out
}

/// Number of true positives (metric 1029).
#[derive(Debug, Clone, Copy, Default)]
pub struct TruePositives;

impl MetricProcessor for TruePositives {
    fn id(&self) -> u32 {
        1029
    }

    fn name(&self) -> &'static str {
        "Number of True Positives"
    }

    fn compute(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
        matching: &[MatchRecord],
        params: &MetricParams,
    ) -> Result<ClassValues> {
        Ok(count_values(
            annotations,
            predictions,
            matching,
            params,
            |c| c.tp,
        ))
    }
}

/// Number of false positives (metric 1030).
#[derive(Debug, Clone, Copy, Default)]
pub struct FalsePositives;

impl MetricProcessor for FalsePositives {
    fn id(&self) -> u32 {
        1030
    }

    fn name(&self) -> &'static str {
        "Number of False Positives"
    }

    fn compute(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
        matching: &[MatchRecord],
        params: &MetricParams,
    ) -> Result<ClassValues> {
        Ok(count_values(
            annotations,
            predictions,
            matching,
            params,
            |c| c.fp,
        ))
    }
}

/// Number of false negatives (metric 1031).
#[derive(Debug, Clone, Copy, Default)]
pub struct FalseNegatives;

impl MetricProcessor for FalseNegatives {
    fn id(&self) -> u32 {
        1031
    }

    fn name(&self) -> &'static str {
        "Number of False Negatives"
    }

    fn compute(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
        matching: &[MatchRecord],
        params: &MetricParams,
    ) -> Result<ClassValues> {
        Ok(count_values(
            annotations,
            predictions,
            matching,
            params,
            |c| c.fn_,
        ))
    }
}
