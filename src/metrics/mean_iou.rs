//! Mean intersection over union of the matching.

use std::collections::HashSet;

use crate::error::Result;
use crate::metrics::counts::class_labels;
use crate::metrics::{ClassKey, ClassValues, MetricParams, MetricProcessor};
use crate::types::{AnnotationRecord, MatchRecord, MetricValue, PredictionRecord};

/// Mean IoU over matched pairs and missed annotations (metric 1000).
///
/// Unmatched annotations contribute an IoU of `0.0`, so a detector is
/// penalized for every object it misses; unmatched predictions do not enter
/// the mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanIntersectionOverUnion;

fn mean_iou(
    annotations: &[AnnotationRecord],
    matching: &[MatchRecord],
    class: Option<&str>,
) -> f64 {
    let in_class = |label: &str| class.map_or(true, |c| c == label);

    let mut iou_sum = 0.0;
    let mut entries = 0usize;
    let mut matched: HashSet<(&str, &str)> = HashSet::new();
    for record in matching {
        if !in_class(&record.class_label) {
            continue;
        }
        iou_sum += record.iou;
        entries += 1;
        matched.insert((record.sample_id.as_str(), record.annotation_id.as_str()));
    }

    let missed = annotations
        .iter()
        .filter(|a| in_class(&a.class_label))
        .filter(|a| !matched.contains(&(a.sample_id.as_str(), a.id.as_str())))
        .count();
    entries += missed;

    if entries == 0 {
        return 0.0;
    }
    iou_sum / entries as f64
}

impl MetricProcessor for MeanIntersectionOverUnion {
    fn id(&self) -> u32 {
        1000
    }

    fn name(&self) -> &'static str {
        "Mean Intersection Over Union"
    }

    fn compute(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
        matching: &[MatchRecord],
        params: &MetricParams,
    ) -> Result<ClassValues> {
        let mut out = ClassValues::new();
        out.insert(
            ClassKey::Global,
            MetricValue::Scalar(mean_iou(annotations, matching, None)),
        );

        if params.calculate_per_class {
            for label in class_labels(annotations, predictions, matching) {
                out.insert(
                    ClassKey::Class(label.clone()),
                    MetricValue::Scalar(mean_iou(annotations, matching, Some(&label))),
                );
            }
        }
        Ok(out)
    }
}
