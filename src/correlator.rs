//! Correlation of annotated and predicted bounding boxes.

use tracing::debug;

use crate::geometry::{clip_to_bounds, iou, ImageBounds};
use crate::types::{AnnotationRecord, BoundingBox, MatchRecord, PredictionRecord};

/// Correlator producing the complete many-to-many candidate matching for
/// one sample.
///
/// Every annotation/prediction pair of the same class whose IoU reaches the
/// threshold yields one [`MatchRecord`]. The correlator is policy-agnostic:
/// collapsing the candidate set into a one-to-one matching is the reducer's
/// job.
#[derive(Debug, Clone)]
pub struct BoxCorrelator {
    threshold: f64,
    clip: Option<ImageBounds>,
    match_classes: Option<Vec<String>>,
}

impl BoxCorrelator {
    /// Create a correlator with the given IoU threshold.
    ///
    /// When `clip` is set, both boxes of a pair are clipped to the image
    /// frame before the IoU is computed.
    pub fn new(threshold: f64, clip: Option<ImageBounds>) -> Self {
        Self {
            threshold,
            clip,
            match_classes: None,
        }
    }

    /// Restrict correlation to the given class labels.
    pub fn with_match_classes(mut self, classes: Vec<String>) -> Self {
        self.match_classes = Some(classes);
        self
    }

    /// IoU threshold a pair has to reach to qualify.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn class_included(&self, label: &str) -> bool {
        match &self.match_classes {
            Some(classes) => classes.iter().any(|c| c == label),
            None => true,
        }
    }

    fn effective_box(&self, bbox: &BoundingBox) -> BoundingBox {
        match &self.clip {
            Some(bounds) => clip_to_bounds(bbox, bounds),
            None => *bbox,
        }
    }

    /// Correlate the annotation and prediction sets of one sample.
    ///
    /// Output order is deterministic: predictions in input order, each with
    /// its qualifying annotations in input order. Complexity is
    /// O(|annotations| * |predictions|).
    pub fn correlate(
        &self,
        annotations: &[AnnotationRecord],
        predictions: &[PredictionRecord],
    ) -> Vec<MatchRecord> {
        let mut matching = Vec::new();

        for prediction in predictions {
            if !self.class_included(&prediction.class_label) {
                continue;
            }
            let prediction_box = self.effective_box(&prediction.bbox);

            for annotation in annotations {
                if annotation.class_label != prediction.class_label {
                    continue;
                }
                let annotation_box = self.effective_box(&annotation.bbox);

                let value = iou(&prediction_box, &annotation_box);
                if value >= self.threshold {
                    matching.push(MatchRecord {
                        annotation_id: annotation.id.clone(),
                        prediction_id: prediction.id.clone(),
                        sample_id: annotation.sample_id.clone(),
                        class_label: annotation.class_label.clone(),
                        iou: value,
                        confidence: prediction.confidence,
                    });
                }
            }
        }

        debug!(
            candidates = matching.len(),
            annotations = annotations.len(),
            predictions = predictions.len(),
            "correlated sample"
        );
        matching
    }
}
