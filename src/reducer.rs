//! Reduction of many-to-many matchings to one-to-one matchings.

use std::collections::HashSet;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::MatchRecord;

/// Policy deciding how a candidate matching becomes the usable matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingPolicy {
    /// Keep every qualifying pair (many-to-many).
    Complete,
    /// Collapse to a one-to-one matching; unmatched endpoints become the
    /// false negatives / false positives downstream.
    #[default]
    Exclusive,
}

impl MatchingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchingPolicy::Complete => "complete",
            MatchingPolicy::Exclusive => "exclusive",
        }
    }
}

impl FromStr for MatchingPolicy {
    type Err = ConfigError;

    fn from_str(matching_type: &str) -> Result<Self, Self::Err> {
        match matching_type {
            "complete" => Ok(MatchingPolicy::Complete),
            "exclusive" => Ok(MatchingPolicy::Exclusive),
            other => Err(ConfigError::UnknownMatchingType(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for MatchingPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let matching_type = String::deserialize(deserializer)?;
        matching_type.parse().map_err(serde::de::Error::custom)
    }
}

/// Reduce a candidate matching under the given policy.
///
/// With [`MatchingPolicy::Complete`] the input passes through unchanged.
/// With [`MatchingPolicy::Exclusive`] candidates are consumed greedily by
/// descending IoU, ties broken by descending confidence and then by
/// ascending (annotation, prediction) identifier so that the result is
/// unique and reproducible for a fixed input; once an annotation or
/// prediction is consumed its remaining candidates are discarded.
///
/// Candidates never pair across samples, so reducing a multi-sample
/// concatenation equals reducing each sample separately.
pub fn reduce(matching: Vec<MatchRecord>, policy: MatchingPolicy) -> Vec<MatchRecord> {
    match policy {
        MatchingPolicy::Complete => matching,
        MatchingPolicy::Exclusive => reduce_exclusive(matching),
    }
}

fn reduce_exclusive(mut matching: Vec<MatchRecord>) -> Vec<MatchRecord> {
    matching.sort_by(|a, b| {
        b.iou
            .total_cmp(&a.iou)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.annotation_id.cmp(&b.annotation_id))
            .then_with(|| a.prediction_id.cmp(&b.prediction_id))
    });

    let mut consumed_annotations: HashSet<(String, String)> = HashSet::new();
    let mut consumed_predictions: HashSet<(String, String)> = HashSet::new();
    let mut reduced = Vec::new();

    for candidate in matching {
        let annotation_key = (candidate.sample_id.clone(), candidate.annotation_id.clone());
        let prediction_key = (candidate.sample_id.clone(), candidate.prediction_id.clone());

        if consumed_annotations.contains(&annotation_key)
            || consumed_predictions.contains(&prediction_key)
        {
            continue;
        }

        consumed_annotations.insert(annotation_key);
        consumed_predictions.insert(prediction_key);
        reduced.push(candidate);
    }

    reduced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        annotation_id: &str,
        prediction_id: &str,
        iou: f64,
        confidence: f64,
    ) -> MatchRecord {
        MatchRecord {
            annotation_id: annotation_id.to_string(),
            prediction_id: prediction_id.to_string(),
            sample_id: "s1".to_string(),
            class_label: "car".to_string(),
            iou,
            confidence,
        }
    }

    #[test]
    fn test_complete_policy_is_identity() {
        let matching = vec![
            candidate("a1", "p1", 0.9, 0.8),
            candidate("a1", "p2", 0.7, 0.9),
        ];
        let reduced = reduce(matching.clone(), MatchingPolicy::Complete);
        assert_eq!(reduced, matching);
    }

    #[test]
    fn test_single_candidate_survives() {
        let matching = vec![candidate("a1", "p1", 0.9, 0.8)];
        let reduced = reduce(matching.clone(), MatchingPolicy::Exclusive);
        assert_eq!(reduced, matching);
    }

    #[test]
    fn test_highest_iou_wins() {
        let matching = vec![
            candidate("a1", "p1", 0.6, 0.9),
            candidate("a1", "p2", 0.9, 0.4),
        ];
        let reduced = reduce(matching, MatchingPolicy::Exclusive);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].prediction_id, "p2");
    }

    #[test]
    fn test_confidence_breaks_iou_ties() {
        let matching = vec![
            candidate("a1", "p1", 0.8, 0.4),
            candidate("a1", "p2", 0.8, 0.9),
        ];
        let reduced = reduce(matching, MatchingPolicy::Exclusive);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].prediction_id, "p2");
    }

    #[test]
    fn test_identifier_breaks_remaining_ties() {
        let matching = vec![
            candidate("a1", "p2", 0.8, 0.9),
            candidate("a1", "p1", 0.8, 0.9),
        ];
        let reduced = reduce(matching, MatchingPolicy::Exclusive);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].prediction_id, "p1");
    }

    #[test]
    fn test_no_endpoint_appears_twice() {
        let matching = vec![
            candidate("a1", "p1", 0.9, 0.9),
            candidate("a1", "p2", 0.8, 0.8),
            candidate("a2", "p1", 0.7, 0.9),
            candidate("a2", "p2", 0.6, 0.8),
        ];
        let reduced = reduce(matching, MatchingPolicy::Exclusive);

        let mut annotations = HashSet::new();
        let mut predictions = HashSet::new();
        for record in &reduced {
            assert!(annotations.insert(record.annotation_id.clone()));
            assert!(predictions.insert(record.prediction_id.clone()));
        }
        assert_eq!(reduced.len(), 2);
    }

    #[test]
    fn test_three_candidates_one_annotation() {
        let matching = vec![
            candidate("a1", "p1", 0.5, 0.8),
            candidate("a1", "p2", 0.9, 0.7),
            candidate("a1", "p3", 0.7, 0.9),
        ];
        let reduced = reduce(matching, MatchingPolicy::Exclusive);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].prediction_id, "p2");
    }

    #[test]
    fn test_result_is_input_order_independent() {
        let matching = vec![
            candidate("a1", "p1", 0.9, 0.9),
            candidate("a1", "p2", 0.8, 0.8),
            candidate("a2", "p1", 0.7, 0.9),
            candidate("a2", "p3", 0.7, 0.9),
        ];
        let mut shuffled = matching.clone();
        shuffled.reverse();

        let reduced = reduce(matching, MatchingPolicy::Exclusive);
        let reduced_shuffled = reduce(shuffled, MatchingPolicy::Exclusive);
        assert_eq!(reduced, reduced_shuffled);
    }

    #[test]
    fn test_samples_reduce_independently() {
        let mut matching = vec![candidate("a1", "p1", 0.9, 0.9)];
        let mut other = candidate("a1", "p1", 0.8, 0.8);
        other.sample_id = "s2".to_string();
        matching.push(other);

        let reduced = reduce(matching, MatchingPolicy::Exclusive);
        assert_eq!(reduced.len(), 2);
    }
}
