//! Orchestration of the evaluation pipeline.
//!
//! Per sample: correlate, filter, reduce, compute sample-scope metrics.
//! After all samples: run every configured processor once over the
//! accumulated record sets, so rank-based metrics see the whole run in a
//! single confidence-sorted pass.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::catalogue;
use crate::config::EvalConfig;
use crate::correlator::BoxCorrelator;
use crate::error::{DataError, EvalError, Result};
use crate::filter;
use crate::metrics::{ClassKey, MetricProcessor};
use crate::reducer::reduce;
use crate::types::{
    AnnotationRecord, MatchRecord, PredictionRecord, ResultRecord, SampleRecords,
};

/// Metric results of one sample.
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub sample_id: String,
    pub records: Vec<ResultRecord>,
}

/// A sample excluded from the run due to a data error.
#[derive(Debug, Clone)]
pub struct SkippedSample {
    pub sample_id: String,
    pub reason: String,
}

/// The complete output of one evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// One record per (metric, class-or-global) pair, over the whole run.
    pub global: Vec<ResultRecord>,
    /// Sample-scope metric results, one entry per processed sample.
    pub per_sample: Vec<SampleResult>,
    /// Samples excluded from all metric inputs.
    pub skipped: Vec<SkippedSample>,
}

/// Filtered and reduced record sets of one sample, retained until the
/// global metric phase.
struct SampleOutcome {
    sample_id: String,
    annotations: Vec<AnnotationRecord>,
    predictions: Vec<PredictionRecord>,
    matching: Vec<MatchRecord>,
    records: Vec<ResultRecord>,
}

/// Whole-run accumulation of the per-sample outputs, fed to global-scope
/// processors after the map phase.
#[derive(Default)]
struct RunAccumulator {
    annotations: Vec<AnnotationRecord>,
    predictions: Vec<PredictionRecord>,
    matching: Vec<MatchRecord>,
}

impl RunAccumulator {
    fn extend(&mut self, outcome: SampleOutcome) {
        self.annotations.extend(outcome.annotations);
        self.predictions.extend(outcome.predictions);
        self.matching.extend(outcome.matching);
    }
}

/// Drives correlation, filtering, reduction and metric computation over a
/// set of samples.
pub struct Aggregator {
    config: EvalConfig,
    correlator: BoxCorrelator,
    processors: Vec<Box<dyn MetricProcessor>>,
}

impl Aggregator {
    /// Build an aggregator, validating the configuration up front.
    ///
    /// Configuration errors surface here, before any sample is touched.
    pub fn new(config: EvalConfig) -> Result<Self> {
        config.validate()?;

        let mut correlator = BoxCorrelator::new(
            config.correlation.iou_threshold,
            config.correlation.bounds(),
        );
        if let Some(classes) = &config.correlation.match_classes {
            correlator = correlator.with_match_classes(classes.clone());
        }

        let processors = if config.metrics.calculate.is_empty() {
            catalogue::all_processors()
        } else {
            config
                .metrics
                .calculate
                .iter()
                .map(|id| catalogue::create_processor(*id))
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        Ok(Self {
            config,
            correlator,
            processors,
        })
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate all samples and produce the final result records.
    ///
    /// Samples are processed on the rayon thread pool; per-sample work
    /// shares no mutable state and the results are merged in input order.
    /// A [`DataError`] skips the offending sample with a warning; any other
    /// error aborts the run.
    pub fn run(&self, samples: &[SampleRecords]) -> Result<EvaluationReport> {
        let outcomes: Vec<(String, Result<SampleOutcome>)> = samples
            .par_iter()
            .map(|sample| (sample.sample_id.clone(), self.process_sample(sample)))
            .collect();

        let mut accumulator = RunAccumulator::default();
        let mut per_sample = Vec::new();
        let mut skipped = Vec::new();

        for (sample_id, outcome) in outcomes {
            match outcome {
                Ok(outcome) => {
                    per_sample.push(SampleResult {
                        sample_id,
                        records: outcome.records.clone(),
                    });
                    accumulator.extend(outcome);
                }
                Err(EvalError::Data(error)) => {
                    warn!(sample = %sample_id, %error, "skipping sample");
                    skipped.push(SkippedSample {
                        sample_id,
                        reason: error.to_string(),
                    });
                }
                Err(error) => return Err(error),
            }
        }

        debug!(
            samples = per_sample.len(),
            skipped = skipped.len(),
            matches = accumulator.matching.len(),
            "computing global metrics"
        );

        let mut global = Vec::new();
        for processor in &self.processors {
            let params = self.config.metrics.params_for(processor.id());
            let values = processor.compute(
                &accumulator.annotations,
                &accumulator.predictions,
                &accumulator.matching,
                &params,
            )?;
            global.extend(result_records(processor.as_ref(), values));
        }

        Ok(EvaluationReport {
            global,
            per_sample,
            skipped,
        })
    }

    fn process_sample(&self, sample: &SampleRecords) -> Result<SampleOutcome> {
        validate_sample(sample)?;

        let candidates = self
            .correlator
            .correlate(&sample.annotations, &sample.predictions);

        let annotations = filter::apply(&sample.annotations, &self.config.filters.annotation)?;
        let predictions = filter::apply(&sample.predictions, &self.config.filters.prediction)?;
        let candidates = filter::apply(&candidates, &self.config.filters.matching)?;
        let candidates = drop_filtered_endpoints(candidates, &annotations, &predictions);

        let matching = reduce(candidates, self.config.correlation.matching_type);

        let mut records = Vec::new();
        for processor in self.processors.iter().filter(|p| !p.global_scope()) {
            let params = self.config.metrics.params_for(processor.id());
            let values = processor.compute(&annotations, &predictions, &matching, &params)?;
            records.extend(result_records(processor.as_ref(), values));
        }

        Ok(SampleOutcome {
            sample_id: sample.sample_id.clone(),
            annotations,
            predictions,
            matching,
            records,
        })
    }
}

fn validate_sample(sample: &SampleRecords) -> Result<()> {
    for annotation in &sample.annotations {
        if !annotation.bbox.is_valid() {
            return Err(DataError::InvalidBox {
                record_id: annotation.id.clone(),
                width: annotation.bbox.size.0,
                height: annotation.bbox.size.1,
            }
            .into());
        }
    }
    for prediction in &sample.predictions {
        if !prediction.bbox.is_valid() {
            return Err(DataError::InvalidBox {
                record_id: prediction.id.clone(),
                width: prediction.bbox.size.0,
                height: prediction.bbox.size.1,
            }
            .into());
        }
        if !(0.0..=1.0).contains(&prediction.confidence) {
            return Err(DataError::InvalidConfidence {
                record_id: prediction.id.clone(),
                confidence: prediction.confidence,
            }
            .into());
        }
    }
    Ok(())
}

/// Remove matching rows whose annotation or prediction was filtered away.
fn drop_filtered_endpoints(
    matching: Vec<MatchRecord>,
    annotations: &[AnnotationRecord],
    predictions: &[PredictionRecord],
) -> Vec<MatchRecord> {
    let kept_annotations: HashSet<(&str, &str)> = annotations
        .iter()
        .map(|a| (a.sample_id.as_str(), a.id.as_str()))
        .collect();
    let kept_predictions: HashSet<(&str, &str)> = predictions
        .iter()
        .map(|p| (p.sample_id.as_str(), p.id.as_str()))
        .collect();

    matching
        .into_iter()
        .filter(|m| {
            kept_annotations.contains(&(m.sample_id.as_str(), m.annotation_id.as_str()))
                && kept_predictions.contains(&(m.sample_id.as_str(), m.prediction_id.as_str()))
        })
        .collect()
}

fn result_records(
    processor: &dyn MetricProcessor,
    values: crate::metrics::ClassValues,
) -> Vec<ResultRecord> {
    values
        .into_iter()
        .map(|(key, value)| ResultRecord {
            metric_id: processor.id(),
            metric_name: processor.name().to_string(),
            class_label: match key {
                ClassKey::Global => None,
                ClassKey::Class(label) => Some(label),
            },
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricConfig;
    use crate::types::{BoundingBox, MetricValue};

    fn annotation(id: &str, sample: &str, center: (f64, f64)) -> AnnotationRecord {
        AnnotationRecord::new(id, sample, BoundingBox::new(center, (4.0, 4.0)), "car")
    }

    fn prediction(
        id: &str,
        sample: &str,
        center: (f64, f64),
        confidence: f64,
    ) -> PredictionRecord {
        PredictionRecord::new(id, sample, BoundingBox::new(center, (4.0, 4.0)), "car", confidence)
    }

    fn scenario_sample() -> SampleRecords {
        SampleRecords {
            sample_id: "s1".to_string(),
            annotations: vec![
                annotation("a1", "s1", (10.0, 10.0)),
                annotation("a2", "s1", (50.0, 50.0)),
            ],
            predictions: vec![
                prediction("p1", "s1", (10.0, 10.0), 0.9),
                prediction("p2", "s1", (10.1, 10.1), 0.4),
                prediction("p3", "s1", (50.0, 50.0), 0.95),
            ],
        }
    }

    fn global_scalar(report: &EvaluationReport, metric_id: u32) -> f64 {
        report
            .global
            .iter()
            .find(|r| r.metric_id == metric_id && r.class_label.is_none())
            .and_then(|r| r.value.as_scalar())
            .unwrap()
    }

    #[test]
    fn test_two_annotation_three_prediction_scenario() {
        let config = EvalConfig {
            metrics: MetricConfig {
                calculate: vec![1029, 1030, 1031, 1027, 1028, 1001],
                ..MetricConfig::default()
            },
            ..EvalConfig::default()
        };
        let aggregator = Aggregator::new(config).unwrap();
        let report = aggregator.run(&[scenario_sample()]).unwrap();

        assert_eq!(global_scalar(&report, 1029), 2.0); // TP
        assert_eq!(global_scalar(&report, 1031), 0.0); // FN
        assert_eq!(global_scalar(&report, 1030), 1.0); // FP: p2 unmatched
        assert!((global_scalar(&report, 1027) - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(global_scalar(&report, 1028), 1.0);
        assert!((global_scalar(&report, 1001) - 0.8).abs() < 1e-10);
    }

    #[test]
    fn test_per_sample_results_present() {
        let config = EvalConfig {
            metrics: MetricConfig {
                calculate: vec![1029, 1003],
                ..MetricConfig::default()
            },
            ..EvalConfig::default()
        };
        let aggregator = Aggregator::new(config).unwrap();
        let report = aggregator.run(&[scenario_sample()]).unwrap();

        assert_eq!(report.per_sample.len(), 1);
        let records = &report.per_sample[0].records;
        // Sample-scope counts are present, the global-scope mAP is not.
        assert!(records.iter().any(|r| r.metric_id == 1029));
        assert!(records.iter().all(|r| r.metric_id != 1003));
    }

    #[test]
    fn test_data_error_skips_sample() {
        let mut bad = SampleRecords::new("bad");
        bad.annotations.push(AnnotationRecord::new(
            "a1",
            "bad",
            BoundingBox::new((0.0, 0.0), (-5.0, 4.0)),
            "car",
        ));

        let aggregator = Aggregator::new(EvalConfig::default()).unwrap();
        let report = aggregator.run(&[scenario_sample(), bad]).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].sample_id, "bad");
        assert_eq!(report.per_sample.len(), 1);
        // The skipped sample contributes nothing to the global counts.
        assert_eq!(global_scalar(&report, 1029), 2.0);
    }

    #[test]
    fn test_invalid_confidence_skips_sample() {
        let mut bad = scenario_sample();
        bad.sample_id = "bad".to_string();
        for record in &mut bad.predictions {
            record.sample_id = "bad".to_string();
        }
        bad.predictions[0].confidence = 1.5;

        let aggregator = Aggregator::new(EvalConfig::default()).unwrap();
        let report = aggregator.run(&[bad]).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert!(report.per_sample.is_empty());
    }

    #[test]
    fn test_filter_error_aborts_run() {
        let payload = r#"{"filters": {"annotation": [["no_such_column", ">", 1]]}}"#;
        let config = EvalConfig::from_json_str(payload).unwrap();
        let aggregator = Aggregator::new(config).unwrap();
        assert!(aggregator.run(&[scenario_sample()]).is_err());
    }

    #[test]
    fn test_annotation_filter_propagates_to_matching() {
        // Filtering out a1 turns its matched prediction into a false
        // positive.
        let payload = r#"{"filters": {"annotation": [["id", "!=", "a1"]]},
                          "metrics": {"calculate": [1029, 1030]}}"#;
        let config = EvalConfig::from_json_str(payload).unwrap();
        let aggregator = Aggregator::new(config).unwrap();
        let report = aggregator.run(&[scenario_sample()]).unwrap();

        assert_eq!(global_scalar(&report, 1029), 1.0);
        assert_eq!(global_scalar(&report, 1030), 2.0);
    }

    #[test]
    fn test_map_of_perfect_detector_is_one() {
        let sample = SampleRecords {
            sample_id: "s1".to_string(),
            annotations: vec![
                annotation("a1", "s1", (10.0, 10.0)),
                annotation("a2", "s1", (50.0, 50.0)),
            ],
            predictions: vec![
                prediction("p1", "s1", (10.0, 10.0), 1.0),
                prediction("p2", "s1", (50.0, 50.0), 1.0),
            ],
        };
        let config = EvalConfig {
            metrics: MetricConfig {
                calculate: vec![1003],
                ..MetricConfig::default()
            },
            ..EvalConfig::default()
        };
        let aggregator = Aggregator::new(config).unwrap();
        let report = aggregator.run(&[sample]).unwrap();
        assert_eq!(global_scalar(&report, 1003), 1.0);
    }

    #[test]
    fn test_pr_curve_emitted_as_curve() {
        let config = EvalConfig {
            metrics: MetricConfig {
                calculate: vec![1040],
                ..MetricConfig::default()
            },
            ..EvalConfig::default()
        };
        let aggregator = Aggregator::new(config).unwrap();
        let report = aggregator.run(&[scenario_sample()]).unwrap();

        let record = report
            .global
            .iter()
            .find(|r| r.metric_id == 1040 && r.class_label.is_none())
            .unwrap();
        match &record.value {
            MetricValue::Curve(points) => assert_eq!(points.len(), 3),
            other => panic!("expected a curve, got {other:?}"),
        }
    }
}
