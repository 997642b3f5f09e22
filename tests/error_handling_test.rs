//! Error-handling tests: configuration errors abort, data errors skip.

use det_eval::aggregator::Aggregator;
use det_eval::config::EvalConfig;
use det_eval::error::{ConfigError, EvalError};
use det_eval::types::{AnnotationRecord, BoundingBox, PredictionRecord, SampleRecords};

fn minimal_sample() -> SampleRecords {
    let mut sample = SampleRecords::new("s1");
    sample.annotations.push(AnnotationRecord::new(
        "a1",
        "s1",
        BoundingBox::new((10.0, 10.0), (4.0, 4.0)),
        "car",
    ));
    sample.predictions.push(PredictionRecord::new(
        "p1",
        "s1",
        BoundingBox::new((10.0, 10.0), (4.0, 4.0)),
        "car",
        0.9,
    ));
    sample
}

#[test]
fn test_unknown_metric_id_fails_before_running() {
    let config = EvalConfig::from_json_str(r#"{"metrics": {"calculate": [77]}}"#);
    assert!(matches!(config, Err(ConfigError::UnknownMetric(77))));
}

#[test]
fn test_unknown_operator_fails_at_parse_time() {
    let config = EvalConfig::from_json_str(r#"{"filters": {"annotation": [["size[0]", "~", 3]]}}"#);
    assert!(config.is_err());
}

#[test]
fn test_unknown_integration_mode_fails_before_running() {
    let config = EvalConfig::from_json_str(
        r#"{"metrics": {"parameters": {"1003": {"ap_integration_mode": "midpoint"}}}}"#,
    );
    assert!(matches!(
        config,
        Err(ConfigError::UnknownIntegrationMode(_))
    ));
}

#[test]
fn test_out_of_range_iou_threshold_is_rejected() {
    for payload in [
        r#"{"correlation": {"iou_threshold": -0.1}}"#,
        r#"{"correlation": {"iou_threshold": 1.1}}"#,
    ] {
        let config = EvalConfig::from_json_str(payload);
        assert!(matches!(config, Err(ConfigError::InvalidThreshold(_))));
    }
}

#[test]
fn test_unresolvable_column_aborts_the_run() {
    // The column name only fails against actual records, so the error
    // surfaces during the run, not at configuration time.
    let config =
        EvalConfig::from_json_str(r#"{"filters": {"prediction": [["velocity", ">", 1]]}}"#)
            .unwrap();
    let aggregator = Aggregator::new(config).unwrap();
    let result = aggregator.run(&[minimal_sample()]);
    assert!(matches!(
        result,
        Err(EvalError::Config(ConfigError::UnresolvableColumn(_)))
    ));
}

#[test]
fn test_configuration_error_emits_no_results() {
    let config =
        EvalConfig::from_json_str(r#"{"filters": {"matching": [["weight", "<", 2]]}}"#).unwrap();
    let aggregator = Aggregator::new(config).unwrap();
    let result = aggregator.run(&[minimal_sample()]);
    assert!(result.is_err());
}

#[test]
fn test_negative_box_size_skips_only_that_sample() {
    let mut bad = SampleRecords::new("bad");
    bad.predictions.push(PredictionRecord::new(
        "p1",
        "bad",
        BoundingBox::new((10.0, 10.0), (4.0, -4.0)),
        "car",
        0.9,
    ));

    let aggregator = Aggregator::new(EvalConfig::default()).unwrap();
    let report = aggregator.run(&[minimal_sample(), bad]).unwrap();

    assert_eq!(report.per_sample.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].sample_id, "bad");
    assert!(report.skipped[0].reason.contains("bounding box"));
}

#[test]
fn test_confidence_above_one_is_a_data_error() {
    let mut bad = minimal_sample();
    bad.predictions[0].confidence = 1.2;

    let aggregator = Aggregator::new(EvalConfig::default()).unwrap();
    let report = aggregator.run(&[bad]).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("confidence"));
}

#[test]
fn test_negative_confidence_is_a_data_error() {
    let mut bad = minimal_sample();
    bad.predictions[0].confidence = -0.1;

    let aggregator = Aggregator::new(EvalConfig::default()).unwrap();
    let report = aggregator.run(&[bad]).unwrap();
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn test_type_mismatch_in_filter_value() {
    // Comparing the string class label against a number cannot work.
    let config =
        EvalConfig::from_json_str(r#"{"filters": {"annotation": [["class_label", ">", 5]]}}"#)
            .unwrap();
    let aggregator = Aggregator::new(config).unwrap();
    let result = aggregator.run(&[minimal_sample()]);
    assert!(matches!(
        result,
        Err(EvalError::Config(ConfigError::InvalidFilterValue(_)))
    ));
}

#[test]
fn test_missing_tabular_column_is_a_data_error() {
    use polars::prelude::*;

    let df = df! {
        "sample_name" => ["s1"],
        "object_id" => ["a1"],
    }
    .unwrap();
    let result =
        det_eval::tabular::annotations_from_dataframe(&df, &det_eval::tabular::ColumnMap::default());
    assert!(matches!(result, Err(EvalError::Data(_))));
}
