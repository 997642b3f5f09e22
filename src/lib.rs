//! # det-eval
//!
//! A Rust library for evaluating 2D object-detection results against
//! ground-truth annotations.
//!
//! The pipeline correlates predicted boxes to annotated boxes by IoU,
//! filters the record sets with configurable predicates, collapses the
//! many-to-many candidate matching into a one-to-one matching, and computes
//! a catalogue of detection-quality metrics, per class and globally:
//!
//! - **Counts** (true positives, false positives, false negatives)
//! - **Precision**, **Recall**, **F1 score**
//! - **Mean IoU** over matched and missed objects
//! - **Mean average precision** (VOC 11-point or exact integration)
//! - **Precision-recall curves**
//!
//! ## Quick start
//!
//! ```rust
//! use det_eval::aggregator::Aggregator;
//! use det_eval::config::EvalConfig;
//! use det_eval::types::{AnnotationRecord, BoundingBox, PredictionRecord, SampleRecords};
//!
//! # fn main() -> det_eval::error::Result<()> {
//! let mut sample = SampleRecords::new("frame-0001");
//! sample.annotations.push(AnnotationRecord::new(
//!     "a1",
//!     "frame-0001",
//!     BoundingBox::new((10.0, 10.0), (4.0, 4.0)),
//!     "car",
//! ));
//! sample.predictions.push(PredictionRecord::new(
//!     "p1",
//!     "frame-0001",
//!     BoundingBox::new((10.0, 10.0), (4.0, 4.0)),
//!     "car",
//!     0.9,
//! ));
//!
//! let aggregator = Aggregator::new(EvalConfig::default())?;
//! let report = aggregator.run(&[sample])?;
//! assert!(!report.global.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! Per sample: [`correlator::BoxCorrelator`] emits every qualifying
//! annotation/prediction pair, [`filter`] applies the configured
//! predicates to all three record sets, and [`reducer::reduce`] collapses
//! the candidates under the configured [`reducer::MatchingPolicy`]. The
//! [`aggregator::Aggregator`] runs this map phase in parallel, then feeds
//! the accumulated record sets to the [`metrics`] processors resolved via
//! the [`catalogue`].
//!
//! Record sets arrive from external loaders either as typed
//! [`types::SampleRecords`] or as polars DataFrames through the [`tabular`]
//! adapter.

pub mod aggregator;
pub mod catalogue;
pub mod config;
pub mod correlator;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod metrics;
pub mod reducer;
pub mod tabular;
pub mod types;

// Re-export commonly used types and functions
pub use aggregator::{Aggregator, EvaluationReport, SampleResult, SkippedSample};
pub use config::EvalConfig;
pub use correlator::BoxCorrelator;
pub use error::{ConfigError, DataError, EvalError, Result};
pub use filter::{FilterDescriptor, FilterOp, FilterValue};
pub use geometry::{clip_to_bounds, iou, ImageBounds};
pub use metrics::{ClassKey, MetricParams, MetricProcessor};
pub use reducer::{reduce, MatchingPolicy};
pub use types::{
    AnnotationRecord, AttrValue, BoundingBox, MatchRecord, MetricValue, PredictionRecord,
    ResultRecord, SampleRecords,
};
