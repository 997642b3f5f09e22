//! Evaluation configuration.
//!
//! The configuration object is deserialized from a JSON payload by the
//! caller; file discovery and CLI handling live outside the core.

use std::collections::HashMap;

use serde::Deserialize;

use crate::catalogue;
use crate::error::ConfigError;
use crate::filter::FilterDescriptor;
use crate::geometry::ImageBounds;
use crate::metrics::MetricParams;
use crate::reducer::MatchingPolicy;
use crate::tabular::ColumnMap;

/// Configuration of the correlation stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// IoU a pair has to reach to qualify as a match candidate.
    pub iou_threshold: f64,
    /// Policy applied by the matching reducer.
    pub matching_type: MatchingPolicy,
    /// Whether boxes are clipped to the image frame before comparison.
    pub clip_truncated_boxes: bool,
    /// x-coordinate clip range; defaults to the frame width.
    pub clip_x: Option<(f64, f64)>,
    /// y-coordinate clip range; defaults to the frame height.
    pub clip_y: Option<(f64, f64)>,
    /// Restrict correlation to these classes; `None` includes all.
    pub match_classes: Option<Vec<String>>,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            matching_type: MatchingPolicy::Exclusive,
            clip_truncated_boxes: true,
            clip_x: None,
            clip_y: None,
            match_classes: None,
        }
    }
}

impl CorrelationConfig {
    /// Clip bounds effective under this configuration, `None` when
    /// clipping is disabled.
    pub fn bounds(&self) -> Option<ImageBounds> {
        if !self.clip_truncated_boxes {
            return None;
        }
        let defaults = ImageBounds::default();
        Some(ImageBounds::new(
            self.clip_x.unwrap_or(defaults.x),
            self.clip_y.unwrap_or(defaults.y),
        ))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(ConfigError::InvalidThreshold(self.iou_threshold));
        }
        Ok(())
    }
}

/// Filter descriptors per target record set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub annotation: Vec<FilterDescriptor>,
    pub prediction: Vec<FilterDescriptor>,
    pub matching: Vec<FilterDescriptor>,
}

/// Which metrics to compute and with which parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// Metric identifiers to compute; empty means every registered metric.
    pub calculate: Vec<u32>,
    /// Per-metric parameter overrides, keyed by identifier.
    pub parameters: HashMap<u32, MetricParams>,
}

impl MetricConfig {
    /// Parameters configured for a metric, defaults when absent.
    pub fn params_for(&self, id: u32) -> MetricParams {
        self.parameters.get(&id).cloned().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for id in &self.calculate {
            catalogue::create_processor(*id)?;
        }
        for params in self.parameters.values() {
            params
                .ap_integration_mode
                .parse::<crate::metrics::ap::ApIntegrationMode>()?;
        }
        Ok(())
    }
}

/// Complete configuration of one evaluation run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub correlation: CorrelationConfig,
    pub filters: FilterConfig,
    pub metrics: MetricConfig,
    /// Column-name overrides for the tabular ingestion boundary.
    pub columns: ColumnMap,
}

impl EvalConfig {
    /// Parse a configuration from a JSON payload.
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let config: EvalConfig = serde_json::from_str(payload)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.correlation.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}
