//! Registry mapping metric identifiers to their processors.
//!
//! Identifiers are stable project-assigned numbers; the core treats them as
//! opaque keys and resolves them only here.

use crate::error::ConfigError;
use crate::metrics::{
    F1Score, FalseNegatives, FalsePositives, MeanAveragePrecision, MeanIntersectionOverUnion,
    MetricProcessor, Precision, PrecisionRecallCurve, Recall, TruePositives,
};

/// All registered metric identifiers, in ascending order.
pub const REGISTERED_IDS: [u32; 9] = [1000, 1001, 1003, 1027, 1028, 1029, 1030, 1031, 1040];

/// Instantiate the processor registered under an identifier.
pub fn create_processor(id: u32) -> Result<Box<dyn MetricProcessor>, ConfigError> {
    match id {
        1000 => Ok(Box::new(MeanIntersectionOverUnion)),
        1001 => Ok(Box::new(F1Score)),
        1003 => Ok(Box::new(MeanAveragePrecision)),
        1027 => Ok(Box::new(Precision)),
        1028 => Ok(Box::new(Recall)),
        1029 => Ok(Box::new(TruePositives)),
        1030 => Ok(Box::new(FalsePositives)),
        1031 => Ok(Box::new(FalseNegatives)),
        1040 => Ok(Box::new(PrecisionRecallCurve)),
        other => Err(ConfigError::UnknownMetric(other)),
    }
}

/// Instantiate every registered processor.
pub fn all_processors() -> Vec<Box<dyn MetricProcessor>> {
    REGISTERED_IDS
        .iter()
        .filter_map(|id| create_processor(*id).ok())
        .collect()
}

/// Name of the metric registered under an identifier.
pub fn metric_name(id: u32) -> Result<&'static str, ConfigError> {
    Ok(create_processor(id)?.name())
}
