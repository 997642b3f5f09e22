//! Error types for the det-eval library.

use thiserror::Error;

/// Result type for det-eval operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Fatal configuration errors.
///
/// A configuration error stops an evaluation run before any metric is
/// emitted.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown relational operator in a filter descriptor.
    #[error("unknown filter operator: {0:?}")]
    UnknownOperator(String),

    /// A filter column path could not be resolved against the record schema.
    #[error("unresolvable column path: {0:?}")]
    UnresolvableColumn(String),

    /// A filter comparison value that does not fit the operator.
    #[error("invalid filter value: {0}")]
    InvalidFilterValue(String),

    /// Unknown AP integration mode.
    #[error("unknown ap_integration_mode: {0:?}")]
    UnknownIntegrationMode(String),

    /// Unknown matching type in the correlation configuration.
    #[error("unknown matching_type: {0:?}")]
    UnknownMatchingType(String),

    /// A metric identifier that is not registered in the catalogue.
    #[error("unknown metric identifier: {0}")]
    UnknownMetric(u32),

    /// A threshold outside the valid range [0.0, 1.0].
    #[error("threshold must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f64),

    /// Error while parsing a configuration payload.
    #[error("configuration payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Per-sample data errors.
///
/// A data error invalidates the affected sample; the aggregator skips the
/// sample with a warning and excludes it from all metric inputs.
#[derive(Error, Debug)]
pub enum DataError {
    /// A bounding box with negative extent.
    #[error("invalid bounding box for record {record_id:?}: size ({width}, {height})")]
    InvalidBox {
        record_id: String,
        width: f64,
        height: f64,
    },

    /// A confidence score outside [0.0, 1.0].
    #[error("confidence out of range for record {record_id:?}: {confidence}")]
    InvalidConfidence { record_id: String, confidence: f64 },

    /// A required column is missing from a tabular input.
    #[error("missing column: {0:?}")]
    MissingColumn(String),

    /// A tabular cell that cannot be converted to the expected record field.
    #[error("malformed value in column {column:?} at row {row}: {message}")]
    MalformedValue {
        column: String,
        row: usize,
        message: String,
    },
}

/// Error type covering all det-eval failures.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    /// Error raised by the polars tabular backend.
    #[error("tabular error: {0}")]
    Tabular(#[from] polars::error::PolarsError),
}
