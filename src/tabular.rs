//! Ingestion of tabular record sets from polars DataFrames.
//!
//! External loaders deliver annotations and predictions as DataFrames; this
//! module validates the schema and materializes the typed record sets the
//! pipeline operates on. Column-name overrides live here: once a record is
//! built, its schema is fixed and the rest of the core never looks at
//! column names again.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Deserialize;

use crate::error::{DataError, Result};
use crate::types::{
    AnnotationRecord, AttrValue, BoundingBox, PredictionRecord, SampleRecords,
};

/// Names of the DataFrame columns holding the schema-fixed record fields.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnMap {
    pub sample: String,
    pub id: String,
    pub center: String,
    pub size: String,
    pub class_label: String,
    pub confidence: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            sample: "sample_name".to_string(),
            id: "object_id".to_string(),
            center: "center".to_string(),
            size: "size".to_string(),
            class_label: "class_id".to_string(),
            confidence: "confidence".to_string(),
        }
    }
}

impl ColumnMap {
    fn annotation_columns(&self) -> Vec<&str> {
        vec![
            &self.sample,
            &self.id,
            &self.center,
            &self.size,
            &self.class_label,
        ]
    }

    fn prediction_columns(&self) -> Vec<&str> {
        let mut columns = self.annotation_columns();
        columns.push(&self.confidence);
        columns
    }
}

/// Validate that a DataFrame contains all required columns.
pub fn validate_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    for column in required {
        if !names.iter().any(|name| name == column) {
            return Err(DataError::MissingColumn(column.to_string()).into());
        }
    }
    Ok(())
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let ca = series.str()?;

    let mut values = Vec::with_capacity(ca.len());
    for (row, value) in ca.into_iter().enumerate() {
        let value = value.ok_or_else(|| DataError::MalformedValue {
            column: name.to_string(),
            row,
            message: "null value".to_string(),
        })?;
        values.push(value.to_string());
    }
    Ok(values)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let ca = series.f64()?;

    let mut values = Vec::with_capacity(ca.len());
    for (row, value) in ca.into_iter().enumerate() {
        let value = value.ok_or_else(|| DataError::MalformedValue {
            column: name.to_string(),
            row,
            message: "null value".to_string(),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Extract an (x, y) pair from a list column at one row.
fn pair_at(df: &DataFrame, name: &str, row: usize) -> Result<(f64, f64)> {
    let malformed = |message: &str| DataError::MalformedValue {
        column: name.to_string(),
        row,
        message: message.to_string(),
    };

    let series = df.column(name)?.as_materialized_series().clone();
    let list = series.list()?;
    let inner = list
        .get_as_series(row)
        .ok_or_else(|| malformed("missing list entry"))?;
    let inner = inner.cast(&DataType::Float64)?;
    let values = inner.f64()?;

    if values.len() != 2 {
        return Err(malformed(&format!("expected 2 elements, got {}", values.len())).into());
    }
    let x = values.get(0).ok_or_else(|| malformed("null element"))?;
    let y = values.get(1).ok_or_else(|| malformed("null element"))?;
    Ok((x, y))
}

/// Convert one cell of an attribute column, `None` for nulls and
/// unsupported dtypes.
fn attr_at(df: &DataFrame, name: &str, row: usize) -> Result<Option<AttrValue>> {
    let value = match df.column(name)?.get(row)? {
        AnyValue::Null => None,
        AnyValue::Boolean(v) => Some(AttrValue::Bool(v)),
        AnyValue::Float64(v) => Some(AttrValue::Float(v)),
        AnyValue::Float32(v) => Some(AttrValue::Float(v as f64)),
        AnyValue::Int8(v) => Some(AttrValue::Int(v as i64)),
        AnyValue::Int16(v) => Some(AttrValue::Int(v as i64)),
        AnyValue::Int32(v) => Some(AttrValue::Int(v as i64)),
        AnyValue::Int64(v) => Some(AttrValue::Int(v)),
        AnyValue::UInt8(v) => Some(AttrValue::Int(v as i64)),
        AnyValue::UInt16(v) => Some(AttrValue::Int(v as i64)),
        AnyValue::UInt32(v) => Some(AttrValue::Int(v as i64)),
        AnyValue::UInt64(v) => Some(AttrValue::Int(v as i64)),
        AnyValue::String(v) => Some(AttrValue::Str(v.to_string())),
        AnyValue::StringOwned(v) => Some(AttrValue::Str(v.to_string())),
        AnyValue::List(series) => {
            let series = series.cast(&DataType::Float64)?;
            let values = series.f64()?;
            Some(AttrValue::FloatSeq(values.into_iter().flatten().collect()))
        }
        _ => None,
    };
    Ok(value)
}

fn attribute_columns(df: &DataFrame, fixed: &[&str]) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| !fixed.contains(&name.as_str()))
        .collect()
}

/// Materialize annotation records from a DataFrame.
pub fn annotations_from_dataframe(
    df: &DataFrame,
    columns: &ColumnMap,
) -> Result<Vec<AnnotationRecord>> {
    let fixed = columns.annotation_columns();
    validate_columns(df, &fixed)?;

    let samples = string_column(df, &columns.sample)?;
    let ids = string_column(df, &columns.id)?;
    let classes = string_column(df, &columns.class_label)?;
    let extra = attribute_columns(df, &fixed);

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let bbox = BoundingBox::new(
            pair_at(df, &columns.center, row)?,
            pair_at(df, &columns.size, row)?,
        );
        let mut record = AnnotationRecord::new(&ids[row], &samples[row], bbox, &classes[row]);
        for name in &extra {
            if let Some(value) = attr_at(df, name, row)? {
                record.attributes.insert(name.clone(), value);
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// Materialize prediction records from a DataFrame.
pub fn predictions_from_dataframe(
    df: &DataFrame,
    columns: &ColumnMap,
) -> Result<Vec<PredictionRecord>> {
    let fixed = columns.prediction_columns();
    validate_columns(df, &fixed)?;

    let samples = string_column(df, &columns.sample)?;
    let ids = string_column(df, &columns.id)?;
    let classes = string_column(df, &columns.class_label)?;
    let confidences = float_column(df, &columns.confidence)?;
    let extra = attribute_columns(df, &fixed);

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let bbox = BoundingBox::new(
            pair_at(df, &columns.center, row)?,
            pair_at(df, &columns.size, row)?,
        );
        let mut record = PredictionRecord::new(
            &ids[row],
            &samples[row],
            bbox,
            &classes[row],
            confidences[row],
        );
        for name in &extra {
            if let Some(value) = attr_at(df, name, row)? {
                record.attributes.insert(name.clone(), value);
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// Materialize per-sample record sets from annotation and prediction
/// DataFrames covering a whole run.
///
/// Samples are ordered by identifier; a sample occurring in only one of
/// the two frames gets an empty set for the other.
pub fn samples_from_dataframes(
    annotations: &DataFrame,
    predictions: &DataFrame,
    columns: &ColumnMap,
) -> Result<Vec<SampleRecords>> {
    let mut samples: BTreeMap<String, SampleRecords> = BTreeMap::new();

    for record in annotations_from_dataframe(annotations, columns)? {
        samples
            .entry(record.sample_id.clone())
            .or_insert_with(|| SampleRecords::new(&record.sample_id))
            .annotations
            .push(record);
    }
    for record in predictions_from_dataframe(predictions, columns)? {
        samples
            .entry(record.sample_id.clone())
            .or_insert_with(|| SampleRecords::new(&record.sample_id))
            .predictions
            .push(record);
    }

    Ok(samples.into_values().collect())
}
