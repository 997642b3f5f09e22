//! Generic predicate filters over record sets.
//!
//! Filters are described by `(column, operator, value)` descriptors loaded
//! from configuration. The column may address a component of a
//! sequence-valued field with bracket-index notation (e.g. `size[0]`).
//! Descriptors applied to the same record set combine with logical AND;
//! filtering never mutates the input set.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::{AttrValue, FieldAccess};

/// The closed set of relational filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
}

impl FilterOp {
    /// Parse the textual operator form used in configuration files.
    pub fn parse(op: &str) -> Result<Self, ConfigError> {
        match op {
            "==" => Ok(FilterOp::Eq),
            "!=" => Ok(FilterOp::Ne),
            ">" => Ok(FilterOp::Gt),
            ">=" => Ok(FilterOp::Ge),
            "<" => Ok(FilterOp::Lt),
            "<=" => Ok(FilterOp::Le),
            "in" => Ok(FilterOp::In),
            "not_in" => Ok(FilterOp::NotIn),
            other => Err(ConfigError::UnknownOperator(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::In => "in",
            FilterOp::NotIn => "not_in",
        }
    }
}

/// Comparison value of a filter descriptor.
///
/// Relational operators require a scalar; `in`/`not_in` require a list.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(AttrValue),
    List(Vec<AttrValue>),
}

impl FilterValue {
    /// Convert a JSON configuration value into a filter value.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        match value {
            serde_json::Value::Array(items) => {
                let mut scalars = Vec::with_capacity(items.len());
                for item in items {
                    scalars.push(json_scalar(item)?);
                }
                Ok(FilterValue::List(scalars))
            }
            other => Ok(FilterValue::Scalar(json_scalar(other)?)),
        }
    }
}

fn json_scalar(value: &serde_json::Value) -> Result<AttrValue, ConfigError> {
    match value {
        serde_json::Value::Bool(b) => Ok(AttrValue::Bool(*b)),
        serde_json::Value::String(s) => Ok(AttrValue::Str(s.clone())),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(AttrValue::Int(i))
            } else {
                Ok(AttrValue::Float(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        other => Err(ConfigError::InvalidFilterValue(format!(
            "unsupported filter value: {other}"
        ))),
    }
}

/// A single named predicate against one record set.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDescriptor {
    /// Column path, possibly with bracket indices (`size[0]`).
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FilterDescriptor {
    pub fn new(column: &str, op: FilterOp, value: FilterValue) -> Self {
        Self {
            column: column.to_string(),
            op,
            value,
        }
    }

    /// Evaluate the descriptor against one record.
    fn matches<R: FieldAccess>(&self, record: &R) -> Result<bool, ConfigError> {
        let field = resolve_path(record, &self.column)?;
        match self.op {
            FilterOp::Eq => values_equal(&field, self.scalar()?),
            FilterOp::Ne => values_equal(&field, self.scalar()?).map(|eq| !eq),
            FilterOp::Gt => Ok(matches!(
                compare(&field, self.scalar()?)?,
                Some(Ordering::Greater)
            )),
            FilterOp::Ge => Ok(matches!(
                compare(&field, self.scalar()?)?,
                Some(Ordering::Greater) | Some(Ordering::Equal)
            )),
            FilterOp::Lt => Ok(matches!(
                compare(&field, self.scalar()?)?,
                Some(Ordering::Less)
            )),
            FilterOp::Le => Ok(matches!(
                compare(&field, self.scalar()?)?,
                Some(Ordering::Less) | Some(Ordering::Equal)
            )),
            FilterOp::In => self.contains(&field),
            FilterOp::NotIn => self.contains(&field).map(|found| !found),
        }
    }

    fn scalar(&self) -> Result<&AttrValue, ConfigError> {
        match &self.value {
            FilterValue::Scalar(value) => Ok(value),
            FilterValue::List(_) => Err(ConfigError::InvalidFilterValue(format!(
                "operator {:?} requires a scalar value, got a list",
                self.op.as_str()
            ))),
        }
    }

    fn contains(&self, field: &AttrValue) -> Result<bool, ConfigError> {
        let candidates = match &self.value {
            FilterValue::List(values) => values,
            FilterValue::Scalar(_) => {
                return Err(ConfigError::InvalidFilterValue(format!(
                    "operator {:?} requires a list value, got a scalar",
                    self.op.as_str()
                )))
            }
        };
        for candidate in candidates {
            if values_equal(field, candidate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

// Configuration accepts both the compact triple form
// `["size[0]", ">", 33]` and the keyed form
// `{"column": "size[0]", "operator": ">", "value": 33}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorRepr {
    Triple(String, String, serde_json::Value),
    Keyed {
        column: String,
        operator: String,
        value: serde_json::Value,
    },
}

impl<'de> Deserialize<'de> for FilterDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (column, operator, value) = match DescriptorRepr::deserialize(deserializer)? {
            DescriptorRepr::Triple(column, operator, value) => (column, operator, value),
            DescriptorRepr::Keyed {
                column,
                operator,
                value,
            } => (column, operator, value),
        };
        let op = FilterOp::parse(&operator).map_err(serde::de::Error::custom)?;
        let value = FilterValue::from_json(&value).map_err(serde::de::Error::custom)?;
        Ok(FilterDescriptor { column, op, value })
    }
}

/// Resolve a column path against a record, descending through bracket
/// indices into sequence-valued fields.
fn resolve_path<R: FieldAccess>(record: &R, column: &str) -> Result<AttrValue, ConfigError> {
    let mut segments = column.split('[');
    let root = segments.next().unwrap_or_default();

    let mut value = record
        .field(root)
        .ok_or_else(|| ConfigError::UnresolvableColumn(column.to_string()))?;

    for segment in segments {
        let index: usize = segment
            .strip_suffix(']')
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| ConfigError::UnresolvableColumn(column.to_string()))?;
        value = match value {
            AttrValue::FloatSeq(seq) => seq
                .get(index)
                .copied()
                .map(AttrValue::Float)
                .ok_or_else(|| ConfigError::UnresolvableColumn(column.to_string()))?,
            _ => return Err(ConfigError::UnresolvableColumn(column.to_string())),
        };
    }

    Ok(value)
}

fn values_equal(field: &AttrValue, value: &AttrValue) -> Result<bool, ConfigError> {
    match (field, value) {
        (AttrValue::Str(a), AttrValue::Str(b)) => Ok(a == b),
        (AttrValue::Bool(a), AttrValue::Bool(b)) => Ok(a == b),
        _ => match (field.as_f64(), value.as_f64()) {
            (Some(a), Some(b)) => Ok(a == b),
            _ => Err(ConfigError::InvalidFilterValue(format!(
                "cannot compare {} with {}",
                field.kind(),
                value.kind()
            ))),
        },
    }
}

fn compare(field: &AttrValue, value: &AttrValue) -> Result<Option<Ordering>, ConfigError> {
    match (field, value) {
        (AttrValue::Str(a), AttrValue::Str(b)) => Ok(Some(a.cmp(b))),
        _ => match (field.as_f64(), value.as_f64()) {
            // NaN comparisons resolve to None and the record is dropped.
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
            _ => Err(ConfigError::InvalidFilterValue(format!(
                "operator requires comparable scalars, got {} and {}",
                field.kind(),
                value.kind()
            ))),
        },
    }
}

/// Evaluate descriptors against a record set, producing a keep-mask.
///
/// A record is kept iff all descriptors evaluate true; an empty descriptor
/// set keeps every record.
pub fn evaluate<R: FieldAccess>(
    records: &[R],
    descriptors: &[FilterDescriptor],
) -> Result<Vec<bool>, ConfigError> {
    let mut mask = vec![true; records.len()];
    for descriptor in descriptors {
        for (keep, record) in mask.iter_mut().zip(records) {
            if *keep {
                *keep = descriptor.matches(record)?;
            }
        }
    }
    Ok(mask)
}

/// Filter a record set, yielding a new set of the kept records.
pub fn apply<R: FieldAccess + Clone>(
    records: &[R],
    descriptors: &[FilterDescriptor],
) -> Result<Vec<R>, ConfigError> {
    let mask = evaluate(records, descriptors)?;
    Ok(records
        .iter()
        .zip(mask)
        .filter(|(_, keep)| *keep)
        .map(|(record, _)| record.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotationRecord, BoundingBox};

    fn test_records() -> Vec<AnnotationRecord> {
        vec![
            AnnotationRecord::new(
                "a1",
                "s1",
                BoundingBox::new((10.0, 10.0), (40.0, 30.0)),
                "car",
            )
            .with_attribute("occlusion", 0.1),
            AnnotationRecord::new(
                "a2",
                "s1",
                BoundingBox::new((50.0, 50.0), (20.0, 20.0)),
                "pedestrian",
            )
            .with_attribute("occlusion", 0.8),
            AnnotationRecord::new(
                "a3",
                "s1",
                BoundingBox::new((90.0, 90.0), (60.0, 10.0)),
                "car",
            )
            .with_attribute("occlusion", 0.4),
        ]
    }

    fn scalar(value: impl Into<AttrValue>) -> FilterValue {
        FilterValue::Scalar(value.into())
    }

    #[test]
    fn test_empty_descriptors_keep_all() {
        let records = test_records();
        let filtered = apply(&records, &[]).unwrap();
        assert_eq!(filtered, records);
    }

    #[test]
    fn test_equality_on_class_label() {
        let records = test_records();
        let descriptor = FilterDescriptor::new("class_label", FilterOp::Eq, scalar("car"));
        let filtered = apply(&records, &[descriptor]).unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.class_label == "car"));
    }

    #[test]
    fn test_bracket_path_on_size() {
        let records = test_records();
        let descriptor = FilterDescriptor::new("size[0]", FilterOp::Gt, scalar(33.0));
        let filtered = apply(&records, &[descriptor]).unwrap();
        let ids: Vec<&str> = filtered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a3"]);
    }

    #[test]
    fn test_attribute_threshold() {
        let records = test_records();
        let descriptor = FilterDescriptor::new("occlusion", FilterOp::Le, scalar(0.5));
        let mask = evaluate(&records, &[descriptor]).unwrap();
        assert_eq!(mask, vec![true, false, true]);
    }

    #[test]
    fn test_descriptors_combine_with_and() {
        let records = test_records();
        let descriptors = vec![
            FilterDescriptor::new("class_label", FilterOp::Eq, scalar("car")),
            FilterDescriptor::new("occlusion", FilterOp::Lt, scalar(0.2)),
        ];
        let filtered = apply(&records, &descriptors).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "a1");
    }

    #[test]
    fn test_in_operator() {
        let records = test_records();
        let descriptor = FilterDescriptor::new(
            "class_label",
            FilterOp::In,
            FilterValue::List(vec!["pedestrian".into(), "cyclist".into()]),
        );
        let filtered = apply(&records, &[descriptor]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "a2");
    }

    #[test]
    fn test_not_in_operator() {
        let records = test_records();
        let descriptor = FilterDescriptor::new(
            "class_label",
            FilterOp::NotIn,
            FilterValue::List(vec!["pedestrian".into()]),
        );
        let filtered = apply(&records, &[descriptor]).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        assert!(matches!(
            FilterOp::parse("~="),
            Err(ConfigError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_unresolvable_column_fails() {
        let records = test_records();
        let descriptor = FilterDescriptor::new("velocity", FilterOp::Gt, scalar(1.0));
        assert!(matches!(
            evaluate(&records, &[descriptor]),
            Err(ConfigError::UnresolvableColumn(_))
        ));
    }

    #[test]
    fn test_out_of_range_index_fails() {
        let records = test_records();
        let descriptor = FilterDescriptor::new("size[7]", FilterOp::Gt, scalar(0.0));
        assert!(matches!(
            evaluate(&records, &[descriptor]),
            Err(ConfigError::UnresolvableColumn(_))
        ));
    }

    #[test]
    fn test_in_with_scalar_value_fails() {
        let records = test_records();
        let descriptor = FilterDescriptor::new("class_label", FilterOp::In, scalar("car"));
        assert!(matches!(
            evaluate(&records, &[descriptor]),
            Err(ConfigError::InvalidFilterValue(_))
        ));
    }

    #[test]
    fn test_descriptor_deserializes_from_triple() {
        let descriptor: FilterDescriptor =
            serde_json::from_str(r#"["size[0]", ">", 33]"#).unwrap();
        assert_eq!(descriptor.column, "size[0]");
        assert_eq!(descriptor.op, FilterOp::Gt);
        assert_eq!(descriptor.value, FilterValue::Scalar(AttrValue::Int(33)));
    }

    #[test]
    fn test_descriptor_deserializes_from_map() {
        let descriptor: FilterDescriptor = serde_json::from_str(
            r#"{"column": "class_label", "operator": "in", "value": ["car", "truck"]}"#,
        )
        .unwrap();
        assert_eq!(descriptor.op, FilterOp::In);
        assert_eq!(
            descriptor.value,
            FilterValue::List(vec!["car".into(), "truck".into()])
        );
    }
}
