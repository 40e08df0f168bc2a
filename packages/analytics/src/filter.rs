//! Value-membership and range filters.
//!
//! Filters compose left to right as a logical AND. Every column is checked
//! before any row is dropped, so a request naming an unknown column has no
//! partial effect.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use thiserror::Error;
use traffic_stops_table::value::is_null_token;
use traffic_stops_table::{Table, Value};

use crate::{AnalyticsError, require_columns};

/// Keeps rows whose `column` value is one of `allowed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueFilter {
    pub column: String,
    pub allowed: Vec<Value>,
}

impl ValueFilter {
    #[must_use]
    pub fn new<V: Into<Value>>(column: &str, allowed: impl IntoIterator<Item = V>) -> Self {
        Self {
            column: column.to_owned(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

/// Keeps rows with `low <= column <= high`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeFilter {
    pub column: String,
    pub low: Value,
    pub high: Value,
}

impl RangeFilter {
    #[must_use]
    pub fn new(column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            column: column.to_owned(),
            low: low.into(),
            high: high.into(),
        }
    }

    fn contains(&self, value: &Value) -> bool {
        matches!(
            self.low.compare_with(value),
            Some(Ordering::Less | Ordering::Equal)
        ) && matches!(
            value.compare_with(&self.high),
            Some(Ordering::Less | Ordering::Equal)
        )
    }
}

/// Error parsing a filter from its `column=...` text form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("Expected 'column=values', got '{0}'")]
    MissingEquals(String),
    #[error("Expected 'low..high' range, got '{0}'")]
    MissingRange(String),
}

/// Parses `column=v1,v2,...`.
impl FromStr for ValueFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, values) = s
            .split_once('=')
            .ok_or_else(|| FilterParseError::MissingEquals(s.to_owned()))?;
        Ok(Self {
            column: column.trim().to_owned(),
            allowed: values.split(',').map(raw_literal).collect(),
        })
    }
}

/// Parses `column=low..high`.
impl FromStr for RangeFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, range) = s
            .split_once('=')
            .ok_or_else(|| FilterParseError::MissingEquals(s.to_owned()))?;
        let (low, high) = range
            .split_once("..")
            .ok_or_else(|| FilterParseError::MissingRange(range.to_owned()))?;
        Ok(Self {
            column: column.trim().to_owned(),
            low: raw_literal(low),
            high: raw_literal(high),
        })
    }
}

/// Keeps command-line text as text; it is typed against the filtered
/// column when the filter is applied.
fn raw_literal(raw: &str) -> Value {
    let raw = raw.trim();
    if is_null_token(raw) {
        Value::Null
    } else {
        Value::from(raw)
    }
}

/// Returns the first non-null cell, which stands for the column's kind.
fn sample(values: &[Value]) -> Option<&Value> {
    values.iter().find(|v| !v.is_null())
}

/// Parses a text literal against a non-text column. Other literals are
/// returned unchanged.
fn coerce_literal(literal: &Value, sample: Option<&Value>) -> Value {
    match (literal, sample) {
        (Value::Str(raw), Some(cell)) if !matches!(cell, Value::Str(_)) => {
            Value::parse_literal(raw)
        }
        _ => literal.clone(),
    }
}

/// Like [`coerce_literal`], but a non-text member of a value filter is
/// also matched as text against a text column (`1234` vs officer `"1234"`).
fn coerce_member(literal: &Value, sample: Option<&Value>) -> Value {
    match (literal, sample) {
        (Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Date(_), Some(Value::Str(_))) => {
            Value::Str(literal.to_string())
        }
        _ => coerce_literal(literal, sample),
    }
}

/// Applies value-membership filters in order.
///
/// # Errors
///
/// Returns [`AnalyticsError::UnknownColumn`] if any filter names a column
/// the table does not have.
pub fn apply_value_filter(table: &Table, filters: &[ValueFilter]) -> Result<Table, AnalyticsError> {
    require_columns(table, filters.iter().map(|f| f.column.as_str()))?;

    let mut result = table.clone();
    for filter in filters {
        let values = result.require(&filter.column)?.values();
        let kind = sample(values);
        let allowed: BTreeSet<Value> = filter
            .allowed
            .iter()
            .map(|v| coerce_member(v, kind))
            .collect();
        let next = result.filter(|row| allowed.contains(&values[row]));
        log::debug!(
            "value filter on '{}': {} -> {} rows",
            filter.column,
            result.num_rows(),
            next.num_rows()
        );
        result = next;
    }
    Ok(result)
}

/// Applies inclusive range filters in order. Nulls, and values that are
/// not comparable with the bounds, are dropped.
///
/// # Errors
///
/// Returns [`AnalyticsError::UnknownColumn`] if any filter names a column
/// the table does not have.
pub fn apply_range_filter(table: &Table, filters: &[RangeFilter]) -> Result<Table, AnalyticsError> {
    require_columns(table, filters.iter().map(|f| f.column.as_str()))?;

    let mut result = table.clone();
    for filter in filters {
        let values = result.require(&filter.column)?.values();
        let kind = sample(values);
        let bounds = RangeFilter {
            column: filter.column.clone(),
            low: coerce_literal(&filter.low, kind),
            high: coerce_literal(&filter.high, kind),
        };
        let next = result.filter(|row| bounds.contains(&values[row]));
        log::debug!(
            "range filter on '{}' [{}, {}]: {} -> {} rows",
            filter.column,
            filter.low,
            filter.high,
            result.num_rows(),
            next.num_rows()
        );
        result = next;
    }
    Ok(result)
}
