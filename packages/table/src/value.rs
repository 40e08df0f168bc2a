//! Dynamically typed cell values.
//!
//! Values carry a total order so they can be used directly as group keys
//! and sort keys: null < boolean < number < date < text. Integers and
//! floats compare numerically with each other.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tokens read as a missing value.
pub const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#NA", "<NA>", "N/A", "n/a", "NA", "NULL", "null", "NaN", "nan", "-NaN", "-nan",
    "None",
];

/// Date layouts accepted for date cells, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// A single table cell.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Missing value.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Str(String),
}

/// Returns `true` if the raw text denotes a missing value.
#[must_use]
pub fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.contains(&raw)
}

/// Parses a boolean literal (`true`/`True`/`TRUE` and the `false` forms).
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Parses a calendar date, accepting date-only and date-time layouts.
/// The time component, if any, is discarded.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

impl Value {
    /// Parses a free-form literal, trying integer, float, boolean, and date
    /// before falling back to text.
    #[must_use]
    pub fn parse_literal(raw: &str) -> Self {
        let raw = raw.trim();
        if is_null_token(raw) {
            return Self::Null;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Self::Float(f);
        }
        if let Some(b) = parse_bool(raw) {
            return Self::Bool(b);
        }
        if let Some(d) = parse_date(raw) {
            return Self::Date(d);
        }
        Self::Str(raw.to_owned())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null) || matches!(self, Self::Float(f) if f.is_nan())
    }

    /// Numeric view of the value. Booleans count as 0/1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) if !f.is_nan() => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Compares two values of the same kind. Returns `None` when either
    /// side is null or the kinds are not comparable (e.g. text vs number).
    #[must_use]
    pub fn compare_with(&self, other: &Self) -> Option<Ordering> {
        if self.is_null() || other.is_null() || self.rank() != other.rank() {
            return None;
        }
        Some(self.cmp(other))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Float(f) if f.is_nan() => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Date(_) => 3,
            Self::Str(_) => 4,
        }
    }
}

impl Ord for Value {
    #[allow(clippy::cast_precision_loss)]
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Int(a), Self::Float(b)) if !b.is_nan() => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) if !a.is_nan() => a.total_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) if !a.is_nan() && !b.is_nan() => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_nan() => Ok(()),
            Self::Float(x) => write!(f, "{x}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) if x.is_nan() => serializer.serialize_none(),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Date(_) => serializer.collect_str(self),
            Self::Str(s) => serializer.serialize_str(s),
        }
    }
}

/// Shape accepted from config files: plain scalars.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarLiteral {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<ScalarLiteral>::deserialize(deserializer)? {
            None => Self::Null,
            Some(ScalarLiteral::Bool(b)) => Self::Bool(b),
            Some(ScalarLiteral::Int(i)) => Self::Int(i),
            Some(ScalarLiteral::Float(f)) => Self::Float(f),
            Some(ScalarLiteral::Str(s)) => Self::Str(s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals_by_precedence() {
        assert_eq!(Value::parse_literal("42"), Value::Int(42));
        assert_eq!(Value::parse_literal("4.5"), Value::Float(4.5));
        assert_eq!(Value::parse_literal("True"), Value::Bool(true));
        assert_eq!(
            Value::parse_literal("2015-06-03"),
            Value::Date(NaiveDate::from_ymd_opt(2015, 6, 3).unwrap())
        );
        assert_eq!(Value::parse_literal("Speeding"), Value::from("Speeding"));
        assert!(Value::parse_literal("NaN").is_null());
        assert!(Value::parse_literal("  ").is_null());
    }

    #[test]
    fn ints_and_floats_compare_numerically() {
        assert_eq!(Value::Int(21), Value::Float(21.0));
        assert!(Value::Int(20) < Value::Float(20.5));
        assert!(Value::Float(36.5) > Value::Int(36));
    }

    #[test]
    fn nulls_sort_first_and_kinds_are_ranked() {
        let mut values = vec![
            Value::from("a"),
            Value::Int(3),
            Value::Null,
            Value::Bool(true),
            Value::Float(f64::NAN),
        ];
        values.sort();
        assert!(values[0].is_null());
        assert!(values[1].is_null());
        assert_eq!(values[2], Value::Bool(true));
        assert_eq!(values[3], Value::Int(3));
        assert_eq!(values[4], Value::from("a"));
    }

    #[test]
    fn compare_with_rejects_mixed_kinds() {
        assert_eq!(Value::from("30").compare_with(&Value::Int(30)), None);
        assert_eq!(Value::Null.compare_with(&Value::Null), None);
        assert_eq!(
            Value::Int(30).compare_with(&Value::Float(31.0)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn parses_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2016, 1, 9);
        assert_eq!(parse_date("2016-01-09"), expected);
        assert_eq!(parse_date("01/09/2016"), expected);
        assert_eq!(parse_date("2016-01-09 13:45:00"), expected);
        assert_eq!(parse_date("2016-01-09T13:45:00"), expected);
        assert_eq!(parse_date("January 9th"), None);
    }

    #[test]
    fn serializes_to_json_scalars() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Bool(false),
            Value::Int(7),
            Value::Float(0.25),
            Value::from("UNKNOWN"),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,false,7,0.25,"UNKNOWN"]"#);
    }

    #[test]
    fn deserializes_config_scalars() {
        let values: Vec<Value> = serde_json::from_str(r#"[false, 3, 1.5, "UNKNOWN", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Bool(false),
                Value::Int(3),
                Value::Float(1.5),
                Value::from("UNKNOWN"),
                Value::Null,
            ]
        );
    }
}
