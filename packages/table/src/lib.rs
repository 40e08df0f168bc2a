#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory columnar table used by the traffic stop analytics.
//!
//! A [`Table`] is an ordered set of equally long, named [`Column`]s of
//! dynamically typed [`Value`]s. It supports the four capabilities the
//! analytics are built on: loading from delimited text, filtering rows by
//! predicate, grouping rows by key columns, and left-joining on a key.
//!
//! Tables are values: every operation returns a new table and leaves its
//! input untouched.

pub mod delimited;
pub mod value;

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::ser::{SerializeMap as _, SerializeSeq as _};
use serde::{Serialize, Serializer};
use thiserror::Error;

pub use delimited::{ColumnSpec, ColumnType, Schema};
pub use value::Value;

/// Errors that can occur while building or transforming a table.
#[derive(Debug, Error)]
pub enum TableError {
    /// A referenced column does not exist.
    #[error("Unknown column: {name}")]
    UnknownColumn {
        /// The column name that was requested.
        name: String,
    },

    /// Two columns share a name.
    #[error("Duplicate column: {name}")]
    DuplicateColumn {
        /// The repeated name.
        name: String,
    },

    /// A column's length differs from the table's row count.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A cell could not be parsed as its declared type.
    #[error("Line {line}: cannot parse '{value}' in column '{column}' as {expected}")]
    Parse {
        column: String,
        line: u64,
        value: String,
        expected: ColumnType,
    },

    /// A non-nullable column has a missing cell.
    #[error("Line {line}: missing value in required column '{column}'")]
    MissingValue { column: String, line: u64 },

    /// Malformed delimited input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Row indices grouped by key tuple, in key order.
pub type Groups = BTreeMap<Vec<Value>, Vec<usize>>;

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
    categorical: bool,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
            categorical: false,
        }
    }

    /// Creates a column holding `len` copies of `value`.
    #[must_use]
    pub fn repeat(name: impl Into<String>, value: &Value, len: usize) -> Self {
        Self::new(name, vec![value.clone(); len])
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the column holds labels from a category set rather than
    /// free-form values.
    #[must_use]
    pub const fn is_categorical(&self) -> bool {
        self.categorical
    }

    #[must_use]
    pub const fn with_categorical(mut self, categorical: bool) -> Self {
        self.categorical = categorical;
        self
    }

    #[must_use]
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of null cells.
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Returns a copy with every null cell replaced by `fill`.
    #[must_use]
    pub fn fill_null(&self, fill: &Value) -> Self {
        self.map(|v| if v.is_null() { fill.clone() } else { v.clone() })
    }

    /// Returns a same-named column built by applying `f` to every cell.
    #[must_use]
    pub fn map(&self, f: impl FnMut(&Value) -> Value) -> Self {
        Self {
            name: self.name.clone(),
            values: self.values.iter().map(f).collect(),
            categorical: self.categorical,
        }
    }

    fn take(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
            categorical: self.categorical,
        }
    }

    fn take_optional(&self, indices: &[Option<usize>]) -> Self {
        Self {
            name: self.name.clone(),
            values: indices
                .iter()
                .map(|i| i.map_or(Value::Null, |i| self.values[i].clone()))
                .collect(),
            categorical: self.categorical,
        }
    }
}

/// An ordered collection of equally long columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Builds a table from columns.
    ///
    /// # Errors
    ///
    /// * [`TableError::DuplicateColumn`] if two columns share a name
    /// * [`TableError::LengthMismatch`] if the columns differ in length
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let num_rows = columns.first().map_or(0, Column::len);
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(TableError::DuplicateColumn {
                    name: column.name.clone(),
                });
            }
            if column.len() != num_rows {
                return Err(TableError::LengthMismatch {
                    column: column.name.clone(),
                    expected: num_rows,
                    actual: column.len(),
                });
            }
        }
        Ok(Self { columns, num_rows })
    }

    /// Reads a delimited table. See [`delimited::read_csv`].
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the input is malformed or a declared
    /// column fails to parse.
    pub fn read_csv<R: Read>(reader: R, schema: Schema<'_>) -> Result<Self, TableError> {
        delimited::read_csv(reader, schema)
    }

    /// Writes the table as delimited text. See [`delimited::write_csv`].
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        delimited::write_csv(self, writer)
    }

    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[must_use]
    pub const fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Like [`Self::column`] but reports a missing column as an error.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] if no column has that name.
    pub fn require(&self, name: &str) -> Result<&Column, TableError> {
        self.column(name).ok_or_else(|| TableError::UnknownColumn {
            name: name.to_owned(),
        })
    }

    /// Returns the table with `column` appended, or replacing the existing
    /// column of the same name in place.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::LengthMismatch`] if the column length differs
    /// from the row count of a non-empty table.
    pub fn with_column(mut self, column: Column) -> Result<Self, TableError> {
        if !self.columns.is_empty() && column.len() != self.num_rows {
            let actual = column.len();
            return Err(TableError::LengthMismatch {
                column: column.name,
                expected: self.num_rows,
                actual,
            });
        }
        self.num_rows = column.len();
        if let Some(slot) = self.columns.iter_mut().find(|c| c.name == column.name) {
            *slot = column;
        } else {
            self.columns.push(column);
        }
        Ok(self)
    }

    /// Returns the rows at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            num_rows: indices.len(),
        }
    }

    /// Returns the rows for which `keep(row_index)` is `true`.
    #[must_use]
    pub fn filter(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
        let indices: Vec<usize> = (0..self.num_rows).filter(|&i| keep(i)).collect();
        self.take(&indices)
    }

    /// Groups row indices by the values of `keys`. Rows with a null in any
    /// key column belong to no group.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] if a key column is missing.
    pub fn group_indices(&self, keys: &[&str]) -> Result<Groups, TableError> {
        let key_columns = keys
            .iter()
            .map(|k| self.require(k))
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups = Groups::new();
        for row in 0..self.num_rows {
            let key: Vec<Value> = key_columns.iter().map(|c| c.values[row].clone()).collect();
            if key.iter().any(Value::is_null) {
                continue;
            }
            groups.entry(key).or_default().push(row);
        }
        Ok(groups)
    }

    /// Left-joins `right` on the column `on`, which must exist in both
    /// tables. Every left row is kept; each matching right row yields one
    /// output row, and unmatched left rows get nulls for the right
    /// columns. Other columns present on both sides are suffixed `_x`
    /// (left) and `_y` (right). Null keys never match.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] if `on` is missing from either
    /// table.
    pub fn left_join(&self, right: &Self, on: &str) -> Result<Self, TableError> {
        let left_key = self.require(on)?;
        let right_key = right.require(on)?;

        let mut right_index: BTreeMap<&Value, Vec<usize>> = BTreeMap::new();
        for (i, key) in right_key.values.iter().enumerate() {
            if !key.is_null() {
                right_index.entry(key).or_default().push(i);
            }
        }

        let mut left_rows = Vec::with_capacity(self.num_rows);
        let mut right_rows = Vec::with_capacity(self.num_rows);
        for (i, key) in left_key.values.iter().enumerate() {
            match right_index.get(key) {
                Some(matches) if !key.is_null() => {
                    for &j in matches {
                        left_rows.push(i);
                        right_rows.push(Some(j));
                    }
                }
                _ => {
                    left_rows.push(i);
                    right_rows.push(None);
                }
            }
        }

        let overlaps = |name: &str| name != on && self.has_column(name) && right.has_column(name);

        let mut columns: Vec<Column> = self
            .columns
            .iter()
            .map(|c| {
                let taken = c.take(&left_rows);
                if overlaps(&c.name) {
                    let name = format!("{}_x", c.name);
                    taken.renamed(name)
                } else {
                    taken
                }
            })
            .collect();

        for c in right.columns.iter().filter(|c| c.name != on) {
            let taken = c.take_optional(&right_rows);
            if overlaps(&c.name) {
                let name = format!("{}_y", c.name);
                columns.push(taken.renamed(name));
            } else {
                columns.push(taken);
            }
        }

        log::debug!(
            "left_join on '{on}': {} x {} rows -> {} rows",
            self.num_rows,
            right.num_rows,
            left_rows.len()
        );

        Self::new(columns)
    }

    /// Returns the rows stably sorted by `column`. Nulls always sort last.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] if the column is missing.
    pub fn sort_by(&self, column: &str, ascending: bool) -> Result<Self, TableError> {
        let values = &self.require(column)?.values;
        let mut indices: Vec<usize> = (0..self.num_rows).collect();
        indices.sort_by(|&a, &b| {
            let (va, vb) = (&values[a], &values[b]);
            match (va.is_null(), vb.is_null()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) if ascending => va.cmp(vb),
                (false, false) => vb.cmp(va),
            }
        });
        Ok(self.take(&indices))
    }
}

/// Serializes as an array of row objects keyed by column name.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Row<'a>(&'a Table, usize);

        impl Serialize for Row<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.columns.len()))?;
                for column in &self.0.columns {
                    map.serialize_entry(&column.name, &column.values[self.1])?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.num_rows))?;
        for row in 0..self.num_rows {
            seq.serialize_element(&Row(self, row))?;
        }
        seq.end()
    }
}
