//! Delimited-text loading and writing.
//!
//! Columns listed in a [`Schema`] are parsed strictly with their declared
//! [`ColumnType`]; a cell that does not fit is a [`TableError::Parse`].
//! Every other column is type-inferred from all of its non-null cells.
//! Text cells are kept verbatim; other types ignore surrounding spaces.

use std::io::{Read, Write};

use strum_macros::Display;

use crate::value::{is_null_token, parse_bool, parse_date};
use crate::{Column, Table, TableError, Value};

/// Storage type of a parsed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Date,
    Text,
}

impl ColumnType {
    /// Parses a non-null cell. Returns `None` if the text does not fit.
    /// Surrounding whitespace is ignored for every type except text, which
    /// is kept verbatim.
    fn parse(self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            Self::Int => trimmed.parse::<i64>().ok().map(Value::Int),
            Self::Float => trimmed.parse::<f64>().ok().map(Value::Float),
            Self::Bool => parse_bool(trimmed).map(Value::Bool),
            Self::Date => parse_date(trimmed).map(Value::Date),
            Self::Text => Some(Value::Str(raw.to_owned())),
        }
    }

    /// Picks the narrowest type that fits every non-null cell.
    fn infer<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> Self {
        [Self::Int, Self::Float, Self::Bool]
            .into_iter()
            .find(|kind| cells.clone().all(|raw| kind.parse(raw).is_some()))
            .unwrap_or(Self::Text)
    }
}

/// Declared type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub kind: ColumnType,
    /// Whether missing cells are allowed.
    pub nullable: bool,
}

impl ColumnSpec {
    #[must_use]
    pub const fn nullable(kind: ColumnType) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }

    #[must_use]
    pub const fn required(kind: ColumnType) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }
}

/// Column name to declared type. Columns not listed are inferred.
pub type Schema<'a> = &'a [(&'a str, ColumnSpec)];

/// Reads a comma-delimited table with a header row.
///
/// # Errors
///
/// * [`TableError::Csv`] if the input is not valid CSV
/// * [`TableError::Parse`] if a cell does not fit its declared type
/// * [`TableError::MissingValue`] if a non-nullable column has a missing cell
/// * [`TableError::DuplicateColumn`] if the header repeats a name
pub fn read_csv<R: Read>(reader: R, schema: Schema<'_>) -> Result<Table, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    // Raw cells per column, `None` for null tokens, plus the source line of
    // each row for error messages.
    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    let mut lines: Vec<u64> = Vec::new();

    for result in reader.records() {
        let record = result?;
        lines.push(record.position().map_or(0, csv::Position::line));
        for (i, cells) in raw.iter_mut().enumerate() {
            let cell = record.get(i).unwrap_or("");
            cells.push((!is_null_token(cell.trim())).then(|| cell.to_owned()));
        }
    }

    let mut columns = Vec::with_capacity(headers.len());
    for (name, cells) in headers.into_iter().zip(raw) {
        let spec = schema
            .iter()
            .find(|(col, _)| *col == name)
            .map_or_else(
                || ColumnSpec::nullable(ColumnType::infer(cells.iter().flatten().map(String::as_str))),
                |(_, spec)| *spec,
            );
        let values = parse_cells(&name, spec, &cells, &lines)?;
        log::trace!("read_csv: column '{name}' as {}", spec.kind);
        columns.push(Column::new(name, values));
    }

    let table = Table::new(columns)?;
    log::debug!(
        "read_csv: {} rows x {} columns",
        table.num_rows(),
        table.num_columns()
    );
    Ok(table)
}

fn parse_cells(
    name: &str,
    spec: ColumnSpec,
    cells: &[Option<String>],
    lines: &[u64],
) -> Result<Vec<Value>, TableError> {
    cells
        .iter()
        .zip(lines)
        .map(|(cell, &line)| match cell {
            None if spec.nullable => Ok(Value::Null),
            None => Err(TableError::MissingValue {
                column: name.to_owned(),
                line,
            }),
            Some(raw) => spec.kind.parse(raw).ok_or_else(|| TableError::Parse {
                column: name.to_owned(),
                line,
                value: raw.clone(),
                expected: spec.kind,
            }),
        })
        .collect()
}

/// Writes the table as comma-delimited text with a header row. Nulls are
/// written as empty cells.
///
/// # Errors
///
/// Returns [`TableError`] if writing fails.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<(), TableError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(table.column_names())?;
    for row in 0..table.num_rows() {
        writer.write_record(table.columns().iter().map(|c| c.values()[row].to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const SEARCHES: &str = "\
stop_id,search_type,search_conducted,drugs_related_stop,score
1,Probable Cause,True,False,1
2,,False,,2.5
3,Vehicle Inventory,,True,3
";

    #[test]
    fn infers_column_types() {
        let table = read_csv(SEARCHES.as_bytes(), &[]).unwrap();
        assert_eq!(table.num_rows(), 3);
        let ids = table.column("stop_id").unwrap();
        assert_eq!(ids.values()[2], Value::Int(3));
        let conducted = table.column("search_conducted").unwrap();
        assert_eq!(conducted.values()[0], Value::Bool(true));
        assert!(conducted.values()[2].is_null());
        let score = table.column("score").unwrap();
        assert!(matches!(score.values()[0], Value::Float(_)));
        let kind = table.column("search_type").unwrap();
        assert_eq!(kind.values()[2], Value::from("Vehicle Inventory"));
        assert!(kind.values()[1].is_null());
    }

    #[test]
    fn mixed_column_falls_back_to_text() {
        let table = read_csv("a\n1\nx\n".as_bytes(), &[]).unwrap();
        assert_eq!(table.column("a").unwrap().values()[0], Value::from("1"));
    }

    #[test]
    fn text_keeps_whitespace_but_numbers_ignore_it() {
        let table = read_csv("driver_race,driver_age\nWhite, 30\n White,41 \n  ,NA\n".as_bytes(), &[])
            .unwrap();
        assert_eq!(
            table.column("driver_race").unwrap().values(),
            &[Value::from("White"), Value::from(" White"), Value::Null]
        );
        assert_eq!(
            table.column("driver_age").unwrap().values(),
            &[Value::Int(30), Value::Int(41), Value::Null]
        );
    }

    #[test]
    fn declared_types_are_strict() {
        let schema = [("stop_id", ColumnSpec::required(ColumnType::Int))];
        let err = read_csv("stop_id\n1\n2.5\n".as_bytes(), &schema).unwrap_err();
        match err {
            TableError::Parse {
                column,
                line,
                value,
                expected,
            } => {
                assert_eq!(column, "stop_id");
                assert_eq!(line, 3);
                assert_eq!(value, "2.5");
                assert_eq!(expected, ColumnType::Int);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn required_column_rejects_missing_cell() {
        let schema = [("is_arrested", ColumnSpec::required(ColumnType::Bool))];
        let err = read_csv("is_arrested\nTrue\nNA\n".as_bytes(), &schema).unwrap_err();
        assert!(matches!(err, TableError::MissingValue { line: 3, .. }));
    }

    #[test]
    fn parses_declared_dates() {
        let schema = [("stop_date", ColumnSpec::nullable(ColumnType::Date))];
        let table = read_csv("stop_date\n2005-01-02\nNA\n".as_bytes(), &schema).unwrap();
        assert_eq!(
            table.column("stop_date").unwrap().values()[0],
            Value::Date(NaiveDate::from_ymd_opt(2005, 1, 2).unwrap())
        );
        assert!(table.column("stop_date").unwrap().values()[1].is_null());
    }

    #[test]
    fn writes_nulls_as_empty_cells() {
        let table = read_csv(SEARCHES.as_bytes(), &[]).unwrap();
        let mut out = Vec::new();
        write_csv(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("stop_id,search_type,search_conducted,drugs_related_stop,score")
        );
        assert_eq!(lines.next(), Some("1,Probable Cause,true,false,1"));
        assert_eq!(lines.next(), Some("2,,false,,2.5"));
    }
}
