//! Stops table loading and enrichment.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::Datelike as _;
use traffic_stops_models::{
    AgeCategory, CATEGORICAL_COLUMNS, Season, UNKNOWN_OFFICER, columns, is_success_outcome,
};
use traffic_stops_table::{ColumnSpec, ColumnType, Table, Value};

use crate::IngestError;

/// Fixed type contract for the raw stops columns.
pub const STOPS_SCHEMA: &[(&str, ColumnSpec)] = &[
    (columns::STOP_ID, ColumnSpec::required(ColumnType::Int)),
    (columns::STOP_DATE, ColumnSpec::nullable(ColumnType::Date)),
    (columns::OFFICER_ID, ColumnSpec::nullable(ColumnType::Text)),
    (columns::DRIVER_GENDER, ColumnSpec::nullable(ColumnType::Text)),
    (columns::DRIVER_AGE, ColumnSpec::nullable(ColumnType::Float)),
    (columns::DRIVER_RACE, ColumnSpec::nullable(ColumnType::Text)),
    (columns::VIOLATION, ColumnSpec::nullable(ColumnType::Text)),
    (columns::IS_ARRESTED, ColumnSpec::required(ColumnType::Bool)),
    (columns::STOP_OUTCOME, ColumnSpec::nullable(ColumnType::Text)),
];

/// Loads and normalizes the stops table at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// * [`IngestError::MissingColumn`] if a contract column is absent
/// * [`IngestError::Table`] if a typed field fails to parse
/// * [`IngestError::Io`] if the file cannot be opened
pub fn load_stops(path: impl AsRef<Path>) -> Result<Option<Table>, IngestError> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!("Stops file not found: {}", path.display());
        return Ok(None);
    }

    let table = read_stops(BufReader::new(File::open(path)?))?;
    log::info!(
        "Loaded {} stops from {}",
        table.num_rows(),
        path.display()
    );
    Ok(Some(table))
}

/// Parses and normalizes a stops table from any reader.
///
/// # Errors
///
/// Same as [`load_stops`], minus the existence check.
pub fn read_stops<R: Read>(reader: R) -> Result<Table, IngestError> {
    let raw = Table::read_csv(reader, STOPS_SCHEMA)?;
    for (column, _) in STOPS_SCHEMA {
        if !raw.has_column(column) {
            return Err(IngestError::MissingColumn {
                column: (*column).to_owned(),
            });
        }
    }
    normalize_stops(raw)
}

/// Derives the calendar, age, and outcome columns, fills missing officer
/// ids, and flags the categorical columns.
///
/// # Errors
///
/// Returns [`IngestError::Table`] if a required column is missing.
pub fn normalize_stops(table: Table) -> Result<Table, IngestError> {
    warn_on_duplicate_ids(&table)?;

    let dates = table.require(columns::STOP_DATE)?;
    let year = dates.map(|v| v.as_date().map(|d| i64::from(d.year())).into());
    let month = dates.map(|v| v.as_date().map(|d| i64::from(d.month())).into());
    let season = dates.map(|v| {
        v.as_date()
            .and_then(|d| Season::from_month(d.month()))
            .map(|s| s.to_string())
            .into()
    });

    let age_category = table
        .require(columns::DRIVER_AGE)?
        .map(|v| {
            v.as_f64()
                .and_then(AgeCategory::from_age)
                .map(|c| c.to_string())
                .into()
        });

    let arrest_or_citation = table
        .require(columns::STOP_OUTCOME)?
        .map(|v| Value::Bool(v.as_str().is_some_and(is_success_outcome)));

    let officer = table
        .require(columns::OFFICER_ID)?
        .fill_null(&Value::from(UNKNOWN_OFFICER));

    let mut table = table
        .with_column(year.renamed(columns::STOP_YEAR))?
        .with_column(month.renamed(columns::STOP_MONTH))?
        .with_column(season.renamed(columns::STOP_SEASON))?
        .with_column(age_category.renamed(columns::AGE_CATEGORY))?
        .with_column(arrest_or_citation.renamed(columns::ARREST_OR_CITATION))?
        .with_column(officer)?;

    for name in CATEGORICAL_COLUMNS {
        let column = table.require(name)?.clone().with_categorical(true);
        table = table.with_column(column)?;
    }

    Ok(table)
}

fn warn_on_duplicate_ids(table: &Table) -> Result<(), IngestError> {
    let ids = table.require(columns::STOP_ID)?.values();
    let unique: BTreeSet<&Value> = ids.iter().collect();
    if unique.len() != ids.len() {
        log::warn!(
            "{} duplicate {} values; joins will fan out",
            ids.len() - unique.len(),
            columns::STOP_ID
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use traffic_stops_table::TableError;

    use super::*;

    const HEADER: &str = "stop_id,stop_date,officer_id,driver_gender,driver_age,driver_race,violation,is_arrested,stop_outcome\n";

    fn stops(rows: &str) -> Table {
        read_stops(format!("{HEADER}{rows}").as_bytes()).unwrap()
    }

    fn column(table: &Table, name: &str) -> Vec<Value> {
        table.column(name).unwrap().values().to_vec()
    }

    #[test]
    fn derives_calendar_columns() {
        let table = stops(
            "\
1,2005-01-02,A1,M,20,White,Speeding,False,Citation
2,2005-06-15,A1,F,21,Black,Equipment,False,Warning
3,2005-09-30,A2,M,36,Hispanic,Speeding,True,Arrest
",
        );
        assert_eq!(column(&table, "stop_year")[0], Value::Int(2005));
        assert_eq!(
            column(&table, "stop_month"),
            vec![Value::Int(1), Value::Int(6), Value::Int(9)]
        );
        assert_eq!(
            column(&table, "stop_season"),
            vec![
                Value::from("winter"),
                Value::from("summer"),
                Value::from("fall")
            ]
        );
    }

    #[test]
    fn bins_ages_and_keeps_missing_ages_null() {
        let table = stops(
            "\
1,2005-01-02,A1,M,0,White,Speeding,False,Citation
2,2005-01-02,A1,M,21,White,Speeding,False,Citation
3,2005-01-02,A1,M,36,White,Speeding,False,Citation
4,2005-01-02,A1,M,100,White,Speeding,False,Citation
5,2005-01-02,A1,M,,White,Speeding,False,Citation
6,2005-01-02,A1,M,101,White,Speeding,False,Citation
",
        );
        let categories = column(&table, "age_category");
        assert_eq!(categories[0], Value::from("juvenile"));
        assert_eq!(categories[1], Value::from("young_adult"));
        assert_eq!(categories[2], Value::from("adult"));
        assert_eq!(categories[3], Value::from("senior"));
        assert!(categories[4].is_null());
        assert!(categories[5].is_null());
        assert!(column(&table, "driver_age")[4].is_null());
    }

    #[test]
    fn flags_arrest_or_citation() {
        let table = stops(
            "\
1,2005-01-02,A1,M,30,White,Speeding,False,Citation
2,2005-01-02,A1,M,30,White,Speeding,True,Arrest
3,2005-01-02,A1,M,30,White,Speeding,False,Warning
4,2005-01-02,A1,M,30,White,Speeding,False,
5,2005-01-02,A1,M,30,White,Speeding,False,Summons
",
        );
        assert_eq!(
            column(&table, "arrest_or_citation"),
            vec![
                Value::Bool(true),
                Value::Bool(true),
                Value::Bool(false),
                Value::Bool(false),
                Value::Bool(false)
            ]
        );
    }

    #[test]
    fn fills_missing_officer_and_marks_categoricals() {
        let table = stops("1,2005-01-02,,M,30,Asian,Speeding,False,Citation\n");
        assert_eq!(column(&table, "officer_id")[0], Value::from("UNKNOWN"));
        for name in CATEGORICAL_COLUMNS {
            assert!(table.column(name).unwrap().is_categorical(), "{name}");
        }
        assert!(!table.column("officer_id").unwrap().is_categorical());
        // unseen category labels pass through
        assert_eq!(column(&table, "driver_race")[0], Value::from("Asian"));
    }

    #[test]
    fn missing_date_yields_null_derivations() {
        let table = stops("1,,A1,M,30,White,Speeding,False,Citation\n");
        assert!(column(&table, "stop_year")[0].is_null());
        assert!(column(&table, "stop_season")[0].is_null());
    }

    #[test]
    fn malformed_typed_fields_are_errors() {
        let bad_age = read_stops(
            format!("{HEADER}1,2005-01-02,A1,M,old,White,Speeding,False,Citation\n").as_bytes(),
        );
        assert!(matches!(
            bad_age,
            Err(IngestError::Table(TableError::Parse { .. }))
        ));

        let bad_date = read_stops(
            format!("{HEADER}1,2005-13-45,A1,M,30,White,Speeding,False,Citation\n").as_bytes(),
        );
        assert!(matches!(
            bad_date,
            Err(IngestError::Table(TableError::Parse { .. }))
        ));

        let fractional_id = read_stops(
            format!("{HEADER}1.5,2005-01-02,A1,M,30,White,Speeding,False,Citation\n").as_bytes(),
        );
        assert!(fractional_id.is_err());

        let missing_arrest = read_stops(
            format!("{HEADER}1,2005-01-02,A1,M,30,White,Speeding,,Citation\n").as_bytes(),
        );
        assert!(matches!(
            missing_arrest,
            Err(IngestError::Table(TableError::MissingValue { .. }))
        ));
    }

    #[test]
    fn missing_contract_column_is_an_error() {
        let result = read_stops("stop_id,stop_date\n1,2005-01-02\n".as_bytes());
        assert!(matches!(result, Err(IngestError::MissingColumn { .. })));
    }

    #[test]
    fn missing_file_is_none() {
        let result = load_stops("/nonexistent/traffic/stops.csv").unwrap();
        assert!(result.is_none());
    }
}
