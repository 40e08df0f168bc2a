//! Searches table loading.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use traffic_stops_table::Table;

use crate::{FillValues, IngestError};

/// Loads the searches table at `path` and fills missing values.
///
/// `fill` defaults to [`FillValues::default`] when `None`. Returns
/// `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or is not valid CSV.
pub fn load_searches(
    path: impl AsRef<Path>,
    fill: Option<&FillValues>,
) -> Result<Option<Table>, IngestError> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!("Searches file not found: {}", path.display());
        return Ok(None);
    }

    let table = read_searches(BufReader::new(File::open(path)?), fill)?;
    log::info!(
        "Loaded {} search records from {}",
        table.num_rows(),
        path.display()
    );
    Ok(Some(table))
}

/// Parses a searches table from any reader with inferred column types and
/// fills missing values.
///
/// # Errors
///
/// Returns [`IngestError::Table`] if the input is not valid CSV.
pub fn read_searches<R: Read>(reader: R, fill: Option<&FillValues>) -> Result<Table, IngestError> {
    let table = Table::read_csv(reader, &[])?;
    match fill {
        Some(fill) => fill_missing(table, fill),
        None => fill_missing(table, &FillValues::default()),
    }
}

/// Replaces nulls in every column named by `fill`. Columns the policy does
/// not name keep their nulls; policy entries for absent columns are
/// skipped.
///
/// # Errors
///
/// Returns [`IngestError::Table`] if the table cannot be rebuilt.
pub fn fill_missing(mut table: Table, fill: &FillValues) -> Result<Table, IngestError> {
    for (name, value) in fill.iter() {
        let Some(column) = table.column(name) else {
            log::debug!("fill_missing: no '{name}' column, skipping");
            continue;
        };
        let nulls = column.null_count();
        if nulls == 0 {
            continue;
        }
        log::debug!("fill_missing: {nulls} missing '{name}' values -> {value}");
        let filled = column.fill_null(value);
        table = table.with_column(filled)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use traffic_stops_table::Value;

    use super::*;

    const SEARCHES: &str = "\
stop_id,search_type,search_conducted,drugs_related_stop,search_basis
1,Probable Cause,True,True,Odor
2,,False,,
3,Vehicle Inventory,,False,
";

    fn column(table: &Table, name: &str) -> Vec<Value> {
        table.column(name).unwrap().values().to_vec()
    }

    #[test]
    fn default_policy_fills_drugs_and_basis_only() {
        let table = read_searches(SEARCHES.as_bytes(), None).unwrap();
        assert_eq!(
            column(&table, "drugs_related_stop"),
            vec![Value::Bool(true), Value::Bool(false), Value::Bool(false)]
        );
        assert_eq!(
            column(&table, "search_basis"),
            vec![
                Value::from("Odor"),
                Value::from("UNKNOWN"),
                Value::from("UNKNOWN")
            ]
        );
        assert!(column(&table, "search_type")[1].is_null());
        assert!(column(&table, "search_conducted")[2].is_null());
    }

    #[test]
    fn custom_policy_replaces_default() {
        let fill = FillValues::none().with("search_type", "NONE");
        let table = read_searches(SEARCHES.as_bytes(), Some(&fill)).unwrap();
        assert_eq!(column(&table, "search_type")[1], Value::from("NONE"));
        assert!(column(&table, "drugs_related_stop")[1].is_null());
        assert!(column(&table, "search_basis")[2].is_null());
    }

    #[test]
    fn policy_for_absent_column_is_skipped() {
        let fill = FillValues::none().with("contraband_found", false);
        let table = read_searches(SEARCHES.as_bytes(), Some(&fill)).unwrap();
        assert!(!table.has_column("contraband_found"));
    }

    #[test]
    fn missing_file_is_none() {
        let result = load_searches("/nonexistent/traffic/searches.csv", None).unwrap();
        assert!(result.is_none());
    }
}
