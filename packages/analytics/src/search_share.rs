//! Officer search-share ranking.
//!
//! Joins stops to their search records, keeps officers with enough stops
//! to be meaningful, and ranks groups by how often a search was conducted.

use traffic_stops_models::{DEFAULT_MIN_STOPS, columns, is_searching_type};
use traffic_stops_table::value::parse_bool;
use traffic_stops_table::{Column, Table, Value};

use crate::{AnalyticsError, outcome_rates};

/// Rate column for stops where a search was conducted.
pub const SEARCHED: &str = "true";
/// Rate column for stops without a search.
pub const NOT_SEARCHED: &str = "false";

/// Computes per-group search rates over the stops of officers with at
/// least `min_stops` (default 25) joined rows, sorted ascending by the
/// searched rate.
///
/// The result always has both a `false` and a `true` rate column. If the
/// searches table has no `search_conducted` column, it is derived from
/// `search_type`; otherwise missing values are taken as `false`.
///
/// # Errors
///
/// * [`AnalyticsError::NoQualifyingOfficers`] if no officer meets the
///   threshold
/// * [`AnalyticsError::UnknownColumn`] if a join, officer, search, or group
///   column is missing
/// * [`AnalyticsError::NotBoolean`] if a `search_conducted` cell is not a
///   boolean, number, or boolean literal
pub fn search_share(
    stops: &Table,
    searches: &Table,
    group_columns: &[&str],
    min_stops: Option<usize>,
) -> Result<Table, AnalyticsError> {
    let min_stops = min_stops.unwrap_or(DEFAULT_MIN_STOPS);

    let joined = stops.left_join(searches, columns::STOP_ID)?;
    let joined = with_search_conducted(joined)?;

    let officers = joined.group_indices(&[columns::OFFICER_ID])?;
    let mut retained: Vec<usize> = Vec::new();
    let mut qualifying = 0_usize;
    for (officer, rows) in &officers {
        if rows.len() >= min_stops {
            qualifying += 1;
            retained.extend(rows);
        } else {
            log::debug!(
                "Excluding officer {}: {} stops < {min_stops}",
                officer[0],
                rows.len()
            );
        }
    }
    if qualifying == 0 {
        log::warn!("No officer has at least {min_stops} stops");
        return Err(AnalyticsError::NoQualifyingOfficers { min_stops });
    }
    retained.sort_unstable();
    log::info!(
        "{qualifying} of {} officers have at least {min_stops} stops ({} rows)",
        officers.len(),
        retained.len()
    );

    let rates = outcome_rates(
        &joined.take(&retained),
        group_columns,
        columns::SEARCH_CONDUCTED,
    )?;

    let mut rates = rates;
    for name in [NOT_SEARCHED, SEARCHED] {
        if !rates.has_column(name) {
            let zeros = Column::repeat(name, &Value::Float(0.0), rates.num_rows());
            rates = rates.with_column(zeros)?;
        }
    }

    Ok(rates.sort_by(SEARCHED, true)?)
}

/// Ensures a boolean `search_conducted` column: an existing one is read as
/// flags (`0`/`1` and boolean text included) with nulls set to `false`,
/// otherwise it is derived from `search_type`.
fn with_search_conducted(joined: Table) -> Result<Table, AnalyticsError> {
    let conducted = if let Some(existing) = joined.column(columns::SEARCH_CONDUCTED) {
        let flags = existing
            .values()
            .iter()
            .map(|v| as_flag(v).map(Value::Bool))
            .collect::<Option<Vec<_>>>();
        let Some(flags) = flags else {
            let bad = existing
                .values()
                .iter()
                .find(|v| as_flag(v).is_none())
                .map(ToString::to_string)
                .unwrap_or_default();
            return Err(AnalyticsError::NotBoolean {
                column: columns::SEARCH_CONDUCTED.to_owned(),
                value: bad,
            });
        };
        Column::new(columns::SEARCH_CONDUCTED, flags)
    } else {
        log::debug!(
            "No {} column; deriving from {}",
            columns::SEARCH_CONDUCTED,
            columns::SEARCH_TYPE
        );
        joined
            .require(columns::SEARCH_TYPE)?
            .map(|v| Value::Bool(v.as_str().is_some_and(is_searching_type)))
            .renamed(columns::SEARCH_CONDUCTED)
    };
    Ok(joined.with_column(conducted)?)
}

/// Reads a cell as a search flag. Missing counts as `false`; numbers are
/// `true` when non-zero.
fn as_flag(value: &Value) -> Option<bool> {
    if value.is_null() {
        return Some(false);
    }
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(_) | Value::Float(_) => value.as_f64().map(|x| x != 0.0),
        Value::Str(s) => parse_bool(s),
        Value::Null | Value::Date(_) => None,
    }
}
