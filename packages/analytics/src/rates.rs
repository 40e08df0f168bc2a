//! Group-normalized outcome rates.

use std::collections::{BTreeMap, BTreeSet};

use traffic_stops_table::{Column, Table, Value};

use crate::{AnalyticsError, require_columns};

/// For each combination of `group_columns`, computes the share of rows that
/// fall into each distinct value of `outcome_column`.
///
/// The result has the group columns followed by one column per observed
/// outcome value, named by the value's text form and ordered by value.
/// A group that never shows an outcome reports `0.0` for it. Rows with a
/// missing outcome count toward their group's total but toward no outcome
/// column; rows with a missing group key are excluded.
///
/// # Errors
///
/// * [`AnalyticsError::EmptyGroupBy`] if `group_columns` is empty
/// * [`AnalyticsError::UnknownColumn`] if any named column is missing
pub fn outcome_rates(
    table: &Table,
    group_columns: &[&str],
    outcome_column: &str,
) -> Result<Table, AnalyticsError> {
    if group_columns.is_empty() {
        return Err(AnalyticsError::EmptyGroupBy);
    }
    require_columns(table, group_columns.iter().copied().chain([outcome_column]))?;

    let outcomes = table.require(outcome_column)?.values();
    let groups = table.group_indices(group_columns)?;

    let observed: BTreeSet<&Value> = groups
        .values()
        .flatten()
        .map(|&row| &outcomes[row])
        .filter(|v| !v.is_null())
        .collect();

    log::debug!(
        "rates of '{outcome_column}' over {group_columns:?}: {} groups x {} outcomes",
        groups.len(),
        observed.len()
    );

    let mut keys: Vec<Vec<Value>> = vec![Vec::with_capacity(groups.len()); group_columns.len()];
    let mut rates: BTreeMap<&Value, Vec<Value>> = observed
        .iter()
        .map(|&outcome| (outcome, Vec::with_capacity(groups.len())))
        .collect();

    for (key, rows) in groups {
        let mut counts: BTreeMap<&Value, usize> = BTreeMap::new();
        for &row in &rows {
            if !outcomes[row].is_null() {
                *counts.entry(&outcomes[row]).or_default() += 1;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let total = rows.len() as f64;
        for (outcome, column) in &mut rates {
            #[allow(clippy::cast_precision_loss)]
            let count = counts.get(outcome).copied().unwrap_or(0) as f64;
            column.push(Value::Float(count / total));
        }
        for (slot, value) in keys.iter_mut().zip(key) {
            slot.push(value);
        }
    }

    let mut out: Vec<Column> = group_columns
        .iter()
        .zip(keys)
        .map(|(name, values)| {
            let categorical = table.column(name).is_some_and(Column::is_categorical);
            Column::new(*name, values).with_categorical(categorical)
        })
        .collect();
    out.extend(
        rates
            .into_iter()
            .map(|(outcome, values)| Column::new(outcome.to_string(), values)),
    );

    Ok(Table::new(out)?)
}
