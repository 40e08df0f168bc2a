//! Grouped summary statistics.

use traffic_stops_models::columns;
use traffic_stops_table::{Column, Table, Value};

use crate::{AnalyticsError, require_columns};

/// Output column holding each group's median.
pub const MEDIAN: &str = "median";
/// Output column holding each group's mean.
pub const MEAN: &str = "mean";
/// Output column holding each group's mean minus the overall mean.
pub const MEAN_DIFF: &str = "mean_diff";

/// Computes the median and mean of `value_column` per distinct combination
/// of `group_columns`, plus `mean_diff`: the group mean minus the mean over
/// the whole input table.
///
/// `value_column` defaults to `driver_age`. Nulls are skipped; a group with
/// no non-null values gets null statistics. Rows are ordered by group key.
///
/// # Errors
///
/// * [`AnalyticsError::EmptyGroupBy`] if `group_columns` is empty
/// * [`AnalyticsError::UnknownColumn`] if any named column is missing
/// * [`AnalyticsError::NonNumeric`] if a value cell is not a number
pub fn summary_statistics(
    table: &Table,
    group_columns: &[&str],
    value_column: Option<&str>,
) -> Result<Table, AnalyticsError> {
    let value_column = value_column.unwrap_or(columns::DRIVER_AGE);
    if group_columns.is_empty() {
        return Err(AnalyticsError::EmptyGroupBy);
    }
    require_columns(table, group_columns.iter().copied().chain([value_column]))?;

    let values = numeric_values(table.require(value_column)?)?;
    let global_mean = mean(values.iter().flatten().copied());

    let groups = table.group_indices(group_columns)?;
    log::debug!(
        "summary of '{value_column}' over {group_columns:?}: {} groups",
        groups.len()
    );

    let mut keys: Vec<Vec<Value>> = vec![Vec::with_capacity(groups.len()); group_columns.len()];
    let mut medians = Vec::with_capacity(groups.len());
    let mut means = Vec::with_capacity(groups.len());
    let mut diffs = Vec::with_capacity(groups.len());

    for (key, rows) in groups {
        let mut group: Vec<f64> = rows.iter().filter_map(|&row| values[row]).collect();
        let group_mean = mean(group.iter().copied());
        medians.push(Value::from(median(&mut group)));
        means.push(Value::from(group_mean));
        diffs.push(Value::from(
            group_mean.zip(global_mean).map(|(group, global)| group - global),
        ));
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
    out.push(Column::new(MEDIAN, medians));
    out.push(Column::new(MEAN, means));
    out.push(Column::new(MEAN_DIFF, diffs));

    Ok(Table::new(out)?)
}

/// Reads a column as optional numbers, rejecting non-numeric cells.
fn numeric_values(column: &Column) -> Result<Vec<Option<f64>>, AnalyticsError> {
    column
        .values()
        .iter()
        .map(|v| {
            if v.is_null() {
                return Ok(None);
            }
            v.as_f64().map(Some).ok_or_else(|| AnalyticsError::NonNumeric {
                column: column.name().to_owned(),
                value: v.to_string(),
            })
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
