#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytical operations over normalized traffic stop tables.
//!
//! Each public function takes one or more tables and returns a new table.
//! Requests that cannot be answered from the given data (unknown columns,
//! an empty group-by, no officer above the stop threshold) return an
//! [`AnalyticsError`] for which [`AnalyticsError::is_absent`] is `true`;
//! callers can adjust their request and try again. Anything else is a
//! data error.

pub mod filter;
pub mod rates;
pub mod search_share;
pub mod summary;

use thiserror::Error;
use traffic_stops_table::TableError;

pub use filter::{RangeFilter, ValueFilter, apply_range_filter, apply_value_filter};
pub use rates::outcome_rates;
pub use search_share::search_share;
pub use summary::summary_statistics;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A requested column does not exist in the table.
    #[error("Unknown column: {column}")]
    UnknownColumn {
        /// The missing column.
        column: String,
    },

    /// A grouped computation was requested with no group columns.
    #[error("At least one group column is required")]
    EmptyGroupBy,

    /// No officer has enough stops to be ranked.
    #[error("No officer has at least {min_stops} stops")]
    NoQualifyingOfficers {
        /// The threshold that was applied.
        min_stops: usize,
    },

    /// A value aggregated as a number is not numeric.
    #[error("Non-numeric value '{value}' in column '{column}'")]
    NonNumeric {
        /// The aggregated column.
        column: String,
        /// The offending cell, as text.
        value: String,
    },

    /// A flag column holds a value that cannot be read as true/false.
    #[error("Value '{value}' in column '{column}' is not a boolean")]
    NotBoolean {
        /// The flag column.
        column: String,
        /// The offending cell, as text.
        value: String,
    },

    /// Table construction failed.
    #[error(transparent)]
    Table(TableError),
}

impl AnalyticsError {
    /// Returns `true` for expected "no result" outcomes, as opposed to
    /// malformed data.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(
            self,
            Self::UnknownColumn { .. } | Self::EmptyGroupBy | Self::NoQualifyingOfficers { .. }
        )
    }
}

impl From<TableError> for AnalyticsError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::UnknownColumn { name } => Self::UnknownColumn { column: name },
            other => Self::Table(other),
        }
    }
}

/// Checks that every column in `names` exists.
fn require_columns<'a>(
    table: &traffic_stops_table::Table,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), AnalyticsError> {
    for name in names {
        if !table.has_column(name) {
            log::debug!("Rejecting request: unknown column '{name}'");
            return Err(AnalyticsError::UnknownColumn {
                column: name.to_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_column_table_error_is_absent() {
        let err = AnalyticsError::from(TableError::UnknownColumn {
            name: "x".to_owned(),
        });
        assert!(err.is_absent());
        assert_eq!(err.to_string(), "Unknown column: x");
    }

    #[test]
    fn data_errors_are_not_absent() {
        let err = AnalyticsError::NonNumeric {
            column: "driver_race".to_owned(),
            value: "White".to_owned(),
        };
        assert!(!err.is_absent());
        let err = AnalyticsError::from(TableError::DuplicateColumn {
            name: "true".to_owned(),
        });
        assert!(!err.is_absent());
    }
}
