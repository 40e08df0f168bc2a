#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loading and normalization of traffic stop and search records.
//!
//! [`load_stops`] applies the fixed stops type contract and derives the
//! calendar, age, and outcome columns. [`load_searches`] reads the searches
//! table with inferred typing and fills missing values from a
//! [`FillValues`] policy. Both return `Ok(None)` when the source file does
//! not exist; malformed data is always an error.

pub mod searches;
pub mod stops;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use traffic_stops_models::{UNKNOWN_SEARCH_BASIS, columns};
use traffic_stops_table::{TableError, Value};

pub use searches::{load_searches, read_searches};
pub use stops::{load_stops, read_stops};

/// Errors that can occur while loading records.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Parsing or table construction failed.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A column required by the stops type contract is absent.
    #[error("Missing required column '{column}'")]
    MissingColumn {
        /// The absent column.
        column: String,
    },

    /// I/O error (file open/read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-column default values substituted for missing search fields.
///
/// A caller-supplied policy replaces [`FillValues::default`] entirely;
/// the two are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FillValues(BTreeMap<String, Value>);

impl FillValues {
    /// An empty policy: no column is filled.
    #[must_use]
    pub const fn none() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds or replaces the default for `column`.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FillValues {
    /// `drugs_related_stop → false`, `search_basis → "UNKNOWN"`.
    fn default() -> Self {
        Self::none()
            .with(columns::DRUGS_RELATED_STOP, false)
            .with(columns::SEARCH_BASIS, UNKNOWN_SEARCH_BASIS)
    }
}

impl From<BTreeMap<String, Value>> for FillValues {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
