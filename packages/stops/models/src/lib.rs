#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Traffic stop taxonomy types and fixed vocabularies.
//!
//! This crate defines the canonical column names, the season and age-bin
//! classifications, and the outcome/search vocabularies shared by the
//! normalizer and the analytics. Everything here is pure data.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Canonical column names for the stops and searches tables.
pub mod columns {
    /// Unique stop identifier; the join key between stops and searches.
    pub const STOP_ID: &str = "stop_id";
    /// Raw stop date.
    pub const STOP_DATE: &str = "stop_date";
    /// Derived calendar year of the stop.
    pub const STOP_YEAR: &str = "stop_year";
    /// Derived calendar month (1-12) of the stop.
    pub const STOP_MONTH: &str = "stop_month";
    /// Derived [`Season`](crate::Season) label.
    pub const STOP_SEASON: &str = "stop_season";
    /// Stop outcome (`Arrest`, `Citation`, `Warning`, ...).
    pub const STOP_OUTCOME: &str = "stop_outcome";
    pub const OFFICER_ID: &str = "officer_id";
    pub const DRIVER_AGE: &str = "driver_age";
    pub const DRIVER_RACE: &str = "driver_race";
    pub const DRIVER_GENDER: &str = "driver_gender";
    pub const VIOLATION: &str = "violation";
    pub const IS_ARRESTED: &str = "is_arrested";
    /// Derived [`AgeCategory`](crate::AgeCategory) label.
    pub const AGE_CATEGORY: &str = "age_category";
    /// Derived flag: outcome was an arrest or a citation.
    pub const ARREST_OR_CITATION: &str = "arrest_or_citation";
    pub const SEARCH_TYPE: &str = "search_type";
    pub const SEARCH_CONDUCTED: &str = "search_conducted";
    pub const DRUGS_RELATED_STOP: &str = "drugs_related_stop";
    pub const SEARCH_BASIS: &str = "search_basis";
}

/// Officer identifier substituted for missing values.
pub const UNKNOWN_OFFICER: &str = "UNKNOWN";

/// Default fill value for a missing search basis.
pub const UNKNOWN_SEARCH_BASIS: &str = "UNKNOWN";

/// Default minimum number of stops an officer needs to be ranked.
pub const DEFAULT_MIN_STOPS: usize = 25;

/// Outcomes counted as a "successful" stop.
pub const SUCCESS_OUTCOMES: &[&str] = &["Arrest", "Citation"];

/// Search types that imply a search was actually conducted.
pub const SEARCHING_TYPES: &[&str] = &["Probable Cause", "Incident to Arrest"];

/// Columns flagged as categorical after normalization.
pub const CATEGORICAL_COLUMNS: &[&str] = &[
    columns::AGE_CATEGORY,
    columns::DRIVER_GENDER,
    columns::DRIVER_RACE,
    columns::STOP_SEASON,
    columns::STOP_OUTCOME,
    columns::VIOLATION,
];

/// Edges of the driver age bins. Every bin is `[lower, upper)` except the
/// last, which also includes its upper edge.
pub const AGE_BIN_EDGES: [f64; 6] = [0.0, 21.0, 36.0, 50.0, 65.0, 100.0];

/// Returns `true` if the outcome counts as an arrest or citation.
#[must_use]
pub fn is_success_outcome(outcome: &str) -> bool {
    SUCCESS_OUTCOMES.contains(&outcome)
}

/// Returns `true` if the search type implies a search was conducted.
#[must_use]
pub fn is_searching_type(search_type: &str) -> bool {
    SEARCHING_TYPES.contains(&search_type)
}

/// Meteorological season of a stop.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Season {
    /// December, January, February
    Winter,
    /// March, April, May
    Spring,
    /// June, July, August
    Summer,
    /// September, October, November
    Fall,
}

impl Season {
    /// Returns the calendar months (1-12) belonging to this season.
    #[must_use]
    pub const fn months(self) -> [u32; 3] {
        match self {
            Self::Winter => [12, 1, 2],
            Self::Spring => [3, 4, 5],
            Self::Summer => [6, 7, 8],
            Self::Fall => [9, 10, 11],
        }
    }

    /// Maps a calendar month to its season. Returns `None` for anything
    /// outside 1-12.
    #[must_use]
    pub const fn from_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Self::Winter),
            3..=5 => Some(Self::Spring),
            6..=8 => Some(Self::Summer),
            9..=11 => Some(Self::Fall),
            _ => None,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Winter, Self::Spring, Self::Summer, Self::Fall]
    }
}

/// Driver age bracket.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgeCategory {
    /// `[0, 21)`
    Juvenile,
    /// `[21, 36)`
    YoungAdult,
    /// `[36, 50)`
    Adult,
    /// `[50, 65)`
    MiddleAged,
    /// `[65, 100]`
    Senior,
}

impl AgeCategory {
    /// Bins a driver age. Ages outside `[0, 100]` (and NaN) have no
    /// category.
    #[must_use]
    pub fn from_age(age: f64) -> Option<Self> {
        let last = AGE_BIN_EDGES[AGE_BIN_EDGES.len() - 1];
        if age.is_nan() || age < AGE_BIN_EDGES[0] || age > last {
            return None;
        }
        if age >= AGE_BIN_EDGES[4] {
            return Some(Self::Senior);
        }
        AGE_BIN_EDGES
            .windows(2)
            .position(|edges| age >= edges[0] && age < edges[1])
            .map(|idx| Self::all()[idx])
    }

    /// Returns all variants of this enum, youngest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Juvenile,
            Self::YoungAdult,
            Self::Adult,
            Self::MiddleAged,
            Self::Senior,
        ]
    }
}
