//! Optional TOML analysis configuration.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use traffic_stops_ingest::FillValues;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Analysis defaults loaded from a config file. Command-line flags take
/// precedence over every field.
///
/// ```toml
/// min_stops = 30
///
/// [fill_values]
/// drugs_related_stop = false
/// search_basis = "UNKNOWN"
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Officer stop threshold for search-share rankings.
    pub min_stops: Option<usize>,
    /// Replaces the default fill policy for the searches table.
    pub fill_values: Option<FillValues>,
}

impl AnalysisConfig {
    /// Reads the config at `path`, or the empty config when `path` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Read`] if the file cannot be read
    /// * [`ConfigError::Parse`] if it is not a valid config
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
