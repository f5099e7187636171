//! Profiling configuration, loaded from TOML.
//!
//! Every field is optional in the file; missing fields take the defaults of
//! [`ProfileConfig::default`]. Example:
//!
//! ```toml
//! time_format = "%d.%m.%Y %H:%M:%S"
//! is_surfacing_animal = false
//! min_time_between_dives = 30.0
//! surface_threshold = 1.5
//!
//! [columns]
//! time = "Date"
//! depth = "Depth (m)"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::detection::{resolve_sensitivity, DetectionOptions, DEFAULT_MIN_TIME_BETWEEN_DIVES};
use crate::error::DivebombError;
use crate::phases::PhaseOptions;
use crate::preprocess::ColumnMapping;

/// Settings for ingesting and profiling one recording.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    pub columns: ColumnMapping,
    /// chrono format string for text time columns
    pub time_format: Option<String>,
    pub delimiter: char,
    pub is_surfacing_animal: bool,
    /// Peak threshold override in `[0, 1]`
    pub sensitivity: Option<f64>,
    /// Seconds
    pub min_time_between_dives: f64,
    /// Meters
    pub surface_threshold: f64,
    pub suppress_warnings: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            time_format: None,
            delimiter: ',',
            is_surfacing_animal: true,
            sensitivity: None,
            min_time_between_dives: DEFAULT_MIN_TIME_BETWEEN_DIVES,
            surface_threshold: 0.0,
            suppress_warnings: false,
        }
    }
}

impl ProfileConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, DivebombError> {
        let config: ProfileConfig = toml::from_str(content)
            .map_err(|e| DivebombError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DivebombError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), DivebombError> {
        if self.columns.time.trim().is_empty() || self.columns.depth.trim().is_empty() {
            return Err(DivebombError::InvalidConfig(
                "column names must not be empty".to_string(),
            ));
        }
        if self.delimiter == '"' || self.delimiter == '\n' || self.delimiter == '\r' {
            return Err(DivebombError::InvalidConfig(format!(
                "unusable delimiter {:?}",
                self.delimiter
            )));
        }
        self.detection_options().validate()
    }

    /// Peak threshold actually used for dive start detection.
    pub fn resolve_sensitivity(&self) -> Result<f64, DivebombError> {
        resolve_sensitivity(self.is_surfacing_animal, self.sensitivity)
    }

    pub fn detection_options(&self) -> DetectionOptions {
        DetectionOptions {
            is_surfacing_animal: self.is_surfacing_animal,
            sensitivity: self.sensitivity,
            min_time_between_dives: self.min_time_between_dives,
            surface_threshold: self.surface_threshold,
        }
    }

    pub fn phase_options(&self) -> PhaseOptions {
        PhaseOptions {
            surface_threshold: self.surface_threshold,
            suppress_warnings: self.suppress_warnings,
        }
    }
}
