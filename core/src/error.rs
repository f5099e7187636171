use thiserror::Error;

/// Error type for recording ingestion, configuration and collaborator hand-off.
///
/// Every variant is fatal for the call that produced it. Data-driven failures
/// of the phase analysis are not errors; see [`InsufficientData`].
#[derive(Error, Debug, Clone, PartialEq, uniffi::Error)]
#[uniffi(flat_error)]
pub enum DivebombError {
    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("invalid sensitivity {0}: expected a value between 0 and 1")]
    InvalidSensitivity(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid timestamp '{value}' at row {row}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("invalid value '{value}' in column {column} at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("io error: {0}")]
    Io(String),

    #[error("collaborator error: {0}")]
    Collaborator(String),
}

impl From<std::io::Error> for DivebombError {
    fn from(err: std::io::Error) -> Self {
        DivebombError::Io(err.to_string())
    }
}

/// Reason a dive episode could not be split into phases.
///
/// Recorded on the [`crate::phases::DivePhaseRecord`] instead of being raised.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsufficientData {
    #[error("episode contains no samples")]
    EmptyEpisode,

    #[error("episode never went below the surface threshold")]
    NeverSubmerged,

    #[error("no descent changepoint found")]
    DescentNotFound,

    #[error("no sample returned to the surface threshold")]
    SurfaceBoundaryNotFound,

    #[error("no ascent changepoint found")]
    AscentNotFound,
}

impl InsufficientData {
    /// Whether this is an expected surface event rather than a data problem.
    pub fn is_surface_event(&self) -> bool {
        matches!(self, InsufficientData::NeverSubmerged)
    }
}
