pub mod config;
pub mod detection;
pub mod error;
pub mod export;
pub mod ffi;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod peaks;
pub mod phases;
pub mod preprocess;
pub mod profile;

uniffi::setup_scaffolding!();

pub use config::ProfileConfig;
pub use detection::{detect_dives, resolve_sensitivity, DetectionOptions};
pub use error::{DivebombError, InsufficientData};
pub use export::{AttributeTable, DiveClusterer, DiveExport, PhaseSegments};
pub use models::{DiveShape, Episode, Recording, Sample, Skew, TIME_UNITS};
pub use peaks::find_peaks;
pub use phases::{analyze_dive, DivePhaseRecord, DivePhases, PhaseOptions};
pub use preprocess::{normalize, read_delimited, ColumnMapping, RawTable};
pub use profile::{profile_dives, profile_dives_parallel, profile_table, ProfiledDive};
