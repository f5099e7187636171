//! Hand-off structures for downstream collaborators.
//!
//! Plotting consumes [`PhaseSegments`], archival export consumes
//! [`DiveExport`], clustering consumes an [`AttributeTable`] through the
//! [`DiveClusterer`] trait. None of them are implemented here.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{DivebombError, InsufficientData};
use crate::models::{Recording, Sample, TIME_UNITS};
use crate::phases::{DivePhaseRecord, FLAT_FIELD_NAMES};
use crate::profile::ProfiledDive;

// ============================================================================
// Plotting
// ============================================================================

/// The four phase-labelled sub-series of a dive.
///
/// Neighbouring phases share their boundary sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSegments {
    pub descent: Vec<Sample>,
    pub bottom: Vec<Sample>,
    pub ascent: Vec<Sample>,
    pub surface: Vec<Sample>,
}

impl PhaseSegments {
    /// Split an episode's samples at the record's changepoint times.
    ///
    /// `None` when the record has no phases.
    pub fn split(samples: &[Sample], record: &DivePhaseRecord) -> Option<Self> {
        let phases = record.phases()?;
        let bottom_start = phases.bottom_start;
        let bottom_end = phases.bottom_end();
        let surface_start = phases.dive_end - phases.surface_duration;

        let select = |keep: &dyn Fn(f64) -> bool| -> Vec<Sample> {
            samples.iter().filter(|s| keep(s.time)).copied().collect()
        };

        Some(Self {
            descent: select(&|t| t <= bottom_start),
            bottom: select(&|t| t >= bottom_start && t <= bottom_end),
            ascent: select(&|t| t >= bottom_end && t <= surface_start),
            surface: select(&|t| t >= surface_start),
        })
    }
}

// ============================================================================
// Archival export
// ============================================================================

/// Everything an archive writer needs for one dive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiveExport {
    /// 1-based, in episode order
    pub dive_id: usize,
    pub is_surface_event: bool,
    pub insufficient_reason: Option<InsufficientData>,
    pub time_units: &'static str,
    pub attributes: BTreeMap<String, Option<f64>>,
    pub time: Vec<f64>,
    pub depth: Vec<f64>,
}

impl DiveExport {
    /// Bundle the record of the `index`-th (0-based) dive with its raw series.
    ///
    /// The series covers `[dive_start, dive_end]`, or the whole episode when
    /// the dive has no phases.
    pub fn new(index: usize, dive: &ProfiledDive, recording: &Recording) -> Self {
        let series = match dive.record.phases() {
            Some(phases) => recording.time_window(dive.record.dive_start, phases.dive_end),
            None => recording.episode_samples(&dive.episode),
        };

        Self {
            dive_id: index + 1,
            is_surface_event: dive.record.is_surface_event(),
            insufficient_reason: dive.record.insufficiency(),
            time_units: TIME_UNITS,
            attributes: dive.record.to_flat_map(),
            time: series.iter().map(|s| s.time).collect(),
            depth: series.iter().map(|s| s.depth).collect(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("dive_{:05}.json", self.dive_id)
    }
}

pub fn export_dives(recording: &Recording, dives: &[ProfiledDive]) -> Vec<DiveExport> {
    dives
        .iter()
        .enumerate()
        .map(|(index, dive)| DiveExport::new(index, dive, recording))
        .collect()
}

// ============================================================================
// Clustering
// ============================================================================

/// Rectangular numeric table of dive attributes, one row per dive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl AttributeTable {
    /// All flat attributes except the absolute times; unset values become 0.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a DivePhaseRecord>) -> Self {
        let keep = |name: &str| name != "dive_start" && name != "dive_end";
        let columns = FLAT_FIELD_NAMES
            .iter()
            .filter(|&&name| keep(name))
            .map(|name| name.to_string())
            .collect();
        let rows = records
            .into_iter()
            .map(|record| {
                record
                    .flat_fields()
                    .into_iter()
                    .filter(|&(name, _)| keep(name))
                    .map(|(_, value)| value.unwrap_or(0.0))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }
}

/// External clustering of dives by their attributes.
pub trait DiveClusterer {
    /// One cluster label per table row.
    fn cluster(&mut self, table: &AttributeTable) -> Result<Vec<u32>, String>;
}

/// Cluster profiled dives, returning one label per dive.
pub fn cluster_dives<C: DiveClusterer>(
    clusterer: &mut C,
    dives: &[ProfiledDive],
) -> Result<Vec<u32>, DivebombError> {
    let table = AttributeTable::from_records(dives.iter().map(|d| &d.record));
    let labels = clusterer
        .cluster(&table)
        .map_err(DivebombError::Collaborator)?;
    if labels.len() != table.len() {
        return Err(DivebombError::Collaborator(format!(
            "expected {} cluster labels, got {}",
            table.len(),
            labels.len()
        )));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Episode;
    use crate::phases::{analyze_dive, PhaseOptions};

    fn uniform(depths: &[f64]) -> Vec<Sample> {
        depths
            .iter()
            .enumerate()
            .map(|(i, &d)| Sample::new(i as f64, d))
            .collect()
    }

    /// Square profile: descent 5 s, bottom 19 s, ascent 5 s, surface 2 s.
    fn square() -> Vec<Sample> {
        let mut depths = vec![0.0, 10.0, 20.0, 30.0, 40.0];
        depths.extend(vec![50.0; 20]);
        depths.extend([40.0, 30.0, 20.0, 10.0, 0.0, 0.0, 0.0]);
        uniform(&depths)
    }

    fn options() -> PhaseOptions {
        PhaseOptions {
            surface_threshold: 0.5,
            suppress_warnings: true,
        }
    }

    fn profiled(samples: &[Sample]) -> ProfiledDive {
        ProfiledDive {
            episode: Episode::new(0, samples.len()),
            record: analyze_dive(samples, &options()),
        }
    }

    /// Clusters by max depth: deeper than 25 m is cluster 1.
    struct DepthClusterer {
        calls: usize,
    }

    impl DiveClusterer for DepthClusterer {
        fn cluster(&mut self, table: &AttributeTable) -> Result<Vec<u32>, String> {
            self.calls += 1;
            let depths = table.column("max_depth").ok_or("no max_depth column")?;
            Ok(depths.iter().map(|&d| u32::from(d > 25.0)).collect())
        }
    }

    struct BrokenClusterer;

    impl DiveClusterer for BrokenClusterer {
        fn cluster(&mut self, _table: &AttributeTable) -> Result<Vec<u32>, String> {
            Ok(vec![0])
        }
    }

    #[test]
    fn test_phase_segments() {
        let samples = square();
        let record = analyze_dive(&samples, &options());
        let segments = PhaseSegments::split(&samples, &record).unwrap();

        assert_eq!(segments.descent.len(), 6, "t = 0..=5");
        assert_eq!(segments.bottom.len(), 20, "t = 5..=24");
        assert_eq!(segments.ascent.len(), 6, "t = 24..=29");
        assert_eq!(segments.surface.len(), 3, "t = 29..=31");
        assert_eq!(segments.bottom.first().map(|s| s.time), Some(5.0));
        assert_eq!(segments.ascent.last().map(|s| s.time), Some(29.0));
    }

    #[test]
    fn test_phase_segments_insufficient() {
        let samples = uniform(&[0.0, 0.2, 0.1]);
        let record = analyze_dive(&samples, &options());
        assert!(PhaseSegments::split(&samples, &record).is_none());
    }

    #[test]
    fn test_dive_export() {
        let samples = square();
        let recording = Recording::from_samples(samples.clone());
        let dive = profiled(&samples);

        let export = DiveExport::new(0, &dive, &recording);
        assert_eq!(export.dive_id, 1);
        assert_eq!(export.file_name(), "dive_00001.json");
        assert!(!export.is_surface_event);
        assert_eq!(export.insufficient_reason, None);
        assert_eq!(export.time_units, "seconds since 1970-01-01");
        assert_eq!(export.time.len(), samples.len());
        assert_eq!(export.depth[5], 50.0);
        assert_eq!(export.attributes.get("sufficient"), Some(&Some(1.0)));
        assert_eq!(export.attributes.get("total_duration"), Some(&Some(31.0)));

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["dive_id"], 1);
        assert!(json["insufficient_reason"].is_null());
    }

    #[test]
    fn test_surface_event_export() {
        let samples = uniform(&[0.0, 0.3, 0.2, 0.0]);
        let recording = Recording::from_samples(samples.clone());
        let exports = export_dives(&recording, &[profiled(&samples)]);

        let export = &exports[0];
        assert!(export.is_surface_event);
        assert_eq!(export.insufficient_reason, Some(InsufficientData::NeverSubmerged));
        assert_eq!(export.time, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(export.attributes.get("dive_end"), Some(&None));

        let json = serde_json::to_value(export).unwrap();
        assert_eq!(json["insufficient_reason"], "never_submerged");
    }

    #[test]
    fn test_attribute_table() {
        let records = [
            analyze_dive(&square(), &options()),
            analyze_dive(&uniform(&[0.0, 0.3, 0.0]), &options()),
        ];
        let table = AttributeTable::from_records(&records);

        assert_eq!(table.columns.len(), FLAT_FIELD_NAMES.len() - 2);
        assert!(!table.columns.iter().any(|c| c == "dive_start" || c == "dive_end"));
        assert_eq!(table.len(), 2);
        assert!(table.rows.iter().all(|row| row.len() == table.columns.len()));

        assert_eq!(table.column("max_depth"), Some(vec![50.0, 0.3]));
        assert_eq!(table.column("bottom_duration"), Some(vec![19.0, 0.0]));
        assert_eq!(table.column("sufficient"), Some(vec![1.0, 0.0]));
        assert_eq!(table.column("dive_start"), None);
    }

    #[test]
    fn test_cluster_dives() {
        let shallow = uniform(&[0.0, 5.0, 10.0, 20.0, 20.0, 20.0, 10.0, 0.0, 0.0]);
        let dives = [profiled(&square()), profiled(&shallow)];

        let mut clusterer = DepthClusterer { calls: 0 };
        let labels = cluster_dives(&mut clusterer, &dives).unwrap();
        assert_eq!(labels, vec![1, 0]);
        assert_eq!(clusterer.calls, 1);
    }

    #[test]
    fn test_cluster_label_count_checked() {
        let dives = [profiled(&square()), profiled(&square())];
        let result = cluster_dives(&mut BrokenClusterer, &dives);
        assert!(matches!(result, Err(DivebombError::Collaborator(_))));
    }
}
