//! Functions and records exported through UniFFI.
//!
//! Samples cross the boundary as plain `Sample` records and are sorted by
//! time on entry.

use crate::detection::{detect_dives, DetectionOptions};
use crate::error::DivebombError;
use crate::models::{DiveShape, Episode, Recording, Sample, Skew};
use crate::phases::{analyze_dive, DivePhaseRecord, PhaseOptions};

/// Index range `[start, end)` of one dive episode in the time-sorted samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct EpisodeRange {
    pub start: u64,
    pub end: u64,
}

impl From<Episode> for EpisodeRange {
    fn from(episode: Episode) -> Self {
        Self {
            start: episode.start as u64,
            end: episode.end as u64,
        }
    }
}

/// Phase analysis of one dive, unset values as `None`.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct DiveSummary {
    pub dive_start: Option<f64>,
    pub dive_end: Option<f64>,
    pub bottom_start: Option<f64>,
    pub descent_duration: Option<f64>,
    pub bottom_duration: Option<f64>,
    pub ascent_duration: Option<f64>,
    pub surface_duration: Option<f64>,
    pub total_duration: Option<f64>,
    pub dive_duration: Option<f64>,
    pub max_depth: Option<f64>,
    pub descent_velocity: Option<f64>,
    pub ascent_velocity: Option<f64>,
    pub bottom_variance: Option<f64>,
    pub dive_variance: Option<f64>,
    pub bottom_difference: Option<f64>,
    pub skew: Option<Skew>,
    pub peak_count: Option<u32>,
    pub sufficient: bool,
    pub is_surface_event: bool,
    pub insufficient_reason: Option<String>,
}

impl From<&DivePhaseRecord> for DiveSummary {
    fn from(record: &DivePhaseRecord) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        let phases = record.phases();
        Self {
            dive_start: finite(record.dive_start),
            dive_end: phases.map(|p| p.dive_end),
            bottom_start: phases.map(|p| p.bottom_start),
            descent_duration: phases.map(|p| p.descent_duration),
            bottom_duration: phases.map(|p| p.bottom_duration),
            ascent_duration: phases.map(|p| p.ascent_duration),
            surface_duration: phases.map(|p| p.surface_duration),
            total_duration: phases.map(|p| p.total_duration),
            dive_duration: phases.map(|p| p.dive_duration),
            max_depth: finite(record.max_depth),
            descent_velocity: phases.and_then(|p| p.descent_velocity),
            ascent_velocity: phases.and_then(|p| p.ascent_velocity),
            bottom_variance: phases.and_then(|p| p.bottom_variance),
            dive_variance: phases.and_then(|p| p.dive_variance),
            bottom_difference: phases.and_then(|p| p.bottom_difference),
            skew: phases.map(|p| p.skew),
            peak_count: phases.map(|p| p.peak_count),
            sufficient: record.sufficient(),
            is_surface_event: record.is_surface_event(),
            insufficient_reason: record.insufficiency().map(|reason| reason.to_string()),
        }
    }
}

#[uniffi::export]
pub fn detect_dive_episodes(
    samples: Vec<Sample>,
    options: DetectionOptions,
) -> Result<Vec<EpisodeRange>, DivebombError> {
    let recording = Recording::from_samples(samples);
    let episodes = detect_dives(&recording, &options)?;
    Ok(episodes.into_iter().map(EpisodeRange::from).collect())
}

/// Analyze a single dive episode given as its samples.
#[uniffi::export]
pub fn analyze_dive_samples(
    samples: Vec<Sample>,
    surface_threshold: f64,
    suppress_warnings: bool,
) -> DiveSummary {
    let recording = Recording::from_samples(samples);
    let options = PhaseOptions {
        surface_threshold,
        suppress_warnings,
    };
    DiveSummary::from(&analyze_dive(recording.samples(), &options))
}

/// Detect dives in a full recording and analyze each of them.
#[uniffi::export]
pub fn profile_samples(
    samples: Vec<Sample>,
    options: DetectionOptions,
    suppress_warnings: bool,
) -> Result<Vec<DiveSummary>, DivebombError> {
    let recording = Recording::from_samples(samples);
    let phase_options = PhaseOptions {
        surface_threshold: options.surface_threshold,
        suppress_warnings,
    };
    let episodes = detect_dives(&recording, &options)?;
    Ok(episodes
        .iter()
        .map(|episode| {
            DiveSummary::from(&analyze_dive(recording.episode_samples(episode), &phase_options))
        })
        .collect())
}

/// Labels of the downstream dive-shape vocabulary.
#[uniffi::export]
pub fn dive_shape_labels() -> Vec<String> {
    DiveShape::ALL.iter().map(|shape| shape.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(depths: &[f64]) -> Vec<Sample> {
        depths
            .iter()
            .enumerate()
            .map(|(i, &d)| Sample::new(i as f64, d))
            .collect()
    }

    fn two_dives() -> Vec<Sample> {
        let mut depths = vec![3.0];
        depths.extend(vec![0.0; 10]);
        depths.extend([10.0, 20.0, 30.0]);
        depths.extend(vec![30.0; 10]);
        depths.extend([20.0, 10.0, 0.0]);
        depths.extend(vec![0.0; 10]);
        depths.extend([10.0, 20.0]);
        depths.extend(vec![20.0; 10]);
        depths.extend([10.0, 0.0]);
        depths.extend(vec![0.0; 5]);
        uniform(&depths)
    }

    #[test]
    fn test_detect_dive_episodes() {
        let episodes = detect_dive_episodes(two_dives(), DetectionOptions::default()).unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].end, episodes[1].start);
        assert_eq!(episodes[0].start, 5);
    }

    #[test]
    fn test_detect_rejects_bad_sensitivity() {
        let options = DetectionOptions {
            sensitivity: Some(2.0),
            ..DetectionOptions::default()
        };
        assert_eq!(
            detect_dive_episodes(two_dives(), options),
            Err(DivebombError::InvalidSensitivity(2.0))
        );
    }

    #[test]
    fn test_analyze_unsorted_samples() {
        let mut samples = uniform(&[0.0, 10.0, 20.0, 20.0, 20.0, 10.0, 0.0, 0.0]);
        samples.reverse();

        let summary = analyze_dive_samples(samples, 0.5, true);
        assert!(summary.sufficient);
        assert_eq!(summary.dive_start, Some(0.0));
        assert_eq!(summary.max_depth, Some(20.0));
        assert_eq!(summary.insufficient_reason, None);
    }

    #[test]
    fn test_analyze_surface_event() {
        let summary = analyze_dive_samples(uniform(&[0.0, 0.2, 0.0]), 0.5, true);
        assert!(!summary.sufficient);
        assert!(summary.is_surface_event);
        assert_eq!(summary.skew, None);
        assert_eq!(summary.peak_count, None);
        assert_eq!(
            summary.insufficient_reason.as_deref(),
            Some("episode never went below the surface threshold")
        );
    }

    #[test]
    fn test_analyze_empty() {
        let summary = analyze_dive_samples(Vec::new(), 0.0, true);
        assert_eq!(summary.dive_start, None);
        assert_eq!(summary.max_depth, None);
        assert!(!summary.sufficient);
    }

    #[test]
    fn test_profile_samples() {
        let options = DetectionOptions {
            surface_threshold: 0.5,
            ..DetectionOptions::default()
        };
        let summaries = profile_samples(two_dives(), options, true).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].max_depth, Some(30.0));
        assert_eq!(summaries[1].max_depth, Some(20.0));
    }

    #[test]
    fn test_dive_shape_labels() {
        let labels = dive_shape_labels();
        assert_eq!(labels.len(), 12);
        assert!(labels.iter().any(|l| l == "unknown"));
    }
}
