//! End-to-end dive profiling: detect episodes, then analyze each one.

use rayon::prelude::*;
use serde::Serialize;

use crate::config::ProfileConfig;
use crate::detection::detect_dives;
use crate::error::DivebombError;
use crate::models::{Episode, Recording};
use crate::phases::{analyze_dive, DivePhaseRecord, PhaseOptions};
use crate::preprocess::{normalize, RawTable};

/// One detected episode together with its phase analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfiledDive {
    pub episode: Episode,
    pub record: DivePhaseRecord,
}

/// Detect dives in a recording and analyze them one after another.
pub fn profile_dives(
    recording: &Recording,
    config: &ProfileConfig,
) -> Result<Vec<ProfiledDive>, DivebombError> {
    let episodes = detect_dives(recording, &config.detection_options())?;
    let options = config.phase_options();

    let dives: Vec<ProfiledDive> = episodes
        .into_iter()
        .map(|episode| analyze_episode(recording, episode, &options))
        .collect();
    log_summary(&dives);
    Ok(dives)
}

/// Same as [`profile_dives`], analyzing episodes on the rayon thread pool.
///
/// Output order matches episode order.
pub fn profile_dives_parallel(
    recording: &Recording,
    config: &ProfileConfig,
) -> Result<Vec<ProfiledDive>, DivebombError> {
    let episodes = detect_dives(recording, &config.detection_options())?;
    let options = config.phase_options();

    let dives: Vec<ProfiledDive> = episodes
        .into_par_iter()
        .map(|episode| analyze_episode(recording, episode, &options))
        .collect();
    log_summary(&dives);
    Ok(dives)
}

/// Normalize a raw table with the configured columns, then profile it.
pub fn profile_table(
    table: &RawTable,
    config: &ProfileConfig,
) -> Result<(Recording, Vec<ProfiledDive>), DivebombError> {
    config.validate()?;
    let recording = normalize(table, &config.columns, config.time_format.as_deref())?;
    let dives = profile_dives(&recording, config)?;
    Ok((recording, dives))
}

fn analyze_episode(recording: &Recording, episode: Episode, options: &PhaseOptions) -> ProfiledDive {
    ProfiledDive {
        episode,
        record: analyze_dive(recording.episode_samples(&episode), options),
    }
}

fn log_summary(dives: &[ProfiledDive]) {
    let sufficient = dives.iter().filter(|d| d.record.sufficient()).count();
    let surface_events = dives.iter().filter(|d| d.record.is_surface_event()).count();
    tracing::debug!(
        episodes = dives.len(),
        sufficient,
        surface_events,
        "profiling finished"
    );
}

/// Counts over a profiled recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub episodes: usize,
    pub sufficient: usize,
    pub surface_events: usize,
    pub insufficient: usize,
}

impl ProfileSummary {
    pub fn from_dives(dives: &[ProfiledDive]) -> Self {
        dives.iter().fold(Self::default(), |mut summary, dive| {
            summary.episodes += 1;
            if dive.record.sufficient() {
                summary.sufficient += 1;
            } else if dive.record.is_surface_event() {
                summary.surface_events += 1;
            } else {
                summary.insufficient += 1;
            }
            summary
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use crate::preprocess::Column;

    fn dive(depth: f64, ramp: usize, bottom: usize, surface: usize) -> Vec<f64> {
        let mut out = vec![0.0; surface];
        out.extend((0..ramp).map(|k| depth * (k + 1) as f64 / ramp as f64));
        out.extend(std::iter::repeat(depth).take(bottom));
        out.extend((0..ramp).map(|k| depth * (ramp - k - 1) as f64 / ramp as f64));
        out
    }

    /// Three dives of 30, 50 and 20 m sampled once per second.
    fn three_dives() -> Recording {
        let mut depths = vec![2.0];
        depths.extend(dive(30.0, 5, 20, 10));
        depths.extend(dive(50.0, 5, 30, 10));
        depths.extend(dive(20.0, 5, 10, 10));
        depths.extend(vec![0.0; 10]);
        Recording::from_samples(
            depths
                .iter()
                .enumerate()
                .map(|(i, &d)| Sample::new(i as f64, d))
                .collect(),
        )
    }

    fn config() -> ProfileConfig {
        ProfileConfig {
            surface_threshold: 0.5,
            suppress_warnings: true,
            ..ProfileConfig::default()
        }
    }

    #[test]
    fn test_profile_three_dives() {
        let recording = three_dives();
        let dives = profile_dives(&recording, &config()).unwrap();

        let episodes: Vec<Episode> = dives.iter().map(|d| d.episode).collect();
        assert_eq!(
            episodes,
            vec![Episode::new(5, 45), Episode::new(45, 95), Episode::new(95, 130)]
        );

        let max_depths: Vec<f64> = dives.iter().map(|d| d.record.max_depth).collect();
        assert_eq!(max_depths, vec![30.0, 50.0, 20.0]);

        for dive in &dives {
            let phases = dive.record.phases().expect("every dive should be sufficient");
            let sum = phases.descent_duration
                + phases.bottom_duration
                + phases.ascent_duration
                + phases.surface_duration;
            assert!(
                (sum - phases.total_duration).abs() < 1e-9,
                "phase durations must add up to the total"
            );
            let span = recording.samples()[dive.episode.end - 1].time
                - recording.samples()[dive.episode.start].time;
            assert!((phases.total_duration - span).abs() < 1e-9);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let recording = three_dives();
        let sequential = profile_dives(&recording, &config()).unwrap();
        let parallel = profile_dives_parallel(&recording, &config()).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_profile_flat_recording() {
        let recording = Recording::from_samples(
            (0..50).map(|i| Sample::new(i as f64, 0.2)).collect(),
        );
        assert!(profile_dives(&recording, &config()).unwrap().is_empty());
    }

    #[test]
    fn test_profile_rejects_invalid_config() {
        let bad = ProfileConfig {
            sensitivity: Some(-0.1),
            ..ProfileConfig::default()
        };
        assert_eq!(
            profile_dives(&three_dives(), &bad),
            Err(DivebombError::InvalidSensitivity(-0.1))
        );
    }

    #[test]
    fn test_profile_table() {
        let recording = three_dives();
        let table = RawTable::new()
            .with_column(
                "time",
                Column::Numeric(recording.samples().iter().map(|s| s.time).collect()),
            )
            .unwrap()
            .with_column("depth", Column::Numeric(recording.depths()))
            .unwrap();

        let (normalized, dives) = profile_table(&table, &config()).unwrap();
        assert_eq!(normalized, recording);
        assert_eq!(dives.len(), 3);

        let summary = ProfileSummary::from_dives(&dives);
        assert_eq!(
            summary,
            ProfileSummary {
                episodes: 3,
                sufficient: 3,
                surface_events: 0,
                insufficient: 0
            }
        );
    }
}
