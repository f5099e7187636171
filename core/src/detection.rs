//! Segmentation of a full recording into dive episodes.
//!
//! Dive starts are the shallow peaks of the depth signal. Peaks are found on
//! negated depth with [`find_peaks`], consecutive starts are turned into
//! blocks, blocks are split at recording gaps, and (for animals that must
//! breathe at the surface) blocks that never leave the surface are dropped.

use serde::Deserialize;

use crate::error::DivebombError;
use crate::metrics::{max_depth, mean_interval, modal_interval_quantized, quantize_interval};
use crate::models::{Episode, Recording, Sample};
use crate::peaks::find_peaks;

// ============================================================================
// Sensitivity Policy
// ============================================================================

/// Peak threshold used for animals that surface between dives.
///
/// Surfacing animals return to (almost) zero depth, so only the very
/// shallowest 2% of the depth range can start a dive.
pub const SURFACING_SENSITIVITY: f64 = 0.98;

/// Peak threshold used for animals that do not reliably surface.
pub const NON_SURFACING_SENSITIVITY: f64 = 0.5;

/// Default minimum time between two dive starts, in seconds.
pub const DEFAULT_MIN_TIME_BETWEEN_DIVES: f64 = 10.0;

/// Resolve the peak detection threshold for a recording.
///
/// An explicit override wins and must lie in `[0, 1]`; otherwise the
/// threshold depends only on whether the animal surfaces between dives.
pub fn resolve_sensitivity(
    is_surfacing_animal: bool,
    sensitivity: Option<f64>,
) -> Result<f64, DivebombError> {
    match sensitivity {
        Some(value) if (0.0..=1.0).contains(&value) => Ok(value),
        Some(value) => Err(DivebombError::InvalidSensitivity(value)),
        None if is_surfacing_animal => Ok(SURFACING_SENSITIVITY),
        None => Ok(NON_SURFACING_SENSITIVITY),
    }
}

// ============================================================================
// Options
// ============================================================================

/// Parameters of dive start detection.
#[derive(Debug, Clone, PartialEq, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct DetectionOptions {
    /// The animal is guaranteed to surface between dives
    pub is_surfacing_animal: bool,
    /// Peak detection threshold override in `[0, 1]`; lower is deeper
    pub sensitivity: Option<f64>,
    /// Minimum time between dive starts, in seconds
    pub min_time_between_dives: f64,
    /// Depth at or above which a surfacing animal counts as at the surface
    pub surface_threshold: f64,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            is_surfacing_animal: true,
            sensitivity: None,
            min_time_between_dives: DEFAULT_MIN_TIME_BETWEEN_DIVES,
            surface_threshold: 0.0,
        }
    }
}

impl DetectionOptions {
    pub fn validate(&self) -> Result<(), DivebombError> {
        resolve_sensitivity(self.is_surfacing_animal, self.sensitivity)?;
        if !self.min_time_between_dives.is_finite() || self.min_time_between_dives < 0.0 {
            return Err(DivebombError::InvalidConfig(format!(
                "min_time_between_dives must be a non-negative number of seconds, got {}",
                self.min_time_between_dives
            )));
        }
        if !self.surface_threshold.is_finite() {
            return Err(DivebombError::InvalidConfig(format!(
                "surface_threshold must be finite, got {}",
                self.surface_threshold
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Detection
// ============================================================================

/// Split a recording into candidate dive episodes.
///
/// Episodes are ordered and non-overlapping. A recording with fewer than two
/// samples, no time span, or no qualifying peak yields no episodes.
pub fn detect_dives(
    recording: &Recording,
    options: &DetectionOptions,
) -> Result<Vec<Episode>, DivebombError> {
    options.validate()?;
    let sensitivity = resolve_sensitivity(options.is_surfacing_animal, options.sensitivity)?;

    let samples = recording.samples();
    let interval = match mean_interval(samples) {
        Some(interval) if interval > 0.0 => interval,
        _ => {
            tracing::debug!(
                samples = samples.len(),
                "recording has no time span, no dives detected"
            );
            return Ok(Vec::new());
        }
    };
    let min_separation = options.min_time_between_dives / interval;

    let inverted: Vec<f64> = samples.iter().map(|s| -s.depth).collect();
    let starts = find_peaks(&inverted, sensitivity, min_separation);
    tracing::debug!(
        candidates = starts.len(),
        sensitivity,
        mean_interval = interval,
        min_separation,
        "dive start candidates"
    );
    if starts.is_empty() {
        return Ok(Vec::new());
    }

    let Some(modal_gap) = modal_interval_quantized(samples) else {
        return Ok(Vec::new());
    };

    let mut episodes = build_blocks(samples, &starts, modal_gap);

    if options.is_surfacing_animal {
        let surviving: Vec<usize> = episodes
            .iter()
            .filter(|episode| {
                max_depth(&samples[episode.range()])
                    .is_some_and(|depth| depth > options.surface_threshold)
            })
            .map(|episode| episode.start)
            .collect();
        tracing::debug!(
            dropped = episodes.len() - surviving.len(),
            "surface-only blocks removed"
        );
        episodes = build_blocks(samples, &surviving, modal_gap);
    }

    Ok(episodes)
}

/// Turn ordered start indices into blocks ending at the next start (the last
/// one at the final sample index), each split at its recording gaps.
fn build_blocks(samples: &[Sample], starts: &[usize], modal_gap: i64) -> Vec<Episode> {
    let last_index = samples.len().saturating_sub(1);
    let mut blocks = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(last_index);
        split_at_gaps(samples, start, end, modal_gap, &mut blocks);
    }
    blocks
}

/// Push `[start, end)` as consecutive pieces, a new piece starting after
/// every gap wider than the modal sampling gap.
fn split_at_gaps(
    samples: &[Sample],
    start: usize,
    end: usize,
    modal_gap: i64,
    blocks: &mut Vec<Episode>,
) {
    let mut piece_start = start;
    for k in (start + 1)..end {
        if quantize_interval(samples[k].time - samples[k - 1].time) > modal_gap {
            tracing::debug!(
                block_start = start,
                gap_after = k - 1,
                "block split at recording gap"
            );
            blocks.push(Episode::new(piece_start, k));
            piece_start = k;
        }
    }
    blocks.push(Episode::new(piece_start, end));
}
