//! Phase reconstruction for a single dive episode.
//!
//! Finds the descent→bottom and bottom→ascent changepoints from shifts in the
//! running standard deviation of depth, then derives phase durations,
//! velocities, depth variability, skew and an oscillation count.
//!
//! The analysis is a pure function of the episode's samples; episodes can be
//! analyzed independently and in any order.

use std::collections::BTreeMap;

use crate::error::InsufficientData;
use crate::metrics::{max_depth, mean_depth, mean_interval, RunningStats, SpanStats};
use crate::models::{Sample, Skew};
use crate::peaks::find_peaks;

// ============================================================================
// Constants
// ============================================================================

/// Fraction of max depth a sample must exceed to end the descent or begin
/// the ascent.
const BOTTOM_DEPTH_FRACTION: f64 = 0.85;

/// Fraction of max depth that ends the backward ascent scan unconditionally.
const ASCENT_OVERRIDE_FRACTION: f64 = 0.90;

/// Upper bound on the relative threshold used for oscillation peaks.
const OSCILLATION_MAX_THRESHOLD: f64 = 0.2;

/// Minimum time between two oscillation peaks, in seconds.
const OSCILLATION_MIN_GAP_SEC: f64 = 10.0;

/// Minimum spacing between two oscillation peaks, in samples.
const OSCILLATION_MIN_GAP_SAMPLES: f64 = 3.0;

/// Column names of [`DivePhaseRecord::flat_fields`], in output order.
pub const FLAT_FIELD_NAMES: [&str; 20] = [
    "dive_start",
    "dive_end",
    "bottom_start",
    "descent_duration",
    "bottom_duration",
    "ascent_duration",
    "surface_duration",
    "total_duration",
    "dive_duration",
    "max_depth",
    "descent_velocity",
    "ascent_velocity",
    "bottom_variance",
    "dive_variance",
    "bottom_difference",
    "left_skew",
    "right_skew",
    "no_skew",
    "peak_count",
    "sufficient",
];

// ============================================================================
// Types
// ============================================================================

/// Parameters of phase analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseOptions {
    /// Depth below which the animal counts as submerged
    pub surface_threshold: f64,
    /// Silence the insufficient-dive diagnostic
    pub suppress_warnings: bool,
}

impl Default for PhaseOptions {
    fn default() -> Self {
        Self {
            surface_threshold: 0.0,
            suppress_warnings: false,
        }
    }
}

/// Phase timing and shape statistics of a dive with detectable changepoints.
///
/// Times are seconds since 1970-01-01, durations seconds, depths meters.
#[derive(Debug, Clone, PartialEq)]
pub struct DivePhases {
    pub dive_end: f64,
    pub bottom_start: f64,
    pub descent_duration: f64,
    pub bottom_duration: f64,
    pub ascent_duration: f64,
    /// Residual of the total after the three in-water phases; `<= 0` flags a
    /// degenerate detection
    pub surface_duration: f64,
    pub total_duration: f64,
    pub dive_duration: f64,
    /// m/s, `None` for a zero-length descent
    pub descent_velocity: Option<f64>,
    /// m/s, `None` for a zero-length ascent
    pub ascent_velocity: Option<f64>,
    pub bottom_variance: Option<f64>,
    pub dive_variance: Option<f64>,
    pub bottom_difference: Option<f64>,
    pub skew: Skew,
    pub peak_count: u32,
    /// Episode-relative index of the first bottom sample
    pub descent_end_index: usize,
    /// Episode-relative index of the last bottom sample
    pub ascent_start_index: usize,
    /// Episode-relative index where the post-dive surface interval begins
    pub surface_index: usize,
}

impl DivePhases {
    pub fn bottom_end(&self) -> f64 {
        self.bottom_start + self.bottom_duration
    }
}

/// Outcome of analyzing one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct DivePhaseRecord {
    /// Time of the first sample
    pub dive_start: f64,
    pub max_depth: f64,
    pub phases: Result<DivePhases, InsufficientData>,
}

impl DivePhaseRecord {
    pub fn sufficient(&self) -> bool {
        self.phases.is_ok()
    }

    pub fn phases(&self) -> Option<&DivePhases> {
        self.phases.as_ref().ok()
    }

    pub fn insufficiency(&self) -> Option<InsufficientData> {
        self.phases.as_ref().err().copied()
    }

    /// The episode never went below the surface threshold.
    pub fn is_surface_event(&self) -> bool {
        self.insufficiency()
            .is_some_and(|reason| reason.is_surface_event())
    }

    /// Surface residual is zero or negative.
    pub fn has_degenerate_residual(&self) -> bool {
        self.phases()
            .is_some_and(|phases| phases.surface_duration <= 0.0)
    }

    /// All scalar attributes in [`FLAT_FIELD_NAMES`] order, unset values as `None`.
    pub fn flat_fields(&self) -> Vec<(&'static str, Option<f64>)> {
        let finite = |v: f64| v.is_finite().then_some(v);
        let phases = self.phases();
        let phase = |f: fn(&DivePhases) -> f64| phases.map(f);
        let optional = |f: fn(&DivePhases) -> Option<f64>| phases.and_then(f);
        let skew_flag = |skew: Skew| phases.map(|p| if p.skew == skew { 1.0 } else { 0.0 });

        let values = [
            finite(self.dive_start),
            phase(|p| p.dive_end),
            phase(|p| p.bottom_start),
            phase(|p| p.descent_duration),
            phase(|p| p.bottom_duration),
            phase(|p| p.ascent_duration),
            phase(|p| p.surface_duration),
            phase(|p| p.total_duration),
            phase(|p| p.dive_duration),
            finite(self.max_depth),
            optional(|p| p.descent_velocity),
            optional(|p| p.ascent_velocity),
            optional(|p| p.bottom_variance),
            optional(|p| p.dive_variance),
            optional(|p| p.bottom_difference),
            skew_flag(Skew::Left),
            skew_flag(Skew::Right),
            skew_flag(Skew::Symmetric),
            phase(|p| p.peak_count as f64),
            Some(if self.sufficient() { 1.0 } else { 0.0 }),
        ];

        FLAT_FIELD_NAMES.into_iter().zip(values).collect()
    }

    /// Flat mapping of all scalar attributes for downstream aggregation.
    pub fn to_flat_map(&self) -> BTreeMap<String, Option<f64>> {
        self.flat_fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Reconstruct the phases of one dive episode.
///
/// `samples` must be sorted by time. Never fails: problems are recorded as an
/// [`InsufficientData`] reason on the returned record.
pub fn analyze_dive(samples: &[Sample], options: &PhaseOptions) -> DivePhaseRecord {
    let (Some(first), Some(last), Some(deepest)) =
        (samples.first(), samples.last(), max_depth(samples))
    else {
        if !options.suppress_warnings {
            tracing::warn!(
                reason = %InsufficientData::EmptyEpisode,
                "not enough information for this dive"
            );
        }
        return DivePhaseRecord {
            dive_start: f64::NAN,
            max_depth: f64::NAN,
            phases: Err(InsufficientData::EmptyEpisode),
        };
    };

    let phases = if deepest <= options.surface_threshold {
        Err(InsufficientData::NeverSubmerged)
    } else {
        profile_phases(samples, deepest, options.surface_threshold)
    };

    if !options.suppress_warnings {
        match &phases {
            Err(reason) if !reason.is_surface_event() => tracing::warn!(
                start = first.time,
                end = last.time,
                %reason,
                "not enough information for this dive"
            ),
            Ok(p) if p.surface_duration <= 0.0 => tracing::debug!(
                start = first.time,
                surface_duration = p.surface_duration,
                "degenerate surface residual"
            ),
            _ => {}
        }
    }

    DivePhaseRecord {
        dive_start: first.time,
        max_depth: deepest,
        phases,
    }
}

fn profile_phases(
    samples: &[Sample],
    max_depth: f64,
    surface_threshold: f64,
) -> Result<DivePhases, InsufficientData> {
    let depths: Vec<f64> = samples.iter().map(|s| s.depth).collect();

    let descent_end_index = descent_changepoint(&depths, max_depth)?;
    let surface_index = surface_boundary(&depths, surface_threshold)?;
    let ascent_start_index = ascent_changepoint(&depths, max_depth, surface_index)?;

    let first_time = samples[0].time;
    let last_time = samples[samples.len() - 1].time;
    let bottom_start = samples[descent_end_index].time;
    let bottom_end = samples[ascent_start_index].time;
    let surface_start = samples[surface_index].time;

    let descent_duration = bottom_start - first_time;
    let bottom_duration = bottom_end - bottom_start;
    let ascent_duration = surface_start - bottom_end;
    let total_duration = last_time - first_time;
    let surface_duration = total_duration - descent_duration - bottom_duration - ascent_duration;

    let descent_span = SpanStats::compute(f64::NEG_INFINITY, bottom_start, samples);
    let ascent_span = SpanStats::compute(bottom_end, f64::INFINITY, samples);
    let bottom_span = SpanStats::compute(bottom_start, bottom_end, samples);
    let dive_span = SpanStats::compute(first_time, surface_start, samples);

    Ok(DivePhases {
        dive_end: first_time + total_duration,
        bottom_start,
        descent_duration,
        bottom_duration,
        ascent_duration,
        surface_duration,
        total_duration,
        dive_duration: total_duration - surface_duration,
        descent_velocity: descent_span.and_then(|s| rate(s.depth_range_m(), descent_duration)),
        ascent_velocity: ascent_span.and_then(|s| rate(s.depth_range_m(), ascent_duration)),
        bottom_variance: bottom_span.as_ref().map(|s| s.std_dev_m),
        dive_variance: dive_span.map(|s| s.std_dev_m),
        bottom_difference: bottom_span.map(|s| s.depth_range_m()),
        skew: Skew::from_durations(descent_duration, ascent_duration),
        peak_count: count_oscillations(samples, &depths, max_depth, surface_threshold),
        descent_end_index,
        ascent_start_index,
        surface_index,
    })
}

fn rate(depth_change: f64, duration: f64) -> Option<f64> {
    (duration != 0.0).then(|| depth_change / duration)
}

// ============================================================================
// Changepoints
// ============================================================================

/// Forward scan for the first bottom sample.
///
/// Stops at the first sample deeper than 85% of max depth where the running
/// standard deviation of depth stopped growing or the profile stopped
/// descending.
fn descent_changepoint(depths: &[f64], max_depth: f64) -> Result<usize, InsufficientData> {
    let threshold = max_depth * BOTTOM_DEPTH_FRACTION;
    let mut running = RunningStats::new();
    let mut previous_std = 0.0;

    for (i, &depth) in depths.iter().enumerate() {
        running.push(depth);
        let std_dev = running.std_dev();

        let leveled = std_dev <= previous_std
            || depths.get(i + 1).is_some_and(|&next| depth >= next);
        if depth > threshold && leveled {
            return Ok(i);
        }
        previous_std = std_dev;
    }

    Err(InsufficientData::DescentNotFound)
}

/// Backward scan for the start of the post-dive surface interval: the latest
/// index whose predecessor is still at or below the surface threshold.
fn surface_boundary(depths: &[f64], surface_threshold: f64) -> Result<usize, InsufficientData> {
    (1..depths.len())
        .rev()
        .find(|&i| depths[i - 1] >= surface_threshold)
        .ok_or(InsufficientData::SurfaceBoundaryNotFound)
}

/// Backward scan from the surface boundary for the last bottom sample.
///
/// The running standard deviation covers the suffix `[i, surface_index]`.
/// A sample deeper than 90% of max depth ends the scan outright; otherwise a
/// sample deeper than 85% ends it when the deviation shrank or the profile,
/// read backwards, stopped rising.
fn ascent_changepoint(
    depths: &[f64],
    max_depth: f64,
    surface_index: usize,
) -> Result<usize, InsufficientData> {
    let override_threshold = max_depth * ASCENT_OVERRIDE_FRACTION;
    let threshold = max_depth * BOTTOM_DEPTH_FRACTION;
    let mut running = RunningStats::new();
    running.push(depths[surface_index]);
    let mut previous_std = 0.0;

    for i in (0..surface_index).rev() {
        let depth = depths[i];
        running.push(depth);
        let std_dev = running.std_dev();

        if depth > override_threshold {
            return Ok(i);
        }
        let leveled = std_dev < previous_std || (i > 0 && depth >= depths[i - 1]);
        if depth > threshold && leveled {
            return Ok(i);
        }
        previous_std = std_dev;
    }

    Err(InsufficientData::AscentNotFound)
}

// ============================================================================
// Oscillations
// ============================================================================

/// Count shallow excursions in the profile.
///
/// Peaks of negated depth, with a relative threshold of at most 0.2 that
/// shrinks as the mean depth approaches the max, at least 10 s and 3 samples
/// apart.
fn count_oscillations(
    samples: &[Sample],
    depths: &[f64],
    max_depth: f64,
    surface_threshold: f64,
) -> u32 {
    let mean = mean_depth(samples).unwrap_or(0.0);
    let relative_threshold =
        (1.0 - (mean - surface_threshold) / max_depth).min(OSCILLATION_MAX_THRESHOLD);

    let min_separation = match mean_interval(samples) {
        Some(interval) if interval > 0.0 => {
            (OSCILLATION_MIN_GAP_SEC / interval).max(OSCILLATION_MIN_GAP_SAMPLES)
        }
        _ => f64::INFINITY,
    };

    let inverted: Vec<f64> = depths.iter().map(|d| -d).collect();
    find_peaks(&inverted, relative_threshold, min_separation).len() as u32
}

// ============================================================================
// Tests
// ============================================================================
