//! Statistics over depth samples.
//!
//! Pure functions and small accumulators shared by the detector and the phase
//! analyzer. All standard deviations are population deviations (divide by `n`).

use std::collections::HashMap;

use crate::models::Sample;

/// Resolution used when comparing sampling intervals, in seconds.
const INTERVAL_RESOLUTION_SEC: f64 = 1e-6;

/// Incrementally maintained mean and standard deviation (Welford).
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation; 0 when nothing has been pushed.
    pub fn std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.m2.max(0.0) / self.count as f64).sqrt()
    }
}

/// Depth statistics for the samples inside a time span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanStats {
    /// Number of samples in span
    pub sample_count: u64,
    /// Shallowest depth in span
    pub min_depth_m: f64,
    /// Deepest depth in span
    pub max_depth_m: f64,
    /// Population standard deviation of depth
    pub std_dev_m: f64,
}

impl SpanStats {
    /// Compute statistics for samples with `start <= time <= end`.
    ///
    /// Returns `None` when the span holds no samples.
    pub fn compute(start: f64, end: f64, samples: &[Sample]) -> Option<Self> {
        let mut stats = RunningStats::new();
        let mut min_depth_m = f64::INFINITY;
        let mut max_depth_m = f64::NEG_INFINITY;

        for sample in samples
            .iter()
            .filter(|s| s.time >= start && s.time <= end)
        {
            stats.push(sample.depth);
            min_depth_m = min_depth_m.min(sample.depth);
            max_depth_m = max_depth_m.max(sample.depth);
        }

        if stats.count() == 0 {
            return None;
        }

        Some(SpanStats {
            sample_count: stats.count(),
            min_depth_m,
            max_depth_m,
            std_dev_m: stats.std_dev(),
        })
    }

    /// Depth range covered by the span.
    pub fn depth_range_m(&self) -> f64 {
        self.max_depth_m - self.min_depth_m
    }
}

/// Maximum depth of a sample slice, `None` when empty.
pub fn max_depth(samples: &[Sample]) -> Option<f64> {
    samples.iter().map(|s| s.depth).reduce(f64::max)
}

/// Arithmetic mean depth of a sample slice, `None` when empty.
pub fn mean_depth(samples: &[Sample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().map(|s| s.depth).sum::<f64>() / samples.len() as f64)
}

/// Mean time between consecutive samples.
///
/// Equals `(t_last - t_first) / (n - 1)`. `None` for fewer than two samples.
pub fn mean_interval(samples: &[Sample]) -> Option<f64> {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) if samples.len() >= 2 => {
            Some((last.time - first.time) / (samples.len() - 1) as f64)
        }
        _ => None,
    }
}

/// Interval quantized to [`INTERVAL_RESOLUTION_SEC`] so that float noise in
/// timestamps does not split otherwise identical gaps.
pub(crate) fn quantize_interval(seconds: f64) -> i64 {
    (seconds / INTERVAL_RESOLUTION_SEC).round() as i64
}

/// Most frequent gap between consecutive samples, as a quantized interval.
///
/// Ties resolve to the smallest gap. `None` for fewer than two samples.
pub(crate) fn modal_interval_quantized(samples: &[Sample]) -> Option<i64> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for pair in samples.windows(2) {
        *counts.entry(quantize_interval(pair[1].time - pair[0].time)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(gap_a, count_a), (gap_b, count_b)| {
            count_a.cmp(count_b).then_with(|| gap_b.cmp(gap_a))
        })
        .map(|(gap, _)| gap)
}

/// Most frequent gap between consecutive samples, in seconds.
pub fn modal_interval(samples: &[Sample]) -> Option<f64> {
    modal_interval_quantized(samples).map(|q| q as f64 * INTERVAL_RESOLUTION_SEC)
}
