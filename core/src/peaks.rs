//! Local-maximum detection with a relative threshold and minimum spacing.
//!
//! Both dive segmentation and oscillation counting run this on negated depth,
//! so "peaks" there are the shallowest points of the profile.

/// Find local maxima of `signal`.
///
/// A candidate is a strict local maximum, or the middle sample of a flat run
/// bounded on both sides by strictly lower samples, whose value exceeds
/// `min + relative_threshold * (max - min)`. When two candidates lie fewer than
/// `min_separation` samples apart only the higher one is kept; candidates are
/// visited by descending value, ties by ascending index.
///
/// Returns indices in ascending order. Deterministic.
pub fn find_peaks(signal: &[f64], relative_threshold: f64, min_separation: f64) -> Vec<usize> {
    let candidates = candidate_peaks(signal, relative_threshold);
    if candidates.len() < 2 || min_separation.is_nan() || min_separation <= 1.0 {
        return candidates;
    }
    suppress_close_peaks(signal, candidates, min_separation)
}

fn candidate_peaks(signal: &[f64], relative_threshold: f64) -> Vec<usize> {
    let n = signal.len();
    if n < 3 {
        return Vec::new();
    }

    let (lo, hi) = signal
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if hi.is_nan() || lo.is_nan() || hi <= lo {
        return Vec::new();
    }
    let cutoff = lo + relative_threshold.clamp(0.0, 1.0) * (hi - lo);

    let mut peaks = Vec::new();
    let mut run_start = 0;
    while run_start < n {
        let value = signal[run_start];
        let mut run_end = run_start;
        while run_end + 1 < n && signal[run_end + 1] == value {
            run_end += 1;
        }

        let bounded = run_start > 0
            && run_end + 1 < n
            && signal[run_start - 1] < value
            && signal[run_end + 1] < value;
        if bounded && value > cutoff {
            peaks.push((run_start + run_end) / 2);
        }

        run_start = run_end + 1;
    }
    peaks
}

fn suppress_close_peaks(signal: &[f64], candidates: Vec<usize>, min_separation: f64) -> Vec<usize> {
    let mut by_height = candidates;
    by_height.sort_by(|&a, &b| signal[b].total_cmp(&signal[a]).then(a.cmp(&b)));

    let mut kept: Vec<usize> = Vec::with_capacity(by_height.len());
    for peak in by_height {
        let conflicts = kept
            .iter()
            .any(|&other| (peak as f64 - other as f64).abs() < min_separation);
        if !conflicts {
            kept.push(peak);
        }
    }

    kept.sort_unstable();
    kept
}
