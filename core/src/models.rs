use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Time units of every `time` value handled by the crate.
pub const TIME_UNITS: &str = "seconds since 1970-01-01";

/// One depth reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, uniffi::Record)]
pub struct Sample {
    /// Seconds since 1970-01-01T00:00:00Z
    pub time: f64,
    /// Depth in meters, positive downwards
    pub depth: f64,
}

impl Sample {
    pub fn new(time: f64, depth: f64) -> Self {
        Self { time, depth }
    }
}

/// A full depth recording, ordered by time.
///
/// Samples are sorted once on construction and never mutated afterwards.
/// Equal timestamps are kept in their input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recording {
    samples: Vec<Sample>,
}

impl Recording {
    pub fn from_samples(mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples covered by an episode. Out-of-range bounds are clamped.
    pub fn episode_samples(&self, episode: &Episode) -> &[Sample] {
        let end = episode.end.min(self.samples.len());
        let start = episode.start.min(end);
        &self.samples[start..end]
    }

    /// Samples whose time lies within `[start, end]`.
    pub fn time_window(&self, start: f64, end: f64) -> &[Sample] {
        let lo = self.samples.partition_point(|s| s.time < start);
        let hi = self.samples.partition_point(|s| s.time <= end);
        &self.samples[lo..hi.max(lo)]
    }

    pub fn depths(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.depth).collect()
    }
}

/// Half-open index range `[start, end)` into a [`Recording`], one candidate dive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Episode {
    pub start: usize,
    pub end: usize,
}

impl Episode {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Whether the episode contains both sides of the boundary between
    /// samples `index` and `index + 1`.
    pub fn spans_boundary(&self, index: usize) -> bool {
        self.start <= index && index + 1 < self.end
    }
}

/// Asymmetry between descent and ascent durations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum Skew {
    /// Descent took longer than ascent
    Left,
    /// Ascent took longer than descent
    Right,
    /// Equal durations
    Symmetric,
}

impl Skew {
    pub fn from_durations(descent: f64, ascent: f64) -> Self {
        if ascent > descent {
            Skew::Right
        } else if descent > ascent {
            Skew::Left
        } else {
            Skew::Symmetric
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Skew::Left => "left",
            Skew::Right => "right",
            Skew::Symmetric => "none",
        }
    }
}

/// Vocabulary for downstream dive-shape classification.
///
/// Nothing in this crate assigns these labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, uniffi::Enum)]
pub enum DiveShape {
    Square,
    VShape,
    UShape,
    WShape,
    LeftSkew,
    RightSkew,
    Other,
    Unknown,
    Surface,
    Wiggle,
    Flat,
    Shallow,
}

impl DiveShape {
    pub const ALL: [DiveShape; 12] = [
        DiveShape::Square,
        DiveShape::VShape,
        DiveShape::UShape,
        DiveShape::WShape,
        DiveShape::LeftSkew,
        DiveShape::RightSkew,
        DiveShape::Other,
        DiveShape::Unknown,
        DiveShape::Surface,
        DiveShape::Wiggle,
        DiveShape::Flat,
        DiveShape::Shallow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiveShape::Square => "square",
            DiveShape::VShape => "v-shape",
            DiveShape::UShape => "u-shape",
            DiveShape::WShape => "w-shape",
            DiveShape::LeftSkew => "left",
            DiveShape::RightSkew => "right",
            DiveShape::Other => "other",
            DiveShape::Unknown => "unknown",
            DiveShape::Surface => "surface",
            DiveShape::Wiggle => "wiggle",
            DiveShape::Flat => "flat",
            DiveShape::Shallow => "shallow",
        }
    }
}

impl fmt::Display for DiveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
