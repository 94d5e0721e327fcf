use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Slack, in ticks, when deciding whether a value sits on or inside the grid
const TICK_EPS: f64 = 1e-9;

/// Quantization grid of a design, e.g. the scanner's sampling interval.
///
/// Durations are represented either as seconds (`f64`) or as integer ticks
/// (multiples of the resolution). Working in ticks keeps repeated one-step
/// nudges exact; converting back with [`Grid::value`] always yields
/// `resolution * ticks`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    resolution: f64,
}

impl Grid {
    /// Returns `None` unless `resolution` is finite and positive
    pub fn new(resolution: f64) -> Option<Self> {
        (resolution.is_finite() && resolution > 0.0).then_some(Self { resolution })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Nearest tick, ties to even
    pub fn ticks(&self, seconds: f64) -> i64 {
        (seconds / self.resolution).round_ties_even() as i64
    }

    pub fn value(&self, ticks: i64) -> f64 {
        self.resolution * ticks as f64
    }

    pub fn quantize(&self, seconds: f64) -> f64 {
        self.value(self.ticks(seconds))
    }

    /// Ticks of the grid points lying inside `[lo, hi]`, `None` if there are none
    pub fn tick_range(&self, lo: f64, hi: f64) -> Option<RangeInclusive<i64>> {
        let first = (lo / self.resolution - TICK_EPS).ceil() as i64;
        let last = (hi / self.resolution + TICK_EPS).floor() as i64;
        (first <= last).then_some(first..=last)
    }

    /// Nearest tick, pulled back inside `range` when rounding lands outside it
    pub fn quantize_within(&self, seconds: f64, range: &RangeInclusive<i64>) -> i64 {
        self.ticks(seconds).clamp(*range.start(), *range.end())
    }

    /// Seconds as a `Duration`; negative values become zero
    pub fn to_duration(seconds: f64) -> Duration {
        Duration::from_secs_f64(seconds.max(0.0))
    }

    pub fn is_aligned(&self, seconds: f64) -> bool {
        let t = seconds / self.resolution;
        (t - t.round()).abs() <= TICK_EPS * t.abs().max(1.0)
    }
}
