use crate::config::{FitterConfig, RepairPolicy};
use crate::optimize::{Bounds, Minimizer, Objective, ProjectedGradient};
use cogex_core::{DesignError, Result};
use cogex_timing::Grid;
use rand::Rng;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

/// Float slack on the closeness test, so a mean exactly one unit away still counts
const CLOSE_EPS: f64 = 1e-9;

/// `|mean(x) - target|` with its analytic gradient
#[derive(Debug, Clone, Copy)]
pub struct MeanObjective {
    target: f64,
}

impl MeanObjective {
    pub fn new(target: f64) -> Self {
        Self { target }
    }

    fn gap(&self, x: &[f64]) -> f64 {
        x.iter().sum::<f64>() / x.len() as f64 - self.target
    }
}

impl Objective for MeanObjective {
    fn value(&self, x: &[f64]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        self.gap(x).abs()
    }

    fn gradient(&self, x: &[f64], _bounds: &Bounds, grad: &mut [f64]) {
        let gap = if x.is_empty() { 0.0 } else { self.gap(x) };
        let g = if gap > 0.0 {
            1.0 / x.len() as f64
        } else if gap < 0.0 {
            -1.0 / x.len() as f64
        } else {
            0.0
        };
        grad.fill(g);
    }
}

/// Pulls quantised samples toward a target mean without leaving `[min, max]`.
///
/// A continuous box-constrained relaxation does the bulk of the work; the
/// quantised result is then repaired one grid step at a time on randomly
/// picked elements until the mean is within tolerance.
#[derive(Debug, Clone)]
pub struct MeanFitter<M = ProjectedGradient> {
    config: FitterConfig,
    minimizer: M,
}

impl Default for MeanFitter {
    fn default() -> Self {
        Self::new(FitterConfig::default(), ProjectedGradient::default())
    }
}

impl<M: Minimizer> MeanFitter<M> {
    pub fn new(config: FitterConfig, minimizer: M) -> Self {
        Self { config, minimizer }
    }

    pub fn fit<R: Rng + ?Sized>(
        &self,
        raw: &[f64],
        target: f64,
        min: f64,
        max: f64,
        grid: &Grid,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        let range = grid.tick_range(min, max).ok_or_else(|| {
            DesignError::invalid(format!(
                "no multiple of {} inside [{min}, {max}]",
                grid.resolution()
            ))
        })?;
        let tolerance = self.config.tolerance.unwrap_or(grid.resolution());

        let mut ticks: Vec<i64> = raw
            .iter()
            .map(|&x| grid.quantize_within(x, &range))
            .collect();
        if !is_close(deficit(&ticks, target, grid), tolerance) {
            ticks = self.relax(&ticks, target, min, max, grid, &range);
        }
        self.repair(ticks, target, grid, &range, tolerance, rng)
    }

    fn relax(
        &self,
        ticks: &[i64],
        target: f64,
        min: f64,
        max: f64,
        grid: &Grid,
        range: &RangeInclusive<i64>,
    ) -> Vec<i64> {
        let warm: Vec<f64> = ticks.iter().map(|&t| grid.value(t)).collect();
        let bounds = Bounds::uniform(warm.len(), min, max);
        let relaxed = self
            .minimizer
            .minimize(&MeanObjective::new(target), &warm, &bounds);
        debug!(
            residual = relaxed.value,
            iterations = relaxed.iterations,
            "continuous mean relaxation"
        );
        relaxed
            .x
            .iter()
            .map(|&x| grid.quantize_within(x.clamp(min, max), range))
            .collect()
    }

    fn repair<R: Rng + ?Sized>(
        &self,
        mut ticks: Vec<i64>,
        target: f64,
        grid: &Grid,
        range: &RangeInclusive<i64>,
        tolerance: f64,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        let n = ticks.len();
        let mut total: i64 = ticks.iter().sum();
        let mut d = (grid.value(total) - target * n as f64) / n as f64;
        let mut iterations = 0;

        while self.needs_repair(d, tolerance) {
            if iterations >= self.config.max_repair_iterations {
                warn!(iterations, residual = d, "mean repair hit its iteration cap");
                return Err(DesignError::ConvergenceFailure {
                    sequence: ticks.iter().map(|&t| grid.value(t)).collect(),
                    residual: d,
                    iterations,
                });
            }
            iterations += 1;

            let i = rng.random_range(0..n);
            let step = if d > 0.0 { -1 } else { 1 };
            let nudged = ticks[i] + step;
            if !range.contains(&nudged) {
                continue;
            }
            ticks[i] = nudged;
            total += step;
            d = (grid.value(total) - target * n as f64) / n as f64;
        }

        debug!(iterations, residual = d, "mean repair finished");
        Ok(ticks.into_iter().map(|t| grid.value(t)).collect())
    }

    fn needs_repair(&self, d: f64, tolerance: f64) -> bool {
        if is_close(d, tolerance) {
            return false;
        }
        match self.config.policy {
            RepairPolicy::OvershootOnly => d > 0.0,
            RepairPolicy::Bidirectional => true,
        }
    }
}

fn deficit(ticks: &[i64], target: f64, grid: &Grid) -> f64 {
    let n = ticks.len() as f64;
    (grid.value(ticks.iter().sum()) - target * n) / n
}

fn is_close(d: f64, tolerance: f64) -> bool {
    d.abs() <= tolerance + CLOSE_EPS
}
