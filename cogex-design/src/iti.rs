use crate::config::{ItiConfig, UniformTarget};
use crate::fitter::MeanFitter;
use crate::optimize::{Minimizer, ProjectedGradient};
use crate::rate::RateSolver;
use crate::sampler::BoundedSampler;
use cogex_core::{DesignError, DistributionModel, DistributionParameters, ItiSequence, Result};
use cogex_timing::Grid;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

/// Draws inter-trial-interval sequences.
///
/// The leading entry is always 0; every other entry lies in `[min, max]`
/// and sits on the resolution grid. The returned `lam` can be passed back
/// through [`DistributionParameters::with_lam`] to skip the solve on
/// repeated exponential draws.
#[derive(Debug, Clone)]
pub struct ItiGenerator<M = ProjectedGradient> {
    uniform_target: UniformTarget,
    solver: RateSolver<M>,
    fitter: MeanFitter<M>,
}

impl Default for ItiGenerator {
    fn default() -> Self {
        Self::new(ItiConfig::default())
    }
}

impl ItiGenerator {
    pub fn new(config: ItiConfig) -> Self {
        let minimizer = ProjectedGradient::new(config.minimizer.clone());
        Self::with_minimizer(config, minimizer)
    }
}

impl<M: Minimizer + Clone> ItiGenerator<M> {
    pub fn with_minimizer(config: ItiConfig, minimizer: M) -> Self {
        Self {
            uniform_target: config.uniform_target,
            solver: RateSolver::new(config.solver, minimizer.clone()),
            fitter: MeanFitter::new(config.fitter, minimizer),
        }
    }
}

impl<M: Minimizer> ItiGenerator<M> {
    pub fn iti(
        &self,
        ntrials: usize,
        params: &DistributionParameters,
        seed: u64,
    ) -> Result<(ItiSequence, Option<f64>)> {
        if ntrials == 0 {
            return Err(DesignError::invalid("ntrials must be positive"));
        }
        params.validate()?;
        let grid = Grid::new(params.resolution).ok_or_else(|| {
            DesignError::invalid(format!("resolution must be positive, got {}", params.resolution))
        })?;
        let n = ntrials - 1;

        let (delays, lam) = match params.model {
            DistributionModel::Fixed => {
                let mean = params.require_mean()?;
                (vec![grid.quantize(mean); n], params.lam)
            }
            DistributionModel::Uniform => {
                let (min, max) = params.require_bounds()?;
                let target = match self.uniform_target {
                    UniformTarget::Midpoint => (min + max) / 2.0,
                    UniformTarget::RequestedMean => params.require_mean()?,
                };
                let sampler = BoundedSampler::uniform(min, max)?;
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let raw = sampler.draw(n, &mut rng);
                log_raw_draw(&raw, target, min, max);
                (self.fit(&raw, target, min, max, &grid, &mut rng)?, params.lam)
            }
            DistributionModel::Exponential => {
                let (min, max) = params.require_bounds()?;
                let mean = params.require_mean()?;
                let lam = match params.lam {
                    Some(lam) => lam,
                    None => self.solver.solve(min, max, mean)?,
                };
                let sampler = BoundedSampler::truncated_exponential(lam, min, max)?;
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let raw = sampler.draw(n, &mut rng);
                log_raw_draw(&raw, mean, min, max);
                (self.fit(&raw, mean, min, max, &grid, &mut rng)?, Some(lam))
            }
        };

        let sequence = ItiSequence::from_delays(delays);
        info!(
            model = %params.model,
            ntrials,
            mean = sequence.mean(),
            total = sequence.total(),
            lam,
            "generated ITI sequence"
        );
        Ok((sequence, lam))
    }

    fn fit(
        &self,
        raw: &[f64],
        target: f64,
        min: f64,
        max: f64,
        grid: &Grid,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<f64>> {
        self.fitter
            .fit(raw, target, min, max, grid, rng)
            .map_err(|err| match err {
                DesignError::ConvergenceFailure {
                    sequence,
                    residual,
                    iterations,
                } => DesignError::ConvergenceFailure {
                    sequence: ItiSequence::from_delays(sequence).into_inner(),
                    residual,
                    iterations,
                },
                other => other,
            })
    }
}

fn log_raw_draw(raw: &[f64], target: f64, min: f64, max: f64) {
    if !(min..=max).contains(&target) {
        warn!(fit_target = target, min, max, "fitting target lies outside the bounds");
    }
    if raw.is_empty() {
        return;
    }
    let mean = raw.iter().sum::<f64>() / raw.len() as f64;
    let lowest = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    debug!(n = raw.len(), mean, lowest, highest, fit_target = target, "raw ITI draw");
}

/// [`ItiGenerator::iti`] with the default configuration
pub fn iti(
    ntrials: usize,
    params: &DistributionParameters,
    seed: u64,
) -> Result<(ItiSequence, Option<f64>)> {
    ItiGenerator::default().iti(ntrials, params, seed)
}

/// [`RateSolver::solve`] with the default configuration
pub fn solve_rate(min: f64, max: f64, mean: f64) -> Result<f64> {
    RateSolver::default().solve(min, max, mean)
}
