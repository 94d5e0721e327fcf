use crate::config::SolverConfig;
use crate::optimize::{Bounds, Minimizer, ProjectedGradient};
use crate::sampler::{BoundedSampler, truncated_exponential_mean};
use cogex_core::{DesignError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// Solves the scale `lam` of a truncated exponential on `[min, max]` whose
/// mean equals a requested value.
///
/// The candidate is accepted only if a synthetic sample drawn at that scale
/// reproduces the requested mean within `rel_tolerance`. Means at or above
/// the midpoint of the bounds are unreachable and fail validation.
#[derive(Debug, Clone)]
pub struct RateSolver<M = ProjectedGradient> {
    config: SolverConfig,
    minimizer: M,
}

impl Default for RateSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default(), ProjectedGradient::default())
    }
}

impl<M: Minimizer> RateSolver<M> {
    pub fn new(config: SolverConfig, minimizer: M) -> Self {
        Self { config, minimizer }
    }

    pub fn solve(&self, min: f64, max: f64, mean: f64) -> Result<f64> {
        if !(min.is_finite() && max.is_finite() && mean.is_finite()) {
            return Err(DesignError::invalid(format!(
                "non-finite bounds or mean: min={min}, max={max}, mean={mean}"
            )));
        }
        if min >= max {
            return Err(DesignError::invalid(format!(
                "min ({min}) must be smaller than max ({max})"
            )));
        }

        let (lo, hi) = self.config.lam_bounds;
        let bounds = Bounds::new(vec![lo], vec![hi])
            .ok_or_else(|| DesignError::invalid(format!("empty lam bounds ({lo}, {hi})")))?;
        let objective = |x: &[f64]| (truncated_exponential_mean(x[0], min, max) - mean).abs();
        let result = self
            .minimizer
            .minimize(&objective, &[self.config.initial_lam], &bounds);
        let lam = result.x[0];
        debug!(
            lam,
            residual = result.value,
            iterations = result.iterations,
            converged = result.converged,
            "minimised truncated exponential mean gap"
        );

        let empirical = self.synthetic_mean(lam, min, max)?;
        if (empirical - mean).abs() <= 1e-8 + self.config.rel_tolerance * mean.abs() {
            Ok(lam)
        } else {
            warn!(min, max, mean, lam, empirical, "lam failed validation");
            Err(DesignError::SolverDivergence { min, max, mean, lam })
        }
    }

    fn synthetic_mean(&self, lam: f64, min: f64, max: f64) -> Result<f64> {
        let n = self.config.validation_draws.max(1);
        let sampler = BoundedSampler::truncated_exponential(lam, min, max)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.validation_seed);
        Ok(sampler.draw(n, &mut rng).iter().sum::<f64>() / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solved_lam_reproduces_requested_mean() {
        let solver = RateSolver::default();
        let lam = solver.solve(0.5, 8.0, 3.0).unwrap();
        assert!(lam > 0.0 && lam <= 100.0);
        let theoretical = truncated_exponential_mean(lam, 0.5, 8.0);
        assert!((theoretical - 3.0).abs() < 1e-3, "{theoretical}");
    }

    #[test]
    fn mean_above_max_diverges() {
        let err = RateSolver::default().solve(0.5, 8.0, 10.0).unwrap_err();
        match err {
            DesignError::SolverDivergence { min, max, mean, lam } => {
                assert_eq!((min, max, mean), (0.5, 8.0, 10.0));
                assert!(lam > 0.0 && lam <= 100.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mean_below_min_diverges() {
        let err = RateSolver::default().solve(2.0, 6.0, 1.0).unwrap_err();
        assert!(matches!(err, DesignError::SolverDivergence { .. }));
    }

    #[test]
    fn mean_above_midpoint_diverges() {
        let err = RateSolver::default().solve(1.0, 3.0, 2.8).unwrap_err();
        assert!(matches!(err, DesignError::SolverDivergence { .. }));
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        let err = RateSolver::default().solve(5.0, 1.0, 3.0).unwrap_err();
        assert!(matches!(err, DesignError::InvalidArgument(_)));
    }
}
