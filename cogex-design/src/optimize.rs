//! Box-constrained minimisation used by the rate solver and the mean fitter.

use crate::config::MinimizerConfig;

/// Sufficient-decrease constant of the Armijo line search
const ARMIJO: f64 = 1e-4;

/// Per-coordinate box `[lower[i], upper[i]]`
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Returns `None` on length mismatch or an empty interval
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Option<Self> {
        let ok = lower.len() == upper.len() && lower.iter().zip(&upper).all(|(lo, hi)| lo <= hi);
        ok.then_some(Self { lower, upper })
    }

    /// The same interval on each of `n` coordinates
    pub fn uniform(n: usize, lower: f64, upper: f64) -> Self {
        Self {
            lower: vec![lower; n],
            upper: vec![upper; n],
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn clamp(&self, i: usize, v: f64) -> f64 {
        v.clamp(self.lower[i], self.upper[i])
    }

    pub fn project(&self, x: &mut [f64]) {
        for (i, v) in x.iter_mut().enumerate() {
            *v = self.clamp(i, *v);
        }
    }
}

pub trait Objective {
    fn value(&self, x: &[f64]) -> f64;

    /// Writes the gradient at `x` into `grad`. Defaults to finite differences.
    fn gradient(&self, x: &[f64], bounds: &Bounds, grad: &mut [f64]) {
        finite_difference(self, x, bounds, grad);
    }
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64,
{
    fn value(&self, x: &[f64]) -> f64 {
        self(x)
    }
}

/// Central differences, one-sided where a probe would leave the box
pub fn finite_difference<O: Objective + ?Sized>(
    objective: &O,
    x: &[f64],
    bounds: &Bounds,
    grad: &mut [f64],
) {
    let mut probe = x.to_vec();
    for i in 0..x.len() {
        let h = 1e-7 * x[i].abs().max(1.0);
        let up = bounds.clamp(i, x[i] + h);
        let down = bounds.clamp(i, x[i] - h);
        if up == down {
            grad[i] = 0.0;
            continue;
        }
        probe[i] = up;
        let f_up = objective.value(&probe);
        probe[i] = down;
        let f_down = objective.value(&probe);
        probe[i] = x[i];
        grad[i] = (f_up - f_down) / (up - down);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Anything able to minimise an objective over a box
pub trait Minimizer {
    fn minimize(&self, objective: &dyn Objective, initial: &[f64], bounds: &Bounds) -> Minimum;
}

/// Projected steepest descent with a backtracking Armijo line search.
///
/// The trial step doubles after every accepted step and halves on every
/// rejected one, so the step length adapts to badly scaled objectives
/// (the truncated exponential mean is nearly flat for large `lam`).
#[derive(Debug, Clone, Default)]
pub struct ProjectedGradient {
    config: MinimizerConfig,
}

impl ProjectedGradient {
    pub fn new(config: MinimizerConfig) -> Self {
        Self { config }
    }
}

impl Minimizer for ProjectedGradient {
    fn minimize(&self, objective: &dyn Objective, initial: &[f64], bounds: &Bounds) -> Minimum {
        let cfg = &self.config;
        let mut x = initial.to_vec();
        bounds.project(&mut x);
        let mut fx = objective.value(&x);
        let mut grad = vec![0.0; x.len()];
        let mut trial = vec![0.0; x.len()];
        let mut step = cfg.initial_step;

        for iteration in 0..cfg.max_iterations {
            if fx <= cfg.f_target {
                return Minimum { x, value: fx, iterations: iteration, converged: true };
            }

            objective.gradient(&x, bounds, &mut grad);
            let pg = x
                .iter()
                .zip(&grad)
                .enumerate()
                .map(|(i, (xi, gi))| (xi - bounds.clamp(i, xi - gi)).abs())
                .fold(0.0, f64::max);
            if pg <= cfg.gtol {
                return Minimum { x, value: fx, iterations: iteration, converged: true };
            }

            let mut accepted = None;
            for _ in 0..cfg.max_backtracks {
                for i in 0..x.len() {
                    trial[i] = bounds.clamp(i, x[i] - step * grad[i]);
                }
                let predicted: f64 = grad
                    .iter()
                    .zip(x.iter().zip(&trial))
                    .map(|(g, (xi, ti))| g * (xi - ti))
                    .sum();
                let f_trial = objective.value(&trial);
                if f_trial < fx && f_trial <= fx - ARMIJO * predicted {
                    accepted = Some(f_trial);
                    break;
                }
                step *= 0.5;
            }

            // No descent along the projected gradient: a kink or a bound-pinned optimum.
            let Some(f_new) = accepted else {
                return Minimum { x, value: fx, iterations: iteration + 1, converged: true };
            };

            std::mem::swap(&mut x, &mut trial);
            let decrease = fx - f_new;
            let scale = fx.abs().max(f_new.abs()).max(1.0);
            fx = f_new;
            if decrease <= cfg.ftol * scale {
                return Minimum { x, value: fx, iterations: iteration + 1, converged: true };
            }
            step *= 2.0;
        }

        Minimum {
            x,
            value: fx,
            iterations: cfg.max_iterations,
            converged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimizer() -> ProjectedGradient {
        ProjectedGradient::default()
    }

    #[test]
    fn finds_interior_minimum_of_quadratic() {
        let objective = |x: &[f64]| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2);
        let bounds = Bounds::uniform(2, -10.0, 10.0);
        let min = minimizer().minimize(&objective, &[0.0, 0.0], &bounds);
        assert!(min.converged);
        assert!((min.x[0] - 3.0).abs() < 1e-4, "{:?}", min.x);
        assert!((min.x[1] + 1.0).abs() < 1e-4, "{:?}", min.x);
    }

    #[test]
    fn stops_on_active_bound() {
        let objective = |x: &[f64]| (x[0] - 5.0).powi(2);
        let bounds = Bounds::new(vec![0.0], vec![2.0]).unwrap();
        let min = minimizer().minimize(&objective, &[1.0], &bounds);
        assert!((min.x[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn projects_infeasible_start() {
        let objective = |x: &[f64]| x[0].abs();
        let bounds = Bounds::new(vec![1.0], vec![4.0]).unwrap();
        let min = minimizer().minimize(&objective, &[-7.0], &bounds);
        assert!((min.x[0] - 1.0).abs() < 1e-9);
        assert!((min.value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn handles_flat_start_on_badly_scaled_objective() {
        // Gradient near the start is ~1e-4; the optimum is far away.
        let objective = |x: &[f64]| (1e-4 * x[0] - 0.5).abs();
        let bounds = Bounds::new(vec![0.0], vec![1e5]).unwrap();
        let min = minimizer().minimize(&objective, &[0.0], &bounds);
        assert!((min.x[0] - 5000.0).abs() < 1.0, "{:?}", min);
    }

    #[test]
    fn finite_difference_is_one_sided_at_bounds() {
        let objective = |x: &[f64]| 2.0 * x[0];
        let bounds = Bounds::new(vec![0.0], vec![1.0]).unwrap();
        let mut grad = [0.0];
        finite_difference(&objective, &[0.0], &bounds, &mut grad);
        assert!((grad[0] - 2.0).abs() < 1e-6);
        finite_difference(&objective, &[1.0], &bounds, &mut grad);
        assert!((grad[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_malformed_bounds() {
        assert!(Bounds::new(vec![0.0, 1.0], vec![1.0]).is_none());
        assert!(Bounds::new(vec![2.0], vec![1.0]).is_none());
    }
}
