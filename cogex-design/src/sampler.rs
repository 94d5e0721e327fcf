use cogex_core::{DesignError, Result};
use rand::Rng;
use rand::distr::{Distribution, Uniform};

/// Exponential distribution with scale `lam`, shifted to start at `lower`
/// and renormalised onto `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedExponential {
    lam: f64,
    lower: f64,
    upper: f64,
    /// Probability mass of the untruncated exponential inside the support
    mass: f64,
}

impl TruncatedExponential {
    pub fn new(lam: f64, lower: f64, upper: f64) -> Result<Self> {
        if !(lam.is_finite() && lam > 0.0) {
            return Err(DesignError::invalid(format!("lam must be positive, got {lam}")));
        }
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(DesignError::invalid(format!(
                "empty support [{lower}, {upper}]"
            )));
        }
        let b = (upper - lower) / lam;
        Ok(Self {
            lam,
            lower,
            upper,
            mass: -(-b).exp_m1(),
        })
    }

    /// Expected value of the distribution
    pub fn mean(&self) -> f64 {
        truncated_exponential_mean(self.lam, self.lower, self.upper)
    }
}

impl Distribution<f64> for TruncatedExponential {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.random();
        let x = self.lower - self.lam * (-u * self.mass).ln_1p();
        x.min(self.upper)
    }
}

/// Mean of the exponential with scale `lam` truncated to `[lower, upper]`:
/// `lower + lam * (1 - (b + 1) e^-b) / (1 - e^-b)` with `b = (upper - lower) / lam`.
pub fn truncated_exponential_mean(lam: f64, lower: f64, upper: f64) -> f64 {
    let b = (upper - lower) / lam;
    let tail = (-b).exp();
    let mass = -(-b).exp_m1();
    lower + lam * (mass - b * tail) / mass
}

/// Raw, unquantised ITI draws from one of the bounded models
#[derive(Debug, Clone)]
pub enum BoundedSampler {
    Uniform(Uniform<f64>),
    TruncatedExponential(TruncatedExponential),
}

impl BoundedSampler {
    pub fn uniform(min: f64, max: f64) -> Result<Self> {
        Uniform::new_inclusive(min, max)
            .map(BoundedSampler::Uniform)
            .map_err(|err| DesignError::invalid(format!("uniform on [{min}, {max}]: {err}")))
    }

    pub fn truncated_exponential(lam: f64, min: f64, max: f64) -> Result<Self> {
        TruncatedExponential::new(lam, min, max).map(BoundedSampler::TruncatedExponential)
    }

    pub fn draw<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

impl Distribution<f64> for BoundedSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            BoundedSampler::Uniform(dist) => dist.sample(rng),
            BoundedSampler::TruncatedExponential(dist) => dist.sample(rng),
        }
    }
}
