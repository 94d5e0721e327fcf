use cogex_core::{DesignError, Result};
use serde::{Deserialize, Serialize};

/// Fitting target of the uniform model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniformTarget {
    /// Pull toward `(min + max) / 2`, ignoring any supplied mean
    #[default]
    Midpoint,
    /// Pull toward the caller's `mean`, which becomes required
    RequestedMean,
}

/// Which side of the target the discrete repair loop corrects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairPolicy {
    /// Only lower a mean that sits above the target; undershoot is left alone
    #[default]
    OvershootOnly,
    /// Nudge toward the target from either side
    Bidirectional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizerConfig {
    pub max_iterations: usize,
    pub max_backtracks: usize,
    pub initial_step: f64,
    /// Stop once the objective is at or below this value
    pub f_target: f64,
    /// Stop when an accepted step improves the objective by less than this, relatively
    pub ftol: f64,
    /// Stop when the largest projected-gradient component falls below this
    pub gtol: f64,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_backtracks: 60,
            initial_step: 1.0,
            f_target: 1e-12,
            ftol: 1e-12,
            gtol: 1e-10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub initial_lam: f64,
    pub lam_bounds: (f64, f64),
    /// Size of the synthetic sample that checks a solved `lam`
    pub validation_draws: usize,
    pub validation_seed: u64,
    /// Allowed relative gap between the synthetic mean and the requested mean
    pub rel_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_lam: 50.0,
            lam_bounds: (1e-9, 100.0),
            validation_draws: 100_000,
            validation_seed: 1000,
            rel_tolerance: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    pub policy: RepairPolicy,
    /// Accepted `|mean - target|`; one resolution unit when unset
    pub tolerance: Option<f64>,
    /// Random picks the repair loop may make before giving up
    pub max_repair_iterations: usize,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            policy: RepairPolicy::OvershootOnly,
            tolerance: None,
            max_repair_iterations: 100_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItiConfig {
    pub uniform_target: UniformTarget,
    pub fitter: FitterConfig,
    pub solver: SolverConfig,
    pub minimizer: MinimizerConfig,
}

impl ItiConfig {
    /// Parses a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| DesignError::invalid(format!("bad ITI configuration: {err}")))
    }
}
