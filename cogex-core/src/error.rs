use thiserror::Error;

pub type Result<T> = std::result::Result<T, DesignError>;

/// Failures of a single order or ITI generation call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DesignError {
    /// Unknown mode, missing parameter for the chosen model, or malformed input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The solved truncated exponential does not reproduce the requested mean
    #[error(
        "can't compute lambda for truncated exponential on [{min}, {max}] with mean {mean} (best candidate {lam})"
    )]
    SolverDivergence {
        min: f64,
        max: f64,
        mean: f64,
        lam: f64,
    },

    /// The discrete repair loop ran out of iterations before reaching the target mean
    #[error("mean repair gave up after {iterations} iterations, residual {residual}")]
    ConvergenceFailure {
        /// Best-effort sequence at the time the loop stopped
        sequence: Vec<f64>,
        /// Per-element mean deficit `mean(sequence) - target`
        residual: f64,
        iterations: usize,
    },
}

impl DesignError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        DesignError::InvalidArgument(msg.into())
    }
}
