//! Generators for the temporal structure of randomized stimulus-response
//! designs: the order of stimulus conditions and the inter-trial intervals.

pub mod config;
pub mod fitter;
pub mod iti;
pub mod msequence;
pub mod optimize;
pub mod order;
pub mod rate;
pub mod sampler;

pub use config::{FitterConfig, ItiConfig, MinimizerConfig, RepairPolicy, SolverConfig, UniformTarget};
pub use fitter::{MeanFitter, MeanObjective};
pub use iti::{ItiGenerator, iti, solve_rate};
pub use msequence::MsequenceProvider;
pub use optimize::{Bounds, Minimizer, Minimum, Objective, ProjectedGradient};
pub use order::{OrderGenerator, blocked_order, order};
pub use rate::RateSolver;
pub use sampler::{BoundedSampler, TruncatedExponential, truncated_exponential_mean};

pub use cogex_core::{
    DEFAULT_SEED, DesignError, DistributionModel, DistributionParameters, ItiSequence, OrderType,
    Result, StimulusOrder,
};
