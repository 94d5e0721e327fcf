pub mod error;
pub mod iti;
pub mod order;

pub use error::{DesignError, Result};
pub use iti::{DistributionModel, DistributionParameters, ItiSequence};
pub use order::{OrderType, StimulusOrder};

/// Seed used by every generator when the caller does not pick one
pub const DEFAULT_SEED: u64 = 1234;
