use crate::msequence::MsequenceProvider;
use cogex_core::{DesignError, OrderType, Result, StimulusOrder};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use tracing::debug;

/// Largest block size the blocked scheme draws
pub const MAX_BLOCK_SIZE: usize = 9;

const PROBABILITY_SUM_EPS: f64 = 1e-6;

/// Generates stimulus-condition sequences. Each call reseeds from the
/// given seed, so identical arguments always give identical orders.
#[derive(Default)]
pub struct OrderGenerator {
    msequence: Option<Box<dyn MsequenceProvider>>,
}

impl fmt::Debug for OrderGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderGenerator")
            .field("msequence", &self.msequence.is_some())
            .finish()
    }
}

impl OrderGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_msequence<P: MsequenceProvider + 'static>(mut self, provider: P) -> Self {
        self.msequence = Some(Box::new(provider));
        self
    }

    pub fn order(
        &self,
        nstim: usize,
        ntrials: usize,
        probabilities: &[f64],
        ordertype: OrderType,
        seed: u64,
    ) -> Result<StimulusOrder> {
        validate(nstim, ntrials, probabilities)?;
        let order = match ordertype {
            OrderType::Random => random_order(ntrials, probabilities, seed)?,
            OrderType::Blocked => blocked_order(ntrials, probabilities, seed)?.0,
            OrderType::Msequence => self.msequence_order(nstim, ntrials, seed)?,
        };
        debug!(%ordertype, nstim, ntrials, seed, "generated stimulus order");
        Ok(order)
    }

    fn msequence_order(&self, nstim: usize, ntrials: usize, seed: u64) -> Result<StimulusOrder> {
        let provider = self.msequence.as_ref().ok_or_else(|| {
            DesignError::invalid("msequence ordering needs an m-sequence provider")
        })?;
        let candidates = provider.generate(ntrials, nstim, seed)?;
        if candidates.is_empty() {
            return Err(DesignError::invalid(format!(
                "m-sequence provider returned no orders for {ntrials} trials over {nstim} stimuli"
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pick = rng.random_range(0..candidates.len());
        let mut labels = candidates[pick].clone();
        if labels.len() < ntrials {
            return Err(DesignError::invalid(format!(
                "m-sequence candidate has {} trials, {ntrials} requested",
                labels.len()
            )));
        }
        labels.truncate(ntrials);
        if let Some(bad) = labels.iter().find(|&&l| l >= nstim) {
            return Err(DesignError::invalid(format!(
                "m-sequence candidate contains stimulus {bad}, only {nstim} exist"
            )));
        }
        Ok(StimulusOrder::new(labels))
    }
}

fn validate(nstim: usize, ntrials: usize, probabilities: &[f64]) -> Result<()> {
    if nstim == 0 {
        return Err(DesignError::invalid("nstim must be positive"));
    }
    if ntrials == 0 {
        return Err(DesignError::invalid("ntrials must be positive"));
    }
    if probabilities.len() != nstim {
        return Err(DesignError::invalid(format!(
            "{} probabilities given for {nstim} stimuli",
            probabilities.len()
        )));
    }
    if let Some(p) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(DesignError::invalid(format!("invalid probability {p}")));
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_EPS {
        return Err(DesignError::invalid(format!(
            "probabilities sum to {sum}, expected 1"
        )));
    }
    Ok(())
}

/// One categorical draw per label; a one-hot multinomial sample reduced to its index
fn draw_labels<R: Rng + ?Sized>(n: usize, probabilities: &[f64], rng: &mut R) -> Result<Vec<usize>> {
    let dist = WeightedIndex::new(probabilities)
        .map_err(|err| DesignError::invalid(format!("bad probabilities: {err}")))?;
    Ok((0..n).map(|_| dist.sample(rng)).collect())
}

fn random_order(ntrials: usize, probabilities: &[f64], seed: u64) -> Result<StimulusOrder> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    draw_labels(ntrials, probabilities, &mut rng).map(StimulusOrder::new)
}

/// Blocked order together with the block size that was drawn; the order
/// equals what [`order`] returns for [`OrderType::Blocked`]
pub fn blocked_order(
    ntrials: usize,
    probabilities: &[f64],
    seed: u64,
) -> Result<(StimulusOrder, usize)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let block_size = rng.random_range(1..=MAX_BLOCK_SIZE);
    let nblocks = ntrials.div_ceil(block_size);

    // Labels come from a freshly seeded stream, not the one that picked the size.
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let labels = draw_labels(nblocks, probabilities, &mut rng)?
        .into_iter()
        .flat_map(|label| std::iter::repeat(label).take(block_size))
        .take(ntrials)
        .collect();
    Ok((StimulusOrder::new(labels), block_size))
}

/// [`OrderGenerator::order`] without an m-sequence provider
pub fn order(
    nstim: usize,
    ntrials: usize,
    probabilities: &[f64],
    ordertype: OrderType,
    seed: u64,
) -> Result<StimulusOrder> {
    OrderGenerator::new().order(nstim, ntrials, probabilities, ordertype, seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVEN3: [f64; 3] = [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];

    #[test]
    fn random_order_has_requested_length_and_labels() {
        for seed in 0..20 {
            let order = order(3, 57, &EVEN3, OrderType::Random, seed).unwrap();
            assert_eq!(order.len(), 57);
            assert!(order.as_slice().iter().all(|&l| l < 3));
        }
    }

    #[test]
    fn random_order_is_reproducible() {
        let a = order(3, 40, &EVEN3, OrderType::Random, 99).unwrap();
        let b = order(3, 40, &EVEN3, OrderType::Random, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_probability_condition_never_appears() {
        let order = order(3, 200, &[0.5, 0.0, 0.5], OrderType::Random, 3).unwrap();
        assert_eq!(order.counts(3)[1], 0);
    }

    const SKEWED: [f64; 3] = [0.7, 0.2, 0.1];

    fn assert_frequencies(labels: &[usize], tolerance: f64) {
        let order = StimulusOrder::new(labels.to_vec());
        for (label, (&count, &p)) in order.counts(3).iter().zip(&SKEWED).enumerate() {
            let freq = count as f64 / labels.len() as f64;
            assert!((freq - p).abs() < tolerance, "label {label}: {freq} vs {p}");
        }
    }

    #[test]
    fn random_frequencies_track_probabilities() {
        let order = order(3, 5000, &SKEWED, OrderType::Random, 21).unwrap();
        assert_frequencies(order.as_slice(), 0.03);
    }

    #[test]
    fn block_labels_track_probabilities() {
        let (order, block_size) = blocked_order(9000, &SKEWED, 21).unwrap();
        let block_labels: Vec<usize> = order.as_slice().iter().step_by(block_size).copied().collect();
        assert!(block_labels.len() >= 1000);
        assert_frequencies(&block_labels, 0.05);
    }

    #[test]
    fn blocked_runs_are_whole_blocks() {
        for seed in 0..30 {
            let (order, block_size) = blocked_order(50, &EVEN3, seed).unwrap();
            assert!((1..=MAX_BLOCK_SIZE).contains(&block_size));
            assert_eq!(order.len(), 50);
            // Adjacent blocks may share a label, so runs are multiples of the block size.
            let runs = order.runs();
            let (last, body) = runs.split_last().unwrap();
            for &(_, len) in body {
                assert_eq!(len % block_size, 0, "seed {seed}: run {len}, block {block_size}");
            }
            let tail = 50 % block_size;
            if tail == 0 {
                assert_eq!(last.1 % block_size, 0);
            } else {
                assert_eq!(last.1 % block_size, tail);
            }
        }
    }

    #[test]
    fn rejects_mismatched_probabilities() {
        let err = order(3, 10, &[0.5, 0.5], OrderType::Random, 1).unwrap_err();
        assert!(matches!(err, DesignError::InvalidArgument(_)));
        let err = order(2, 10, &[0.7, 0.7], OrderType::Blocked, 1).unwrap_err();
        assert!(matches!(err, DesignError::InvalidArgument(_)));
        let err = order(2, 10, &[1.5, -0.5], OrderType::Random, 1).unwrap_err();
        assert!(matches!(err, DesignError::InvalidArgument(_)));
    }

    #[test]
    fn msequence_without_provider_is_invalid() {
        let err = order(2, 10, &[0.5, 0.5], OrderType::Msequence, 1).unwrap_err();
        assert!(matches!(err, DesignError::InvalidArgument(ref m) if m.contains("provider")));
    }

    #[test]
    fn msequence_picks_one_of_the_candidates() {
        let candidates = vec![vec![0, 1, 1, 0, 1, 0], vec![1, 0, 0, 1, 0, 1], vec![0, 0, 1, 1, 0, 1]];
        let provided = candidates.clone();
        let generator = OrderGenerator::new()
            .with_msequence(move |_: usize, _: usize, _: u64| -> Result<Vec<Vec<usize>>> {
                Ok(provided.clone())
            });
        let picked = generator
            .order(2, 6, &[0.5, 0.5], OrderType::Msequence, 1234)
            .unwrap();
        assert!(candidates.contains(&picked.into_inner()));
    }

    #[test]
    fn msequence_rejects_out_of_alphabet_labels() {
        let generator = OrderGenerator::new().with_msequence(
            |_: usize, _: usize, _: u64| -> Result<Vec<Vec<usize>>> { Ok(vec![vec![0, 3, 1]]) },
        );
        let err = generator
            .order(2, 3, &[0.5, 0.5], OrderType::Msequence, 1)
            .unwrap_err();
        assert!(matches!(err, DesignError::InvalidArgument(_)));
    }
}
