use cogex_core::Result;

/// Source of balanced m-sequence stimulus orders.
///
/// Implementations construct maximal-length sequences of `length` trials
/// over `alphabet_size` conditions and return every candidate order they
/// found; the order generator picks one of them with the caller's seed.
pub trait MsequenceProvider: Send + Sync {
    fn generate(&self, length: usize, alphabet_size: usize, seed: u64) -> Result<Vec<Vec<usize>>>;
}

impl<F> MsequenceProvider for F
where
    F: Fn(usize, usize, u64) -> Result<Vec<Vec<usize>>> + Send + Sync,
{
    fn generate(&self, length: usize, alphabet_size: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
        self(length, alphabet_size, seed)
    }
}
