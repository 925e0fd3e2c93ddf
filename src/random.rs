//! Alternative selection
//!
//! A normal template body picks one of its alternatives per evaluation. The
//! choice goes through [`IndexPicker`] so rendering can be made reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chooses an index in `[0, n)`; never called with `n == 0`
pub trait IndexPicker {
    fn pick(&mut self, n: usize) -> usize;
}

/// Uniform choice from `StdRng`
#[derive(Debug, Clone)]
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise
    pub fn with_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl IndexPicker for RandomPicker {
    fn pick(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n.max(1))
    }
}

/// Always the same index, clamped to the last alternative
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPicker(pub usize);

impl IndexPicker for FixedPicker {
    fn pick(&mut self, n: usize) -> usize {
        self.0.min(n.saturating_sub(1))
    }
}

/// Cycles through a list of indexes, each taken modulo `n`
#[derive(Debug, Clone)]
pub struct SequencePicker {
    indexes: Vec<usize>,
    next: usize,
}

impl SequencePicker {
    pub fn new(indexes: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indexes: indexes.into_iter().collect(),
            next: 0,
        }
    }
}

impl IndexPicker for SequencePicker {
    fn pick(&mut self, n: usize) -> usize {
        if self.indexes.is_empty() || n == 0 {
            return 0;
        }
        let index = self.indexes[self.next % self.indexes.len()];
        self.next += 1;
        index % n
    }
}
