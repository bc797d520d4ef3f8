//! Deterministic seeded randomness owned by each maze instance.
//!
//! The stream is an explicit value threaded through generator and placement
//! calls, never a process-wide singleton, so multiple mazes can be generated
//! concurrently with independent determinism.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic pseudo-random stream with a settable, resettable seed.
#[derive(Clone, Debug)]
pub struct SeededRng {
    seed: u64,
    stream: ChaCha8Rng,
}

impl SeededRng {
    /// Creates a stream seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            stream: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The seed the stream was last (re)initialized with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Replaces the seed and restarts the stream from it.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.stream = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Restarts the stream from the current seed.
    pub fn reset(&mut self) {
        self.stream = ChaCha8Rng::seed_from_u64(self.seed);
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.stream.gen::<f64>()
    }

    /// Uniform index draw in `[0, len)`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index draw requires a non-empty range");
        self.stream.gen_range(0..len)
    }

    /// Bernoulli draw that succeeds with the provided probability.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.unit() < probability
    }

    /// Uniformly picks one element of `items`, if any.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            let index = self.index(items.len());
            items.get(index)
        }
    }
}
