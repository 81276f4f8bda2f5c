//! The single seeded random source behind every generated identity and value.
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Longest string the generator will produce.
pub const MAX_STRING_LENGTH: usize = 31;

const ALPHABET_SIZE: usize = 26;

/// A seeded pseudo-random source.
///
/// Every draw made while building or mutating a population goes through one `RandomSource`, so a
/// whole run can be replayed from its seed as long as the sequence of scrapes and turnover cycles
/// is the same.
#[derive(Clone, Debug)]
pub struct RandomSource {
    rng: Xoshiro256PlusPlus,
}

impl RandomSource {
    /// Creates a new `RandomSource` from the given seed.
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: Xoshiro256PlusPlus::seed_from_u64(seed) }
    }

    /// Draws an integer uniformly from `[0, bound)`.
    ///
    /// `bound` must be at least one.
    pub fn below(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0, "bound must be positive");
        self.rng.random_range(0..bound)
    }

    /// Draws a lowercase ASCII letter from the first `count` letters of the alphabet.
    pub fn letter(&mut self, count: usize) -> char {
        char::from(b'a' + self.below(count) as u8)
    }

    /// Draws a random lowercase string between 1 and [`MAX_STRING_LENGTH`] characters long.
    pub fn string(&mut self) -> String {
        let len = self.below(MAX_STRING_LENGTH) + 1;
        (0..len).map(|_| self.letter(ALPHABET_SIZE)).collect()
    }

    /// Draws a value from the standard normal distribution.
    pub fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}
