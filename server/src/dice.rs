//! Randomness for combat and AI rolls.
//!
//! Every roll in the core goes through a [`Dice`] so a world can be driven
//! by a seeded generator (reproducible runs) or by scripted dice in tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of random rolls
pub trait Dice: Send {
    /// Uniform roll in `[0, 100)`
    fn percent(&mut self) -> f64;

    /// Uniform integer in `[min, max]`. Returns `min` when `max <= min`.
    fn range(&mut self, min: i32, max: i32) -> i32;

    /// `true` with the given probability (clamped to `[0, 1]`)
    fn chance(&mut self, probability: f64) -> bool;

    /// Uniform index into a collection of `len` elements. Returns 0 for an empty collection.
    fn index(&mut self, len: usize) -> usize;
}

/// Seeded game random number generator
#[derive(Debug, Clone)]
pub struct GameRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create a new RNG with a random seed
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Get the seed used to create this RNG
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Dice for GameRng {
    fn percent(&mut self) -> f64 {
        self.rng.gen_range(0.0..100.0)
    }

    fn range(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Dice that always land the same way
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FixedDice {
    pub percent: f64,
    pub chance: bool,
    pub pick_max: bool,
}

#[cfg(test)]
impl FixedDice {
    /// Rolls high: no crits, no dodges, no random triggers, low ends of ranges
    pub fn quiet() -> Self {
        Self {
            percent: 99.9,
            chance: false,
            pick_max: false,
        }
    }

    /// Rolls zero: every percentage check passes, every chance fires
    pub fn lucky() -> Self {
        Self {
            percent: 0.0,
            chance: true,
            pick_max: false,
        }
    }
}

#[cfg(test)]
impl Dice for FixedDice {
    fn percent(&mut self) -> f64 {
        self.percent
    }

    fn range(&mut self, min: i32, max: i32) -> i32 {
        if self.pick_max && max > min {
            max
        } else {
            min
        }
    }

    fn chance(&mut self, _probability: f64) -> bool {
        self.chance
    }

    fn index(&mut self, _len: usize) -> usize {
        0
    }
}
