//! # Level Seeds
//!
//! ## Determinism Guarantee
//!
//! Given the same `LevelSeed`, the generator produces **exactly** the same
//! grid on any platform. Independent random streams (retry attempts,
//! tile population) are derived from one seed instead of sharing an RNG.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Stream id for tile population, kept apart from placement streams.
pub const POPULATE_STREAM: u64 = 0x504F_5055_4C41_5445;

/// Seed for deterministic level generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelSeed(u64);

impl LevelSeed {
    /// Creates a new level seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (retry attempt, run, population).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        // FNV-1a style mixing
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }

    /// Creates the RNG for this seed.
    #[must_use]
    pub fn rng(self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }
}

impl Default for LevelSeed {
    fn default() -> Self {
        Self(0x5EED_CAFE_0BAD_F00D)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_derive_is_stable() {
        let seed = LevelSeed::new(42);
        assert_eq!(seed.derive(1), seed.derive(1));
        assert_ne!(seed.derive(1), seed.derive(2));
        assert_ne!(seed.derive(1), seed);
    }

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = LevelSeed::new(7).rng();
        let mut b = LevelSeed::new(7).rng();
        for _ in 0..16 {
            assert_eq!(a.gen::<u64>(), b.gen::<u64>());
        }
    }
}
