//! Injected randomness.
//!
//! Everything that rolls dice takes a `&mut dyn RandomSource` so a replay with
//! the same seed produces the same battle.

use crate::fixed::Fixed;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn roll(&mut self) -> Fixed;

    /// `true` with probability `chance` (clamped to [0, 1]).
    fn chance(&mut self, chance: Fixed) -> bool {
        self.roll() < chance.unit()
    }
}

/// Seeded ChaCha8 stream. Portable across platforms and rand versions.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SimRng {
    fn roll(&mut self) -> Fixed {
        Fixed::from_raw(self.inner.gen_range(0..Fixed::SCALE))
    }
}

/// Always returns the same value. For tests that need a specific branch.
#[derive(Debug, Clone, Copy)]
pub struct FixedRoll(pub Fixed);

impl RandomSource for FixedRoll {
    fn roll(&mut self) -> Fixed {
        self.0
    }
}
