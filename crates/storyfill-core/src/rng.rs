//! Random number generator abstraction for determinism.
//!
//! In production, this wraps a real RNG. In tests and replays,
//! a seeded or recorded implementation is injected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;
}

/// Production RNG backed by `StdRng`.
#[derive(Debug, Clone)]
pub struct StdDeterministicRng(StdRng);

impl StdDeterministicRng {
    /// Creates an RNG seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Creates an RNG with a fixed seed, for reproducible games.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl DeterministicRng for StdDeterministicRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        self.0.random_range(min..=max)
    }
}

/// Returns a uniformly drawn index into a collection of `len` items.
///
/// # Panics
///
/// Panics if `len` is zero.
#[allow(clippy::cast_possible_truncation)]
pub fn pick_index(rng: &mut dyn DeterministicRng, len: usize) -> usize {
    assert!(len > 0, "cannot pick from an empty collection");
    let max = (len - 1).min(u32::MAX as usize) as u32;
    // Out-of-range draws from test doubles are clamped.
    (rng.next_u32_range(0, max) as usize).min(len - 1)
}

/// Shuffles `items` in place with a Fisher–Yates pass driven by `rng`.
pub fn shuffle<T>(rng: &mut dyn DeterministicRng, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = pick_index(rng, i + 1);
        items.swap(i, j);
    }
}
