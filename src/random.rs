use std::collections::VecDeque;

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Randomness used for budget draws, the plea gamble and message picks.
pub trait RandomSource: Send {
    /// Uniform draw from the inclusive range `[low, high]`. Callers guarantee
    /// `low <= high`.
    fn between(&mut self, low: u32, high: u32) -> u32;

    /// Uniform index into a collection of `len` items. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;
}

pub struct SystemRandom {
    rng: StdRng,
}

impl SystemRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn between(&mut self, low: u32, high: u32) -> u32 {
        self.rng.gen_range(low..=high)
    }

    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed script of draws. Each `between` consumes one value and
/// clamps it into the requested range; each `index` consumes one value modulo
/// `len`. When the script runs out every draw yields the low end.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRandom {
    draws: VecDeque<u32>,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = u32>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
        }
    }

    pub fn push(&mut self, draw: u32) {
        self.draws.push_back(draw);
    }
}

impl RandomSource for ScriptedRandom {
    fn between(&mut self, low: u32, high: u32) -> u32 {
        self.draws.pop_front().unwrap_or(low).clamp(low, high)
    }

    fn index(&mut self, len: usize) -> usize {
        self.draws.pop_front().unwrap_or(0) as usize % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_random_clamps_and_falls_back_low() {
        let mut random = ScriptedRandom::new([100, 0, 7]);
        assert_eq!(random.between(5, 10), 10);
        assert_eq!(random.between(5, 10), 5);
        assert_eq!(random.index(3), 1);
        assert_eq!(random.between(2, 9), 2);
        assert_eq!(random.index(4), 0);
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let mut a = SystemRandom::seeded(42);
        let mut b = SystemRandom::seeded(42);
        let left: Vec<u32> = (0..16).map(|_| a.between(1, 1_000)).collect();
        let right: Vec<u32> = (0..16).map(|_| b.between(1, 1_000)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_degenerate_range_always_returns_bound() {
        let mut random = SystemRandom::seeded(7);
        for _ in 0..32 {
            assert_eq!(random.between(5, 5), 5);
        }
    }
}
