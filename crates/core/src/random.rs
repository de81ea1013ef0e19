//! Random draws for the swarm.
//!
//! Every randomized decision in the simulation (volley rolls, dive picks,
//! spawn sides, landing jitter) goes through [`RandomSource`], which callers
//! inject. The simulation driver uses [`SeededRandom`] so a wave replays
//! identically from the same seed and the same sequence of `dt` values.

use serde::{Deserialize, Serialize};

/// Source of uniform random draws.
pub trait RandomSource {
    /// Returns a float in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    /// Returns a float in `[min, max)`.
    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    /// Returns true with the given probability.
    fn chance(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    /// Returns an index in `0..len`, or `None` for an empty range.
    fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let i = (self.next_f32() * len as f32) as usize;
        Some(i.min(len - 1))
    }

    /// Picks an index with probability proportional to its weight.
    /// Returns `None` when no weight is positive.
    fn weighted(&mut self, weights: &[f32]) -> Option<usize> {
        let total: f32 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }

        let mut roll = self.next_f32() * total;
        let mut last = None;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            if roll < w {
                return Some(i);
            }
            roll -= w;
            last = Some(i);
        }
        // Float rounding can leave a sliver past the last bucket.
        last
    }
}

/// Deterministic seeded generator (xorshift32).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeededRandom {
    state: u32,
}

impl SeededRandom {
    /// Seed of 0 is treated as 1; xorshift never leaves the zero state.
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Current internal state.
    pub fn seed(&self) -> u32 {
        self.state
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RandomSource for SeededRandom {
    fn next_f32(&mut self) -> f32 {
        // Top 24 bits fit the f32 mantissa exactly, so the result stays below 1.
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}

/// Replays a fixed list of draws in a loop.
///
/// Lets tests pin down exactly which entity dives, which side a spawn uses,
/// or whether a volley roll succeeds.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f32>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(values: impl Into<Vec<f32>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// A source that always returns the same draw.
    pub fn constant(value: f32) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f32(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v.clamp(0.0, 0.999_999)
    }
}
