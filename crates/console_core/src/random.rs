//! Injectable random sources for ride fabrication and outcome draws.
//!
//! Production uses seeded [StdRng] streams; tests script exact draws with [ScriptedRandom].

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource: Send + Sync + std::fmt::Debug {
    fn next_unit(&mut self) -> f64;

    /// `true` with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }

    /// Uniform index into a collection of `len` items (`len` must be non-zero).
    fn index(&mut self, len: usize) -> usize {
        let idx = (self.next_unit() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }
}

#[derive(Debug, Clone)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.0.gen()
    }
}

/// Replays a fixed list of draws, then repeats `fallback`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    draws: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            fallback: 0.5,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        let draw = self.draws.pop_front().unwrap_or(self.fallback);
        draw.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// Independent streams so outcome tests don't depend on how many draws fabrication takes.
#[derive(Debug, Resource)]
pub struct RandomStreams {
    pub rides: Box<dyn RandomSource>,
    pub outcomes: Box<dyn RandomSource>,
}

impl RandomStreams {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rides: Box::new(SeededRandom::new(seed)),
            outcomes: Box::new(SeededRandom::new(seed.wrapping_add(1))),
        }
    }

    pub fn with_rides(mut self, source: impl RandomSource + 'static) -> Self {
        self.rides = Box::new(source);
        self
    }

    pub fn with_outcomes(mut self, source: impl RandomSource + 'static) -> Self {
        self.outcomes = Box::new(source);
        self
    }
}

impl Default for RandomStreams {
    fn default() -> Self {
        Self::from_seed(0)
    }
}
