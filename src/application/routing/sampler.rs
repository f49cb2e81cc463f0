//! Percentage-draw source for the rule engine.
//!
//! Percentage rules gate acceptance on a uniform draw in `[0, 100)`.
//! The draw sits behind a trait so tests can script it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Source of uniform draws in `[0, 100)`.
pub trait Sampler: Send + Sync {
    fn draw(&self) -> u8;
}

/// Production sampler backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct ThreadRngSampler;

impl Sampler for ThreadRngSampler {
    fn draw(&self) -> u8 {
        rand::thread_rng().gen_range(0..100)
    }
}

/// Deterministic sampler seeded for reproducible distributions.
pub struct SeededSampler {
    rng: Mutex<StdRng>,
}

impl SeededSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Sampler for SeededSampler {
    fn draw(&self) -> u8 {
        let mut rng = self.rng.lock().expect("sampler lock poisoned");
        rng.gen_range(0..100)
    }
}
