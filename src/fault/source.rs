use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::profile::{DelayRange, DownstreamCall, Draw};

/// Decides the outcome of a simulated call.
///
/// The injector never draws randomness itself; swapping the source makes outcomes
/// deterministic in tests (see [`ScriptedFaults`](super::ScriptedFaults)).
pub trait FaultSource: Send + Sync {
    fn draw(&self, call: &DownstreamCall) -> Draw;
}

/// Draws outcomes from a pseudo-random generator.
///
/// The slow-path draw, the delay draw and the failure draw are independent.
#[derive(Debug)]
pub struct RandomFaults {
    rng: Mutex<StdRng>,
}

impl RandomFaults {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Same seed, same sequence of draws.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomFaults {
    fn default() -> Self {
        Self::from_entropy()
    }
}

// Comparison against a uniform draw: NaN or out-of-range probabilities never panic.
fn bernoulli(rng: &mut StdRng, probability: f64) -> bool {
    rng.gen::<f64>() < probability
}

fn uniform(rng: &mut StdRng, range: DelayRange) -> Duration {
    if range.max_ms <= range.min_ms {
        return Duration::from_millis(range.min_ms);
    }
    Duration::from_millis(rng.gen_range(range.min_ms..=range.max_ms))
}

impl FaultSource for RandomFaults {
    fn draw(&self, call: &DownstreamCall) -> Draw {
        let profile = &call.profile;
        let mut rng = self.rng.lock();

        let (slow, range) = match profile.slow {
            Some(slow) if bernoulli(&mut rng, slow.probability) => (true, slow.delay),
            _ => (false, profile.delay),
        };
        let delay = uniform(&mut rng, range);
        let fail = bernoulli(&mut rng, profile.failure_probability);

        Draw { delay, slow, fail }
    }
}
