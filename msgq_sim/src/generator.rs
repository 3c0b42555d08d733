//! Seeded random fleets.
//!
//! All entropy comes from one 64-bit seed, so a failing fleet can be
//! reproduced by passing the same seed back in.

use crate::config::{ProducerProfile, SimConfig};
use msgq_core::RateLimit;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Horizon used for generated configurations.
pub const RANDOM_HORIZON: u64 = 1000;

/// Derives the RNG for a seed, kept apart from other uses of the same seed.
fn fleet_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed.wrapping_mul(0x517cc1b727220a95) ^ 0x6d73_6771)
}

/// `count` random producer profiles.
///
/// About half are rate limited with no pacing; the others are paced
/// without a bucket. Every profile passes validation.
pub fn random_fleet(seed: u64, count: usize) -> Vec<ProducerProfile> {
    let mut rng = fleet_rng(seed);
    (0..count).map(|_| random_profile(&mut rng)).collect()
}

/// A random queue, consumer count and fleet.
pub fn random_config(seed: u64, producers: usize) -> SimConfig {
    let mut rng = fleet_rng(seed);
    let queue_capacity = rng.gen_range(1..=8);
    let consumers = rng.gen_range(1..=3);
    let producers = (0..producers).map(|_| random_profile(&mut rng)).collect();

    SimConfig {
        queue_capacity,
        horizon: RANDOM_HORIZON,
        consumers,
        producers,
    }
}

fn random_profile(rng: &mut ChaCha8Rng) -> ProducerProfile {
    let duration = rng.gen_range(1..=10);
    let priority = rng.gen_range(0..=9);

    if rng.gen_bool(0.5) {
        let limit = RateLimit::new(rng.gen_range(1..=20), rng.gen_range(1..=50));
        ProducerProfile {
            name: None,
            duration,
            put_interval: 0,
            priority,
            rate_limit: Some(limit),
        }
    } else {
        ProducerProfile::paced(rng.gen_range(5..=40), duration).with_priority(priority)
    }
}
