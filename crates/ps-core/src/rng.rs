//! Deterministic sampling streams.
//!
//! # Determinism strategy
//!
//! Keyed streams are seeded by
//!
//!   seed = stream_seed XOR (key * MIXING_CONSTANT)
//!
//! where the mixing constant is the 64-bit fractional part of the golden
//! ratio.  A source keys each generated agent by its ordinal, so sampled
//! parameters depend only on the run seed and that ordinal, not on
//! placement order or thread scheduling.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── AgentRng ──────────────────────────────────────────────────────────────────

/// Per-agent deterministic RNG, used when sampling agent parameters
/// (e.g. desired speed) at creation time.
pub struct AgentRng(SmallRng);

impl AgentRng {
    /// Stream number `key` of the family rooted at `stream_seed`.
    pub fn keyed(stream_seed: u64, key: u64) -> Self {
        AgentRng(SmallRng::seed_from_u64(stream_seed ^ key.wrapping_mul(MIXING_CONSTANT)))
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }
}

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Simulation-level RNG.  Hands out the seeds of per-source streams and is
/// used only from the sequential parts of the iteration.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child `SimRng` with a different seed offset.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        SimRng(SmallRng::seed_from_u64(child_seed))
    }

    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }
}
