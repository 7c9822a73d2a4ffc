//! Simulation time model.
//!
//! Time is a monotonically increasing `Iteration` counter; elapsed seconds
//! are always derived as `iteration * dt` rather than accumulated, so long
//! runs do not drift.

use std::fmt;

// ── Iteration ─────────────────────────────────────────────────────────────────

/// An absolute iteration counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iteration(pub u64);

impl Iteration {
    pub const ZERO: Iteration = Iteration(0);

    /// `true` every `n` iterations (always `false` for `n == 0`).
    #[inline]
    pub fn is_multiple_of(self, n: u64) -> bool {
        n != 0 && self.0.is_multiple_of(n)
    }
}

impl std::ops::Add<u64> for Iteration {
    type Output = Iteration;
    #[inline]
    fn add(self, rhs: u64) -> Iteration {
        Iteration(self.0 + rhs)
    }
}

impl fmt::Display for Iteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Fixed-step clock.  Cheap to copy; holds no heap data.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Step length in seconds.
    pub dt: f64,
    /// Number of completed iterations.
    pub iteration: Iteration,
}

impl SimClock {
    pub fn new(dt: f64) -> Self {
        Self { dt, iteration: Iteration::ZERO }
    }

    #[inline]
    pub fn advance(&mut self) {
        self.iteration = self.iteration + 1;
    }

    /// Simulated seconds since iteration 0.
    #[inline]
    pub fn elapsed_time(&self) -> f64 {
        self.iteration.0 as f64 * self.dt
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (t = {:.2} s)", self.iteration, self.elapsed_time())
    }
}
