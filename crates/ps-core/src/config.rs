//! Run-level configuration.
//!
//! Built by the application (typically from its own config file) and passed
//! to the simulation builder.  Model and routing parameters live with their
//! crates (`ps-model`, `ps-routing`); this struct only carries what the
//! driver itself needs.

use crate::{PsError, PsResult, SimClock};

/// What to do with an agent that is found in no subroom after moving.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LostAgentPolicy {
    /// Remove the agent and report it with cause `Lost`.
    #[default]
    Remove,
    /// Stop the run with an error.
    Halt,
}

/// Top-level simulation configuration.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Step length in seconds.  Default: 0.01.
    pub dt: f64,

    /// Stop after this many iterations.
    pub max_iterations: Option<u64>,

    /// Stop once this much simulated time has elapsed (seconds).
    pub max_time: Option<f64>,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,

    /// Worker thread count for the parallel phases.  `None` uses Rayon's
    /// global pool.
    pub num_threads: Option<usize>,

    /// Cell edge length of the neighbourhood grid (metres).  Default: 2.2.
    pub cell_size: f64,

    pub lost_agent_policy: LostAgentPolicy,

    /// Notify observers with a snapshot every N iterations (0 = never).
    pub snapshot_interval: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt:                0.01,
            max_iterations:    None,
            max_time:          None,
            seed:              0,
            num_threads:       None,
            cell_size:         2.2,
            lost_agent_policy: LostAgentPolicy::Remove,
            snapshot_interval: 100,
        }
    }
}

impl SimConfig {
    /// Reject non-positive step lengths and cell sizes.
    pub fn validate(&self) -> PsResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(PsError::Config(format!("dt must be positive, got {}", self.dt)));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(PsError::Config(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if self.num_threads == Some(0) {
            return Err(PsError::Config("num_threads must be at least 1".into()));
        }
        Ok(())
    }

    /// Construct a clock pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.dt)
    }

    /// `true` once either stop condition is met by `clock`.
    pub fn is_finished(&self, clock: &SimClock) -> bool {
        self.max_iterations.is_some_and(|n| clock.iteration.0 >= n)
            || self.max_time.is_some_and(|t| clock.elapsed_time() >= t - clock.dt * 1e-6)
    }
}
