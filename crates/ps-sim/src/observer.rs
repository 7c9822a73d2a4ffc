//! Simulation observer trait for progress reporting and data collection.

use ps_agent::AgentSnapshot;
use ps_core::Iteration;
use ps_geometry::Building;

use crate::event::{SimEvent, SimStats};

/// What happened during one iteration, handed to
/// [`SimObserver::on_iteration_end`].
#[derive(Copy, Clone, Debug)]
pub struct IterationReport<'a> {
    pub iteration:   Iteration,
    /// Simulated time at the end of the iteration (s).
    pub time:        f64,
    pub agent_count: usize,
    /// Events of this iteration, including those raised by commands issued
    /// since the previous one.
    pub events:      &'a [SimEvent],
    pub stats:       &'a SimStats,
}

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] and
/// [`Sim::run_iterations`][crate::Sim::run_iterations].
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example: evacuation counter
///
/// ```rust,ignore
/// struct Evacuated(u64);
///
/// impl SimObserver for Evacuated {
///     fn on_event(&mut self, _it: Iteration, event: &SimEvent) {
///         if let SimEvent::AgentRemoved { cause: RemovalCause::LeftBuilding, .. } = event {
///             self.0 += 1;
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called before any processing of `iteration`; `time` is the simulated
    /// time at its start.
    fn on_iteration_start(&mut self, _iteration: Iteration, _time: f64) {}

    /// Called once per event, in the order the events were raised.
    fn on_event(&mut self, _iteration: Iteration, _event: &SimEvent) {}

    fn on_iteration_end(&mut self, _report: &IterationReport<'_>) {}

    /// Called every `config.snapshot_interval` iterations with the state of
    /// every agent at the end of the iteration.
    fn on_snapshot(&mut self, _iteration: Iteration, _time: f64, _agents: &[AgentSnapshot]) {}

    /// Called once when [`Sim::run`][crate::Sim::run] stops.  The building
    /// carries each door's usage and flow curve.
    fn on_sim_end(&mut self, _final_iteration: Iteration, _stats: &SimStats, _building: &Building) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

/// Collects every event; handy in tests and small tools.
#[derive(Default)]
pub struct EventLog {
    pub events: Vec<(Iteration, SimEvent)>,
}

impl SimObserver for EventLog {
    fn on_event(&mut self, iteration: Iteration, event: &SimEvent) {
        self.events.push((iteration, event.clone()));
    }
}
