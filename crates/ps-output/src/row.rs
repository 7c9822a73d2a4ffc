//! Plain data row types written by output backends.

use ps_core::{Iteration, NavLineId};
use ps_geometry::FlowSample;
use ps_sim::SimStats;

/// Population and cumulative counters at the end of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationSummaryRow {
    pub iteration:      u64,
    /// Simulated time at the end of the iteration (s).
    pub time:           f64,
    pub agents:         u64,
    pub added:          u64,
    pub left_building:  u64,
    pub reached_goal:   u64,
    pub lost:           u64,
    pub door_crossings: u64,
}

impl IterationSummaryRow {
    pub fn new(iteration: Iteration, time: f64, agents: usize, stats: &SimStats) -> Self {
        Self {
            iteration:      iteration.0,
            time,
            agents:         agents as u64,
            added:          stats.agents_added,
            left_building:  stats.left_building,
            reached_goal:   stats.reached_goal,
            lost:           stats.lost,
            door_crossings: stats.door_crossings,
        }
    }
}

/// One point of a door's flow curve: cumulative usage after a passage.
#[derive(Debug, Clone, PartialEq)]
pub struct DoorFlowRow {
    pub door:    u32,
    pub caption: String,
    pub time:    f64,
    pub usage:   u64,
}

impl DoorFlowRow {
    pub fn new(door: NavLineId, caption: &str, sample: &FlowSample) -> Self {
        Self { door: door.0, caption: caption.to_owned(), time: sample.time, usage: sample.usage }
    }
}
