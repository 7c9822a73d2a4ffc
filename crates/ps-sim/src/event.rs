//! Events raised during an iteration and the run-wide counters.

use ps_core::{AgentId, NavLineId, Point};
use ps_geometry::DoorState;

/// Why an agent left the simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RemovalCause {
    /// Completed an exit stage.
    ReachedGoal,
    /// Stepped through a door to the outside.
    LeftBuilding,
    /// Found in no subroom after moving, without passing an exit.
    Lost,
    /// Removed by command.
    Removed,
}

/// Direction of a door passage relative to the door's sides.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CrossingDirection {
    /// From the first side to the second.  For a room door this is leaving
    /// its inside room.
    Outbound,
    /// From the second side to the first.
    Inbound,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimEvent {
    AgentAdded { agent: AgentId, position: Point },
    AgentRemoved { agent: AgentId, cause: RemovalCause },
    DoorCrossed { agent: AgentId, door: NavLineId, direction: CrossingDirection },
    DoorStateChanged { door: NavLineId, from: DoorState, to: DoorState },
    /// The router had no answer; the agent keeps its previous waypoint.
    RoutingFailed { agent: AgentId, reason: String },
}

/// Cumulative counters over the whole run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimStats {
    pub agents_added:       u64,
    pub reached_goal:       u64,
    pub left_building:      u64,
    pub lost:               u64,
    pub removed_by_command: u64,
    pub door_crossings:     u64,
    pub door_state_changes: u64,
    pub routing_failures:   u64,
    /// Source emissions put back in the pool because the spot was taken.
    pub deferred_spawns:    u64,
}

impl SimStats {
    /// Agents removed for any reason.
    pub fn removed(&self) -> u64 {
        self.reached_goal + self.left_building + self.lost + self.removed_by_command
    }

    pub(crate) fn record(&mut self, event: &SimEvent) {
        match event {
            SimEvent::AgentAdded { .. } => self.agents_added += 1,
            SimEvent::AgentRemoved { cause, .. } => match cause {
                RemovalCause::ReachedGoal => self.reached_goal += 1,
                RemovalCause::LeftBuilding => self.left_building += 1,
                RemovalCause::Lost => self.lost += 1,
                RemovalCause::Removed => self.removed_by_command += 1,
            },
            SimEvent::DoorCrossed { .. } => self.door_crossings += 1,
            SimEvent::DoorStateChanged { .. } => self.door_state_changes += 1,
            SimEvent::RoutingFailed { .. } => self.routing_failures += 1,
        }
    }
}
