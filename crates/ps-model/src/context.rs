//! Read-only simulation state passed to every operational update.

use ps_agent::{Agent, AgentStore};
use ps_core::{LineSegment, Point};
use ps_geometry::Building;
use ps_spatial::{NeighborhoodSearch, WallIndex};

/// An immutable snapshot of the simulation shared by all agents during the
/// operational phase.
///
/// Built once per iteration by `ps-sim` after the grid rebuild and routing.
/// Nothing it borrows is mutated until every update has been computed, so
/// all agents see the same state regardless of evaluation order.
pub struct ModelContext<'a> {
    /// Agent positions as of the last grid rebuild.
    pub grid:         &'a NeighborhoodSearch,
    /// Static walls.
    pub walls:        &'a WallIndex,
    /// Doors in state `Close` or `TempClose`; treated as walls.
    pub closed_doors: &'a [LineSegment],
    pub agents:       &'a AgentStore,
    pub building:     &'a Building,
    /// Simulated time at the start of the step (s).
    pub time:         f64,
}

impl<'a> ModelContext<'a> {
    #[inline]
    pub fn new(
        grid:         &'a NeighborhoodSearch,
        walls:        &'a WallIndex,
        closed_doors: &'a [LineSegment],
        agents:       &'a AgentStore,
        building:     &'a Building,
        time:         f64,
    ) -> Self {
        Self { grid, walls, closed_doors, agents, building, time }
    }

    /// Walls and closed doors with any point within `distance` of `p`.
    pub fn boundary_within(&self, p: Point, distance: f64) -> impl Iterator<Item = &LineSegment> + '_ {
        self.walls
            .walls_within(p, distance)
            .chain(self.closed_doors.iter().filter(move |s| s.distance_to(p) <= distance))
    }

    /// `true` if no wall or closed door lies between `a` and `b`.
    pub fn is_visible(&self, a: Point, b: Point) -> bool {
        let sight = LineSegment::new(a, b);
        !self.walls.blocks(&sight) && !self.closed_doors.iter().any(|d| d.intersects(&sight))
    }

    /// Other agents within `radius` of `agent` that it can see.
    ///
    /// Positions come from the grid; the remaining state is looked up in the
    /// store.  Entries the store no longer knows are skipped.
    pub fn visible_neighbours<'b>(
        &'b self,
        agent:  &'b Agent,
        radius: f64,
    ) -> impl Iterator<Item = &'a Agent> + 'b {
        let agents = self.agents;
        self.grid
            .get_neighboring_agents(agent.pos, radius)
            .filter(move |e| e.id != agent.id)
            .filter(move |e| self.is_visible(agent.pos, e.pos))
            .filter_map(move |e| agents.get(e.id))
    }
}
