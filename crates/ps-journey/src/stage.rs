//! Stages: the places a journey leads agents through.
//!
//! # Completion rules
//!
//! | Stage                  | Target of an agent                  | Completed when                        |
//! |------------------------|-------------------------------------|---------------------------------------|
//! | `Waypoint`             | its position                        | within `distance` of it               |
//! | `Exit`                 | polygon centroid                    | inside the polygon                    |
//! | `NotifiableWaitingSet` | own slot, else the next free slot   | set is `Inactive` and agent is an occupant or within 1 m of its target |
//! | `NotifiableQueue`      | own slot, else the next free slot   | agent was released by `pop`           |
//!
//! Waiting sets and queues learn about arriving agents in [`Stage::update`],
//! which the driver calls once per iteration after the neighbourhood grid is
//! rebuilt.

use ps_core::{AgentId, GoalId, Point, StageId};
use ps_geometry::{Building, Polygon};
use ps_spatial::NeighborhoodSearch;

use crate::{JourneyError, JourneyResult};

/// Radius around the next free slot in which arriving agents are registered.
pub const SLOT_CAPTURE_RADIUS: f64 = 2.0;

/// Distance to its target at which a non-occupant leaves an inactive set.
const RELEASE_DISTANCE: f64 = 1.0;

// ── StageSpec ─────────────────────────────────────────────────────────────────

/// Description of a stage to add to a [`crate::JourneyRegistry`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StageSpec {
    Waypoint { position: Point, distance: f64 },
    Exit { polygon: Polygon },
    WaitingSet { slots: Vec<Point> },
    Queue { slots: Vec<Point> },
}

impl StageSpec {
    /// An exit stage covering the polygon of a building goal.
    pub fn exit_at_goal(building: &Building, goal: GoalId) -> JourneyResult<Self> {
        let goal = building
            .goal(goal)
            .ok_or_else(|| JourneyError::InvalidStage(format!("unknown goal {goal}")))?;
        Ok(StageSpec::Exit { polygon: goal.polygon.clone() })
    }

    pub(crate) fn into_stage(self, id: StageId) -> JourneyResult<Stage> {
        let kind = match self {
            StageSpec::Waypoint { position, distance } => {
                if !(distance > 0.0) || !position.is_finite() {
                    return Err(JourneyError::InvalidStage(format!(
                        "waypoint at {position} needs a positive distance, got {distance}"
                    )));
                }
                StageKind::Waypoint { position, distance }
            }
            StageSpec::Exit { polygon } => {
                if !polygon.is_convex() {
                    return Err(JourneyError::InvalidStage(
                        "exit polygon must be convex".into(),
                    ));
                }
                StageKind::Exit { polygon }
            }
            StageSpec::WaitingSet { slots } => {
                check_slots(&slots)?;
                StageKind::WaitingSet(NotifiableWaitingSet::new(slots))
            }
            StageSpec::Queue { slots } => {
                check_slots(&slots)?;
                StageKind::Queue(NotifiableQueue::new(slots))
            }
        };
        Ok(Stage { id, kind, targeting: 0 })
    }
}

fn check_slots(slots: &[Point]) -> JourneyResult<()> {
    if slots.is_empty() {
        return Err(JourneyError::InvalidStage("slot list is empty".into()));
    }
    if slots.iter().any(|s| !s.is_finite()) {
        return Err(JourneyError::InvalidStage("slot position is not finite".into()));
    }
    Ok(())
}

// ── Stage ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum StageKind {
    Waypoint { position: Point, distance: f64 },
    Exit { polygon: Polygon },
    WaitingSet(NotifiableWaitingSet),
    Queue(NotifiableQueue),
}

#[derive(Clone, Debug)]
pub struct Stage {
    pub id:    StageId,
    pub kind:  StageKind,
    /// Number of agents whose current stage is this one.
    targeting: usize,
}

impl Stage {
    #[inline]
    pub fn targeting(&self) -> usize {
        self.targeting
    }

    pub fn is_exit(&self) -> bool {
        matches!(self.kind, StageKind::Exit { .. })
    }

    pub fn exit_polygon(&self) -> Option<&Polygon> {
        match &self.kind {
            StageKind::Exit { polygon } => Some(polygon),
            _ => None,
        }
    }

    /// Point the agent should walk to while this is its stage.
    pub fn target(&self, agent: AgentId) -> Point {
        match &self.kind {
            StageKind::Waypoint { position, .. } => *position,
            StageKind::Exit { polygon } => polygon.centroid(),
            StageKind::WaitingSet(set) => set.target(agent),
            StageKind::Queue(queue) => queue.target(agent),
        }
    }

    pub fn is_completed(&self, agent: AgentId, pos: Point) -> bool {
        match &self.kind {
            StageKind::Waypoint { position, distance } => pos.distance(*position) <= *distance,
            StageKind::Exit { polygon } => polygon.contains(pos),
            StageKind::WaitingSet(set) => set.is_completed(agent, pos),
            StageKind::Queue(queue) => queue.is_completed(agent),
        }
    }

    /// Register agents that arrived at a waiting set or queue.
    /// `on_stage` tells whether an agent currently targets this stage.
    pub fn update<F>(&mut self, grid: &NeighborhoodSearch, on_stage: F)
    where
        F: Fn(AgentId) -> bool,
    {
        match &mut self.kind {
            StageKind::WaitingSet(set) => set.update(grid, on_stage),
            StageKind::Queue(queue) => queue.update(grid, on_stage),
            StageKind::Waypoint { .. } | StageKind::Exit { .. } => {}
        }
    }

    pub(crate) fn enter(&mut self) {
        self.targeting += 1;
    }

    /// Forget `agent`: it moved on to another stage or left the simulation.
    pub(crate) fn leave(&mut self, agent: AgentId) {
        self.targeting = self.targeting.saturating_sub(1);
        match &mut self.kind {
            StageKind::WaitingSet(set) => set.occupants.retain(|&a| a != agent),
            StageKind::Queue(queue) => {
                queue.occupants.retain(|&a| a != agent);
                queue.exiting.retain(|&a| a != agent);
            }
            StageKind::Waypoint { .. } | StageKind::Exit { .. } => {}
        }
    }
}

/// Slot fill shared by waiting sets and queues: repeatedly take the agent
/// nearest to the next free slot within [`SLOT_CAPTURE_RADIUS`].
fn fill_slots<F>(
    slots: &[Point],
    occupants: &mut Vec<AgentId>,
    skip: &[AgentId],
    grid: &NeighborhoodSearch,
    on_stage: F,
) where
    F: Fn(AgentId) -> bool,
{
    while occupants.len() < slots.len() {
        let slot = slots[occupants.len()];
        let nearest = grid
            .get_neighboring_agents(slot, SLOT_CAPTURE_RADIUS)
            .filter(|e| on_stage(e.id) && !occupants.contains(&e.id) && !skip.contains(&e.id))
            .map(|e| (e.pos.distance_sq(slot), e.id))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        match nearest {
            Some((_, id)) => occupants.push(id),
            None => break,
        }
    }
}

fn slot_for(slots: &[Point], occupants: &[AgentId], agent: AgentId) -> Point {
    match occupants.iter().position(|&a| a == agent) {
        Some(i) => slots[i],
        None => slots[occupants.len().min(slots.len() - 1)],
    }
}

// ── NotifiableWaitingSet ──────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WaitingSetState {
    /// Agents are held in their slots.
    #[default]
    Active,
    /// Agents are released to their next stage.
    Inactive,
}

#[derive(Clone, Debug)]
pub struct NotifiableWaitingSet {
    slots:     Vec<Point>,
    occupants: Vec<AgentId>,
    state:     WaitingSetState,
}

impl NotifiableWaitingSet {
    fn new(slots: Vec<Point>) -> Self {
        Self { slots, occupants: Vec::new(), state: WaitingSetState::Active }
    }

    pub fn slots(&self) -> &[Point] {
        &self.slots
    }

    /// Occupants in slot order.
    pub fn occupants(&self) -> &[AgentId] {
        &self.occupants
    }

    pub fn state(&self) -> WaitingSetState {
        self.state
    }

    /// Switching back to `Active` starts a fresh round with no occupants.
    pub fn set_state(&mut self, state: WaitingSetState) {
        if state == WaitingSetState::Active && self.state == WaitingSetState::Inactive {
            self.occupants.clear();
        }
        self.state = state;
    }

    fn update<F: Fn(AgentId) -> bool>(&mut self, grid: &NeighborhoodSearch, on_stage: F) {
        if self.state == WaitingSetState::Inactive {
            return;
        }
        fill_slots(&self.slots, &mut self.occupants, &[], grid, on_stage);
    }

    fn target(&self, agent: AgentId) -> Point {
        slot_for(&self.slots, &self.occupants, agent)
    }

    fn is_completed(&self, agent: AgentId, pos: Point) -> bool {
        self.state == WaitingSetState::Inactive
            && (self.occupants.contains(&agent)
                || pos.distance(self.target(agent)) <= RELEASE_DISTANCE)
    }
}

// ── NotifiableQueue ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct NotifiableQueue {
    slots:     Vec<Point>,
    /// Front of the queue first.
    occupants: Vec<AgentId>,
    /// Agents released by `pop` that have not yet moved on.
    exiting:   Vec<AgentId>,
}

impl NotifiableQueue {
    fn new(slots: Vec<Point>) -> Self {
        Self { slots, occupants: Vec::new(), exiting: Vec::new() }
    }

    pub fn slots(&self) -> &[Point] {
        &self.slots
    }

    pub fn occupants(&self) -> &[AgentId] {
        &self.occupants
    }

    /// Release up to `count` agents from the front; the rest move up.
    /// Returns the number actually released.
    pub fn pop(&mut self, count: usize) -> usize {
        let n = count.min(self.occupants.len());
        self.exiting.extend(self.occupants.drain(..n));
        n
    }

    fn update<F: Fn(AgentId) -> bool>(&mut self, grid: &NeighborhoodSearch, on_stage: F) {
        fill_slots(&self.slots, &mut self.occupants, &self.exiting, grid, on_stage);
    }

    fn target(&self, agent: AgentId) -> Point {
        slot_for(&self.slots, &self.occupants, agent)
    }

    fn is_completed(&self, agent: AgentId) -> bool {
        self.exiting.contains(&agent)
    }
}
