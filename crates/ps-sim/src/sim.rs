//! The `Sim` struct, its iteration pipeline, and the control surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ps_agent::{Agent, AgentSnapshot, AgentSpec, AgentStore};
use ps_core::{
    AgentId, Iteration, JourneyId, LineSegment, LostAgentPolicy, NavLineId, Point, SimClock,
    SimConfig, SimRng, SourceId, StageId, SubRoomId,
};
use ps_geometry::{Building, DoorState, DoorStateChange, GeometryError, LineGeometry, Polygon};
use ps_journey::{AgentSource, JourneyRegistry, SourceSpec, WaitingSetState};
use ps_model::{speed, ModelContext, ModelError, ModelResult, ModelUpdate, OperationalModel};
use ps_routing::{Destination, EdgeFactor, Router, RoutingResult, Waypoint};
use ps_spatial::{NeighborhoodSearch, WallIndex};
use tracing::{debug, info, warn};

use crate::event::{CrossingDirection, RemovalCause, SimEvent, SimStats};
use crate::observer::{IterationReport, SimObserver};
use crate::schedule::{DoorEvent, DoorSchedule};
use crate::{SimError, SimResult};

/// An agent that moved out of its subroom during the last step.
struct Passage {
    agent: AgentId,
    from:  SubRoomId,
    /// `None` when the agent stepped outside the building.
    to:    Option<SubRoomId>,
    step:  LineSegment,
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The simulation runner.
///
/// `Sim` owns every piece of run state and advances it one iteration at a
/// time:
///
/// 0. **Sources**: door changes booked for this iteration apply, then due
///    sources place new agents.
/// 1. **Grid**: the neighbourhood grid is rebuilt from current positions.
/// 2. **Stages**: waiting sets and queues register arrivals; agents whose
///    non-exit stage is complete move on along their journey.
/// 3. **Routing** (parallel with the `parallel` feature): each agent gets
///    its next waypoint.  Failures are logged and evented; the agent keeps
///    its previous waypoint.
/// 4. **Operational step** (parallel): every update is computed against the
///    same snapshot, then all are committed.
/// 5. **Relocation**: agents that left their subroom are assigned the new
///    one; agents that stepped through an exit leave the building; agents
///    found nowhere are lost.
/// 6. **Doors**: passages are counted per door, then flow regulation runs.
/// 7. **Exits**: agents inside their exit stage's area are removed.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim {
    pub(crate) config:   SimConfig,
    pub(crate) clock:    SimClock,
    /// Seeds agent sources.
    pub(crate) rng:      SimRng,
    pub(crate) building: Building,
    pub(crate) walls:    WallIndex,
    pub(crate) grid:     NeighborhoodSearch,
    pub(crate) agents:   AgentStore,
    pub(crate) journeys: JourneyRegistry,
    pub(crate) sources:  Vec<AgentSource>,
    pub(crate) router:   Box<dyn Router>,
    pub(crate) schedule: DoorSchedule,
    pub(crate) model:    Box<dyn OperationalModel>,
    /// Events raised since the last iteration finished.
    pub(crate) pending:  Vec<SimEvent>,
    /// Events of the last finished iteration.
    pub(crate) events:   Vec<SimEvent>,
    pub(crate) stats:    SimStats,
    pub(crate) shutdown: Arc<AtomicBool>,
    #[cfg(feature = "parallel")]
    pub(crate) pool:     Option<rayon::ThreadPool>,
}

impl Sim {
    // ── Running ───────────────────────────────────────────────────────────

    /// Run until a stop condition holds.
    ///
    /// Stops on `max_iterations`, `max_time`, or the shutdown flag.  With
    /// neither limit configured the run ends once no agents remain and
    /// every source is exhausted.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        info!(agents = self.agents.len(), sources = self.sources.len(), "simulation started");
        while !self.should_stop() {
            self.step(observer)?;
        }
        observer.on_sim_end(self.clock.iteration, &self.stats, &self.building);
        info!(
            iterations = self.clock.iteration.0,
            time = self.clock.elapsed_time(),
            remaining = self.agents.len(),
            left_building = self.stats.left_building,
            reached_goal = self.stats.reached_goal,
            "simulation finished"
        );
        Ok(())
    }

    /// Run exactly `n` iterations from the current one, ignoring the stop
    /// conditions except the shutdown flag.
    pub fn run_iterations<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            self.step(observer)?;
        }
        Ok(())
    }

    /// Advance by one iteration.  The events it raised are available from
    /// [`events`](Self::events) until the next call.
    pub fn iterate(&mut self) -> SimResult<()> {
        let now = self.clock.iteration;
        let time = self.clock.elapsed_time();
        let end = time + self.clock.dt;

        self.apply_door_schedule(now)?;
        self.emit_sources(now)?;
        self.refresh_grid();
        self.update_stages()?;
        self.route_agents();
        self.operational_step(time)?;
        let (passages, gone) = self.relocate()?;
        self.record_passages(&passages, end)?;
        self.remove_agents(&gone)?;
        self.regulate_doors(end);
        self.remove_finished()?;

        self.clock.advance();
        self.events = std::mem::take(&mut self.pending);
        debug!(
            iteration = %now,
            agents = self.agents.len(),
            events = self.events.len(),
            "iteration done"
        );
        Ok(())
    }

    fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let iteration = self.clock.iteration;
        observer.on_iteration_start(iteration, self.clock.elapsed_time());
        self.iterate()?;

        for event in &self.events {
            observer.on_event(iteration, event);
        }
        let time = self.clock.elapsed_time();
        observer.on_iteration_end(&IterationReport {
            iteration,
            time,
            agent_count: self.agents.len(),
            events: &self.events,
            stats: &self.stats,
        });
        if iteration.is_multiple_of(self.config.snapshot_interval) {
            observer.on_snapshot(iteration, time, &self.snapshots());
        }
        Ok(())
    }

    fn should_stop(&self) -> bool {
        if self.shutdown.load(Ordering::Relaxed) {
            return true;
        }
        if self.config.max_iterations.is_none() && self.config.max_time.is_none() {
            return self.agents.is_empty() && self.sources.iter().all(AgentSource::is_exhausted);
        }
        self.config.is_finished(&self.clock)
    }

    // ── Phase 0: door schedule and sources ────────────────────────────────

    fn apply_door_schedule(&mut self, now: Iteration) -> SimResult<()> {
        for event in self.schedule.drain_due(now) {
            info!(door = %event.door, state = ?event.state, booked = event.time, "scheduled door change due");
            self.set_door_state(event.door, event.state)?;
        }
        Ok(())
    }

    fn emit_sources(&mut self, now: Iteration) -> SimResult<()> {
        for i in 0..self.sources.len() {
            let specs = self.sources[i].emit(now);
            if specs.is_empty() {
                continue;
            }
            let mut deferred = Vec::new();
            for spec in specs {
                match self.add_agent(spec) {
                    Ok(_) => {}
                    Err(SimError::Model(ModelError::Constraint(violation))) => {
                        debug!(source = %self.sources[i].id, %violation, "spawn deferred");
                        self.stats.deferred_spawns += 1;
                        deferred.push(spec);
                    }
                    Err(e) => return Err(e),
                }
            }
            self.sources[i].give_back(deferred);
        }
        Ok(())
    }

    // ── Phase 1: grid ─────────────────────────────────────────────────────

    fn refresh_grid(&mut self) {
        self.grid.update(self.agents.positions());
    }

    // ── Phase 2: stages ───────────────────────────────────────────────────

    fn update_stages(&mut self) -> SimResult<()> {
        let agents = &self.agents;
        let grid = &self.grid;
        for i in 0..self.journeys.stages().len() {
            let id = StageId(i as u32);
            self.journeys
                .stage_mut(id)?
                .update(grid, |a| agents.get(a).is_some_and(|agent| agent.stage == id));
        }

        for agent in self.agents.iter_mut() {
            let stage = self.journeys.stage(agent.stage)?;
            if stage.is_exit() || !stage.is_completed(agent.id, agent.pos) {
                continue;
            }
            if let Some(next) = self.journeys.advance(agent.id, agent.journey, agent.stage)? {
                debug!(agent = %agent.id, from = %agent.stage, to = %next, "stage complete");
                agent.stage = next;
                agent.state.orientation_delay = 0;
            }
        }
        Ok(())
    }

    // ── Phase 3: routing ──────────────────────────────────────────────────

    fn route_agents(&mut self) {
        let building = &self.building;
        let journeys = &self.journeys;
        let router = self.router.as_ref();
        let route = |agent: &Agent| -> RoutingResult<Waypoint> {
            let destination = destination_of(journeys, agent);
            router.compute_waypoint(building, agent.pos, agent.subroom, &destination)
        };

        #[cfg(not(feature = "parallel"))]
        let results: Vec<RoutingResult<Waypoint>> = self.agents.iter().map(route).collect();

        #[cfg(feature = "parallel")]
        let results: Vec<RoutingResult<Waypoint>> = {
            use rayon::prelude::*;
            let agents = self.agents.as_slice();
            in_pool(self.pool.as_ref(), || agents.par_iter().map(route).collect())
        };

        let mut failures = Vec::new();
        for (agent, result) in self.agents.iter_mut().zip(results) {
            match result {
                Ok(waypoint) => {
                    if waypoint.via != agent.target_door {
                        agent.state.orientation_delay = 0;
                    }
                    agent.destination = waypoint.target;
                    agent.target_door = waypoint.via;
                }
                Err(e) => {
                    warn!(agent = %agent.id, position = %agent.pos, error = %e, "routing failed");
                    failures.push(SimEvent::RoutingFailed { agent: agent.id, reason: e.to_string() });
                }
            }
        }
        for event in failures {
            self.push_event(event);
        }
    }

    // ── Phase 4: operational step ─────────────────────────────────────────

    fn operational_step(&mut self, time: f64) -> SimResult<()> {
        let dt = self.clock.dt;
        let closed = self.building.closed_door_segments();
        let ctx = ModelContext::new(
            &self.grid,
            &self.walls,
            &closed,
            &self.agents,
            &self.building,
            time,
        );
        let model = self.model.as_ref();
        let agents = self.agents.as_slice();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<ModelResult<ModelUpdate>> =
            agents.iter().map(|a| model.compute_update(a, &ctx, dt)).collect();

        #[cfg(feature = "parallel")]
        let results: Vec<ModelResult<ModelUpdate>> = {
            use rayon::prelude::*;
            in_pool(self.pool.as_ref(), || {
                agents.par_iter().map(|a| model.compute_update(a, &ctx, dt)).collect()
            })
        };

        // Nothing is written unless every update succeeded.
        let updates = results.into_iter().collect::<ModelResult<Vec<_>>>()?;
        for (agent, update) in self.agents.iter_mut().zip(updates) {
            update.commit(agent);
        }
        Ok(())
    }

    // ── Phase 5: relocation ───────────────────────────────────────────────

    #[allow(clippy::type_complexity)]
    fn relocate(&mut self) -> SimResult<(Vec<Passage>, Vec<(AgentId, RemovalCause)>)> {
        let mut passages = Vec::new();
        let mut gone = Vec::new();
        for agent in self.agents.iter_mut() {
            let from = agent.subroom;
            if self.building.subroom(from).is_some_and(|s| s.contains(agent.pos)) {
                continue;
            }
            let step = agent.step();
            match self.building.relocate(from, agent.pos) {
                Some(to) => {
                    if let Some(s) = self.building.subroom(to) {
                        agent.room = s.room;
                    }
                    agent.subroom = to;
                    passages.push(Passage { agent: agent.id, from, to: Some(to), step });
                }
                None if exit_crossed(&self.building, from, &step) => {
                    passages.push(Passage { agent: agent.id, from, to: None, step });
                    gone.push((agent.id, RemovalCause::LeftBuilding));
                }
                None => {
                    warn!(agent = %agent.id, position = %agent.pos, last = %agent.last_pos, "agent lost");
                    if self.config.lost_agent_policy == LostAgentPolicy::Halt {
                        return Err(SimError::LostAgent { agent: agent.id, position: agent.pos });
                    }
                    gone.push((agent.id, RemovalCause::Lost));
                }
            }
        }
        Ok((passages, gone))
    }

    // ── Phase 6: doors ────────────────────────────────────────────────────

    fn record_passages(&mut self, passages: &[Passage], time: f64) -> SimResult<()> {
        for passage in passages {
            let Some((door, direction)) = crossed_door(&self.building, passage)? else {
                debug!(agent = %passage.agent, from = %passage.from, "subroom change without a connecting door");
                continue;
            };
            let usage = self.building.record_passage(door, time)?;
            debug!(agent = %passage.agent, %door, ?direction, usage, "door crossed");
            self.push_event(SimEvent::DoorCrossed { agent: passage.agent, door, direction });
        }
        Ok(())
    }

    fn regulate_doors(&mut self, time: f64) {
        let changes = self.building.regulate_doors(time, self.clock.dt);
        for change in changes {
            self.push_event(door_event(change));
        }
        self.router.update(&self.building, time);
    }

    // ── Phase 7: exits ────────────────────────────────────────────────────

    fn remove_finished(&mut self) -> SimResult<()> {
        let mut done = Vec::new();
        for agent in self.agents.iter() {
            let stage = self.journeys.stage(agent.stage)?;
            if stage.is_exit() && stage.is_completed(agent.id, agent.pos) {
                done.push((agent.id, RemovalCause::ReachedGoal));
            }
        }
        self.remove_agents(&done)
    }

    fn remove_agents(&mut self, gone: &[(AgentId, RemovalCause)]) -> SimResult<()> {
        if gone.is_empty() {
            return Ok(());
        }
        let ids: Vec<AgentId> = gone.iter().map(|&(id, _)| id).collect();
        for agent in self.agents.remove_many(&ids) {
            self.journeys.leave(agent.id, agent.stage)?;
        }
        for &(agent, cause) in gone {
            debug!(%agent, ?cause, "agent removed");
            self.push_event(SimEvent::AgentRemoved { agent, cause });
        }
        Ok(())
    }

    fn push_event(&mut self, event: SimEvent) {
        self.stats.record(&event);
        self.pending.push(event);
    }

    // ── Agents ────────────────────────────────────────────────────────────

    /// Place a new agent.
    ///
    /// The position must lie in a subroom and the stage must belong to the
    /// journey.  The operational model then checks its parameter ranges and
    /// clearance to neighbours and walls; a violation is returned as
    /// [`ModelError::Constraint`] and nothing is added.
    pub fn add_agent(&mut self, spec: AgentSpec) -> SimResult<AgentId> {
        self.journeys.validate_entry(spec.journey, spec.stage)?;
        let subroom = self
            .building
            .find_subroom(spec.position)
            .ok_or(SimError::OutsideBuilding(spec.position))?;
        let room = self
            .building
            .subroom(subroom)
            .map(|s| s.room)
            .ok_or(GeometryError::UnknownSubRoom(subroom))?;

        let id = self.agents.peek_next_id();
        let mut agent = spec.into_agent(id, room, subroom);
        agent.destination = self.journeys.stage(spec.stage)?.target(id);
        speed::settle(&mut agent, &self.building);

        self.refresh_grid();
        let closed = self.building.closed_door_segments();
        let ctx = ModelContext::new(
            &self.grid,
            &self.walls,
            &closed,
            &self.agents,
            &self.building,
            self.clock.elapsed_time(),
        );
        self.model.validate_agent(&agent, &ctx)?;

        let id = self.agents.insert_with(|_| agent);
        self.journeys.enter(spec.stage)?;
        self.push_event(SimEvent::AgentAdded { agent: id, position: spec.position });
        Ok(id)
    }

    pub fn remove_agent(&mut self, id: AgentId) -> SimResult<()> {
        if !self.agents.contains(id) {
            return Err(SimError::UnknownAgent(id));
        }
        self.remove_agents(&[(id, RemovalCause::Removed)])
    }

    /// Put an agent on `stage` of another journey.
    pub fn switch_agent_journey(
        &mut self,
        id:      AgentId,
        journey: JourneyId,
        stage:   StageId,
    ) -> SimResult<()> {
        self.journeys.validate_entry(journey, stage)?;
        let agent = self.agents.get_mut(id).ok_or(SimError::UnknownAgent(id))?;
        let previous = agent.stage;
        agent.journey = journey;
        agent.stage = stage;
        agent.state.orientation_delay = 0;
        self.journeys.leave(id, previous)?;
        self.journeys.enter(stage)?;
        Ok(())
    }

    /// Agents within `radius` of `center` (inclusive), in ID order.
    pub fn agents_in_range(&self, center: Point, radius: f64) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self
            .agents
            .positions()
            .filter(|&(_, p)| p.distance(center) <= radius)
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Agents inside `polygon`, in ID order.
    pub fn agents_in_polygon(&self, polygon: &Polygon) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self
            .agents
            .positions()
            .filter(|&(_, p)| polygon.contains(p))
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Add an agent source.  Its sampling stream is seeded from the run seed.
    pub fn add_source(&mut self, spec: SourceSpec) -> SimResult<SourceId> {
        self.journeys.validate_entry(spec.journey, spec.stage)?;
        let id = SourceId(self.sources.len() as u32);
        let seed: u64 = self.rng.child(id.0 as u64).random();
        self.sources.push(AgentSource::new(id, spec, seed)?);
        debug!(%id, "source added");
        Ok(id)
    }

    // ── Stages ────────────────────────────────────────────────────────────

    pub fn set_waiting_set_state(&mut self, stage: StageId, state: WaitingSetState) -> SimResult<()> {
        self.journeys.waiting_set_mut(stage)?.set_state(state);
        info!(%stage, ?state, "waiting set state changed");
        Ok(())
    }

    /// Release up to `count` agents from the front of a queue.  Returns how
    /// many were released.
    pub fn pop_queue(&mut self, stage: StageId, count: usize) -> SimResult<usize> {
        Ok(self.journeys.queue_mut(stage)?.pop(count))
    }

    // ── Doors and routing ─────────────────────────────────────────────────

    pub fn set_door_state(&mut self, door: NavLineId, state: DoorState) -> SimResult<()> {
        if let Some(change) = self.building.set_door_state(door, state)? {
            info!(%door, from = ?change.from, to = ?change.to, "door state set");
            self.push_event(door_event(change));
            self.router.update(&self.building, self.clock.elapsed_time());
        }
        Ok(())
    }

    /// Book a door state change for simulated time `time`.
    ///
    /// It applies at the start of the first iteration beginning at or after
    /// `time` (the next one if `time` has passed), exactly like
    /// [`set_door_state`](Self::set_door_state) at that moment.  A door
    /// already in `state` raises no event.
    pub fn schedule_door_event(&mut self, time: f64, door: NavLineId, state: DoorState) -> SimResult<()> {
        self.building.door_flow(door)?;
        if !(time.is_finite() && time >= 0.0) {
            return Err(SimError::Config(format!("door event time must be finite and non-negative, got {time}")));
        }
        debug!(%door, ?state, time, "door change booked");
        self.schedule.push(DoorEvent { time, door, state }, self.clock.dt);
        Ok(())
    }

    /// Door changes booked but not yet applied.
    pub fn scheduled_door_events(&self) -> usize {
        self.schedule.len()
    }

    /// Clear the usage counted toward a door's max-usage cap.
    pub fn reset_door_usage(&mut self, door: NavLineId) -> SimResult<()> {
        if let Some(change) = self.building.reset_door_usage(door)? {
            info!(%door, "door reopened by usage reset");
            self.push_event(door_event(change));
            self.router.update(&self.building, self.clock.elapsed_time());
        }
        Ok(())
    }

    pub fn apply_edge_factor(&mut self, factor: EdgeFactor) -> SimResult<()> {
        self.building.door_flow(factor.door)?;
        debug!(door = %factor.door, name = %factor.name, factor = factor.factor, "edge factor applied");
        self.router.apply_factor(factor);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[inline]
    pub fn elapsed_time(&self) -> f64 {
        self.clock.elapsed_time()
    }

    #[inline]
    pub fn iteration_count(&self) -> u64 {
        self.clock.iteration.0
    }

    #[inline]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn agents(&self) -> &AgentStore {
        &self.agents
    }

    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents.iter().map(Agent::snapshot).collect()
    }

    pub fn building(&self) -> &Building {
        &self.building
    }

    pub fn journeys(&self) -> &JourneyRegistry {
        &self.journeys
    }

    pub fn sources(&self) -> &[AgentSource] {
        &self.sources
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// Events raised by the last finished iteration.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Cumulative passages through `door`.
    pub fn door_usage(&self, door: NavLineId) -> SimResult<u64> {
        Ok(self.building.door_flow(door)?.usage())
    }

    /// Set the returned flag to stop [`run`](Self::run) before its next
    /// iteration.  Safe to set from another thread.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn destination_of(journeys: &JourneyRegistry, agent: &Agent) -> Destination {
    match journeys.stage(agent.stage) {
        Ok(stage) if stage.is_exit() => {
            Destination::Stage { stage: stage.id, fallback: stage.target(agent.id) }
        }
        Ok(stage) => Destination::Point(stage.target(agent.id)),
        Err(_) => Destination::Point(agent.destination),
    }
}

/// `true` if `step` touches an exit door of `subroom`.
fn exit_crossed(building: &Building, subroom: SubRoomId, step: &LineSegment) -> bool {
    let Some(s) = building.subroom(subroom) else {
        return false;
    };
    s.lines
        .iter()
        .filter_map(|&id| building.line(id)?.as_room_door())
        .any(|d| d.is_exit() && d.segment.intersects(step))
}

/// The door between `passage.from` and `passage.to`: the first one the step
/// touches, otherwise the one closest to the new position.  A line listed
/// by a subroom it does not border is a fatal integrity error.
fn crossed_door(
    building: &Building,
    passage:  &Passage,
) -> SimResult<Option<(NavLineId, CrossingDirection)>> {
    let Some(subroom) = building.subroom(passage.from) else {
        return Ok(None);
    };
    let mut closest: Option<(f64, NavLineId, [Option<SubRoomId>; 2])> = None;
    for line in subroom.lines.iter().filter_map(|&id| building.line(id)) {
        if !line.is_door() || building.other_subroom(line.id(), passage.from)? != passage.to {
            continue;
        }
        let sides = line.sides();
        if line.segment().intersects(&passage.step) {
            return Ok(Some((line.id(), direction(sides, passage.from))));
        }
        let d = line.segment().distance_to(passage.step.p2);
        if closest.is_none_or(|(best, _, _)| d < best) {
            closest = Some((d, line.id(), sides));
        }
    }
    Ok(closest.map(|(_, id, sides)| (id, direction(sides, passage.from))))
}

#[inline]
fn direction(sides: [Option<SubRoomId>; 2], from: SubRoomId) -> CrossingDirection {
    if sides[0] == Some(from) { CrossingDirection::Outbound } else { CrossingDirection::Inbound }
}

fn door_event(change: DoorStateChange) -> SimEvent {
    SimEvent::DoorStateChanged { door: change.door, from: change.from, to: change.to }
}

#[cfg(feature = "parallel")]
fn in_pool<R, F>(pool: Option<&rayon::ThreadPool>, f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match pool {
        Some(pool) => pool.install(f),
        None => f(),
    }
}
