//! Integration tests for ps-sim.

use ps_agent::{Agent, AgentSnapshot, AgentSpec};
use ps_core::{
    AgentId, Iteration, JourneyId, LineSegment, LostAgentPolicy, NavLineId, Point, SimConfig,
    StageId, SubRoomId,
};
use ps_geometry::{Building, BuildingBuilder, DoorLimits, DoorState, Polygon};
use ps_journey::{JourneyDesc, JourneyError, JourneyRegistry, SourceSpec, StageSpec, Transition, WaitingSetState};
use ps_model::{ModelContext, ModelError, ModelResult, ModelUpdate, OperationalModel};

use crate::{
    CrossingDirection, EventLog, IterationReport, NoopObserver, RemovalCause, Sim, SimBuilder,
    SimError, SimEvent, SimObserver,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> LineSegment {
    LineSegment::new(p(x1, y1), p(x2, y2))
}

fn config() -> SimConfig {
    SimConfig { seed: 42, max_iterations: Some(2_000), ..SimConfig::default() }
}

/// Two rooms side by side (x ∈ [0,4] and [4,8], y ∈ [0,4]) joined by a
/// door at x = 4, y ∈ [1.5,2.5]; an exit at x = 8 with the same span.
/// Journey: a single exit stage just outside the exit door.
struct Corridor {
    building: Building,
    left:     SubRoomId,
    right:    SubRoomId,
    door:     NavLineId,
    exit:     NavLineId,
    journeys: JourneyRegistry,
    journey:  JourneyId,
    stage:    StageId,
}

fn corridor(door_limits: DoorLimits) -> Corridor {
    let mut b = BuildingBuilder::new();
    let ra = b.add_room("a");
    let rb = b.add_room("b");
    let left = b.add_subroom(ra, "left", vec![
        seg(0.0, 0.0, 4.0, 0.0),
        seg(4.0, 0.0, 4.0, 1.5),
        seg(4.0, 2.5, 4.0, 4.0),
        seg(4.0, 4.0, 0.0, 4.0),
        seg(0.0, 4.0, 0.0, 0.0),
    ]);
    let right = b.add_subroom(rb, "right", vec![
        seg(4.0, 0.0, 8.0, 0.0),
        seg(8.0, 0.0, 8.0, 1.5),
        seg(8.0, 2.5, 8.0, 4.0),
        seg(8.0, 4.0, 4.0, 4.0),
        seg(4.0, 4.0, 4.0, 2.5),
        seg(4.0, 1.5, 4.0, 0.0),
    ]);
    let door = b.add_room_door("a-b", seg(4.0, 1.5, 4.0, 2.5), left, Some(right), door_limits);
    let exit = b.add_room_door("exit", seg(8.0, 1.5, 8.0, 2.5), right, None, DoorLimits::default());
    let building = b.build().unwrap();

    let mut journeys = JourneyRegistry::new();
    let stage = journeys
        .add_stage(StageSpec::Exit { polygon: Polygon::rectangle(p(8.0, 1.5), p(9.0, 2.5)) })
        .unwrap();
    let journey = journeys.add_journey(JourneyDesc::single(stage)).unwrap();
    Corridor { building, left, right, door, exit, journeys, journey, stage }
}

impl Corridor {
    fn sim(&self, config: SimConfig) -> Sim {
        SimBuilder::new(config, self.building.clone()).journeys(self.journeys.clone()).build().unwrap()
    }

    fn sim_with(&self, config: SimConfig, model: Box<dyn OperationalModel>) -> Sim {
        SimBuilder::new(config, self.building.clone())
            .journeys(self.journeys.clone())
            .custom_model(model)
            .build()
            .unwrap()
    }
}

/// A closed 20 × 10 hall.
fn hall() -> Building {
    let mut b = BuildingBuilder::new();
    let r = b.add_room("hall");
    b.add_subroom(r, "floor", vec![
        seg(0.0, 0.0, 20.0, 0.0),
        seg(20.0, 0.0, 20.0, 10.0),
        seg(20.0, 10.0, 0.0, 10.0),
        seg(0.0, 10.0, 0.0, 0.0),
    ]);
    b.build().unwrap()
}

/// Hall journeys: a final waypoint at (18, 5).
fn waypoint_journey() -> (JourneyRegistry, JourneyId, StageId) {
    let mut journeys = JourneyRegistry::new();
    let stage = journeys
        .add_stage(StageSpec::Waypoint { position: p(18.0, 5.0), distance: 0.5 })
        .unwrap();
    let journey = journeys.add_journey(JourneyDesc::single(stage)).unwrap();
    (journeys, journey, stage)
}

fn every_agent_in_its_subroom(sim: &Sim) -> bool {
    sim.agents().iter().all(|a| {
        sim.building().subroom(a.subroom).is_some_and(|s| s.contains(a.pos) && s.room == a.room)
    })
}

/// Moves every agent to a fixed point in one step.
struct Teleport(Point);

impl OperationalModel for Teleport {
    fn interaction_radius(&self) -> f64 {
        0.0
    }

    fn compute_update(&self, agent: &Agent, _ctx: &ModelContext<'_>, _dt: f64) -> ModelResult<ModelUpdate> {
        Ok(ModelUpdate {
            position:    self.0,
            velocity:    Point::ZERO,
            orientation: agent.orientation,
            state:       agent.state,
        })
    }

    fn validate_agent(&self, _agent: &Agent, _ctx: &ModelContext<'_>) -> ModelResult<()> {
        Ok(())
    }
}

/// Fails every update.
struct Diverging;

impl OperationalModel for Diverging {
    fn interaction_radius(&self) -> f64 {
        0.0
    }

    fn compute_update(&self, agent: &Agent, _ctx: &ModelContext<'_>, _dt: f64) -> ModelResult<ModelUpdate> {
        Err(ModelError::NonFinite { agent: agent.id, quantity: "position" })
    }

    fn validate_agent(&self, _agent: &Agent, _ctx: &ModelContext<'_>) -> ModelResult<()> {
        Ok(())
    }
}

fn teleport_sim(target: Point, policy: LostAgentPolicy) -> (Sim, Corridor) {
    let c = corridor(DoorLimits::default());
    let sim = c.sim_with(SimConfig { lost_agent_policy: policy, ..config() }, Box::new(Teleport(target)));
    (sim, c)
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let sim = SimBuilder::new(config(), hall()).build().unwrap();
        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.iteration_count(), 0);
        assert_eq!(sim.elapsed_time(), 0.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = SimConfig { dt: -1.0, ..config() };
        assert!(matches!(SimBuilder::new(bad, hall()).build(), Err(SimError::Core(_))));
    }

    #[test]
    fn source_stage_must_belong_to_its_journey() {
        let (mut journeys, journey, _) = waypoint_journey();
        let other = journeys
            .add_stage(StageSpec::Waypoint { position: p(5.0, 5.0), distance: 0.5 })
            .unwrap();
        let result = SimBuilder::new(config(), hall())
            .journeys(journeys)
            .source(SourceSpec::new(journey, other, vec![p(2.0, 2.0)]))
            .build();
        assert!(matches!(result, Err(SimError::Journey(JourneyError::StageNotInJourney { .. }))));
    }
}

// ── Agents ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod agent_tests {
    use super::*;

    #[test]
    fn add_agent_locates_and_reports() {
        let c = corridor(DoorLimits::default());
        let (journey, stage, right) = (c.journey, c.stage, c.right);
        let mut sim = c.sim(config());
        let id = sim.add_agent(AgentSpec::new(p(6.0, 2.0), journey, stage)).unwrap();

        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.subroom, right);
        assert_eq!(agent.stage, stage);
        assert_eq!(sim.journeys().stage(stage).unwrap().targeting(), 1);

        sim.iterate().unwrap();
        assert!(sim.events().contains(&SimEvent::AgentAdded { agent: id, position: p(6.0, 2.0) }));
        assert_eq!(sim.stats().agents_added, 1);
    }

    #[test]
    fn add_agent_outside_building_fails() {
        let c = corridor(DoorLimits::default());
        let (journey, stage) = (c.journey, c.stage);
        let mut sim = c.sim(config());
        let err = sim.add_agent(AgentSpec::new(p(20.0, 2.0), journey, stage)).unwrap_err();
        assert!(matches!(err, SimError::OutsideBuilding(_)));
        assert_eq!(sim.agent_count(), 0);
    }

    #[test]
    fn add_agent_checks_model_constraints() {
        let c = corridor(DoorLimits::default());
        let (journey, stage) = (c.journey, c.stage);
        let mut sim = c.sim(config());
        sim.add_agent(AgentSpec::new(p(2.0, 2.0), journey, stage)).unwrap();

        let overlap = sim.add_agent(AgentSpec::new(p(2.1, 2.0), journey, stage));
        assert!(matches!(overlap, Err(SimError::Model(ModelError::Constraint(_)))));
        let at_wall = sim.add_agent(AgentSpec::new(p(0.1, 2.0), journey, stage));
        assert!(matches!(at_wall, Err(SimError::Model(ModelError::Constraint(_)))));
        assert_eq!(sim.agent_count(), 1);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let c = corridor(DoorLimits::default());
        let (journey, stage) = (c.journey, c.stage);
        let mut sim = c.sim(config());

        let bad_stage = sim.add_agent(AgentSpec::new(p(2.0, 2.0), journey, StageId(9)));
        assert!(matches!(bad_stage, Err(SimError::UnknownStage(StageId(9)))));
        let bad_journey = sim.add_agent(AgentSpec::new(p(2.0, 2.0), JourneyId(9), stage));
        assert!(matches!(bad_journey, Err(SimError::UnknownJourney(JourneyId(9)))));
        assert!(matches!(sim.remove_agent(AgentId(5)), Err(SimError::UnknownAgent(AgentId(5)))));
    }

    #[test]
    fn remove_agent_by_command() {
        let c = corridor(DoorLimits::default());
        let (journey, stage) = (c.journey, c.stage);
        let mut sim = c.sim(config());
        let id = sim.add_agent(AgentSpec::new(p(2.0, 2.0), journey, stage)).unwrap();

        sim.remove_agent(id).unwrap();
        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.journeys().stage(stage).unwrap().targeting(), 0);
        sim.iterate().unwrap();
        assert!(sim.events().contains(&SimEvent::AgentRemoved { agent: id, cause: RemovalCause::Removed }));
        assert_eq!(sim.stats().removed_by_command, 1);
    }

    #[test]
    fn ids_are_never_reused() {
        let c = corridor(DoorLimits::default());
        let (journey, stage) = (c.journey, c.stage);
        let mut sim = c.sim(config());
        let a = sim.add_agent(AgentSpec::new(p(2.0, 2.0), journey, stage)).unwrap();
        sim.remove_agent(a).unwrap();
        let b = sim.add_agent(AgentSpec::new(p(2.0, 2.0), journey, stage)).unwrap();
        assert!(b > a);
    }

    #[test]
    fn switch_journey_moves_stage_bookkeeping() {
        let (mut journeys, wp_journey, wp) = waypoint_journey();
        let exit = journeys
            .add_stage(StageSpec::Exit { polygon: Polygon::rectangle(p(15.0, 4.0), p(16.0, 6.0)) })
            .unwrap();
        let exit_journey = journeys.add_journey(JourneyDesc::single(exit)).unwrap();
        let mut sim = SimBuilder::new(config(), hall()).journeys(journeys).build().unwrap();
        let id = sim.add_agent(AgentSpec::new(p(2.0, 5.0), exit_journey, exit)).unwrap();

        sim.switch_agent_journey(id, wp_journey, wp).unwrap();
        assert_eq!(sim.agent(id).unwrap().journey, wp_journey);
        assert_eq!(sim.journeys().stage(exit).unwrap().targeting(), 0);
        assert_eq!(sim.journeys().stage(wp).unwrap().targeting(), 1);

        let mismatch = sim.switch_agent_journey(id, exit_journey, wp);
        assert!(matches!(mismatch, Err(SimError::Journey(JourneyError::StageNotInJourney { .. }))));
        assert!(matches!(
            sim.switch_agent_journey(AgentId(77), wp_journey, wp),
            Err(SimError::UnknownAgent(_))
        ));
    }

    #[test]
    fn spatial_queries() {
        let (journeys, journey, stage) = waypoint_journey();
        let mut sim = SimBuilder::new(config(), hall()).journeys(journeys).build().unwrap();
        let a = sim.add_agent(AgentSpec::new(p(2.0, 2.0), journey, stage)).unwrap();
        let b = sim.add_agent(AgentSpec::new(p(2.0, 5.0), journey, stage)).unwrap();
        let c = sim.add_agent(AgentSpec::new(p(6.0, 5.0), journey, stage)).unwrap();

        assert_eq!(sim.agents_in_range(p(2.0, 4.0), 1.0), vec![b]);
        assert_eq!(sim.agents_in_range(p(4.0, 5.0), 2.0), vec![b, c]);
        let area = Polygon::rectangle(p(1.0, 1.0), p(3.0, 6.0));
        assert_eq!(sim.agents_in_polygon(&area), vec![a, b]);
    }
}

// ── Stages and sources ────────────────────────────────────────────────────────

#[cfg(test)]
mod stage_tests {
    use super::*;

    #[test]
    fn source_respects_cap_and_frequency() {
        let (journeys, journey, stage) = waypoint_journey();
        let spec = SourceSpec::new(journey, stage, vec![p(2.0, 2.0), p(2.0, 5.0), p(2.0, 8.0)])
            .frequency(10)
            .max_agents(3);
        let mut sim = SimBuilder::new(config(), hall()).journeys(journeys).source(spec).build().unwrap();

        sim.run_iterations(1, &mut NoopObserver).unwrap();
        assert_eq!(sim.agent_count(), 1);
        sim.run_iterations(10, &mut NoopObserver).unwrap();
        assert_eq!(sim.agent_count(), 2);
        sim.run_iterations(40, &mut NoopObserver).unwrap();
        assert_eq!(sim.agent_count(), 3);
        assert_eq!(sim.stats().agents_added, 3);
        assert!(sim.sources()[0].is_exhausted());
    }

    #[test]
    fn blocked_spawn_is_retried() {
        let (journeys, journey, stage) = waypoint_journey();
        let spec = SourceSpec::new(journey, stage, vec![p(2.0, 5.0)]).chunk(2).max_agents(2);
        let mut sim = SimBuilder::new(config(), hall()).journeys(journeys).source(spec).build().unwrap();

        sim.iterate().unwrap();
        assert_eq!(sim.agent_count(), 1);
        assert_eq!(sim.stats().deferred_spawns, 1);
        assert!(!sim.sources()[0].is_exhausted());

        sim.run_iterations(100, &mut NoopObserver).unwrap();
        assert_eq!(sim.agent_count(), 2);
        assert!(sim.sources()[0].is_exhausted());
    }

    #[test]
    fn waiting_set_holds_until_released() {
        let mut journeys = JourneyRegistry::new();
        let wait = journeys.add_stage(StageSpec::WaitingSet { slots: vec![p(10.0, 5.0)] }).unwrap();
        let next = journeys
            .add_stage(StageSpec::Waypoint { position: p(15.0, 5.0), distance: 0.5 })
            .unwrap();
        let journey = journeys
            .add_journey(JourneyDesc::new([wait, next]).transition(wait, Transition::Fixed(next)))
            .unwrap();
        let mut sim = SimBuilder::new(config(), hall()).journeys(journeys).build().unwrap();
        let id = sim.add_agent(AgentSpec::new(p(7.0, 5.0), journey, wait)).unwrap();

        sim.run_iterations(600, &mut NoopObserver).unwrap();
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.stage, wait);
        assert!(agent.pos.distance(p(10.0, 5.0)) < 0.05);

        sim.set_waiting_set_state(wait, WaitingSetState::Inactive).unwrap();
        sim.run_iterations(2, &mut NoopObserver).unwrap();
        assert_eq!(sim.agent(id).unwrap().stage, next);
        assert_eq!(sim.journeys().stage(wait).unwrap().targeting(), 0);
    }

    #[test]
    fn stage_commands_check_the_stage_kind() {
        let (journeys, _, stage) = waypoint_journey();
        let mut sim = SimBuilder::new(config(), hall()).journeys(journeys).build().unwrap();
        assert!(matches!(
            sim.set_waiting_set_state(stage, WaitingSetState::Inactive),
            Err(SimError::Journey(JourneyError::NotAWaitingSet(_)))
        ));
        assert!(matches!(sim.pop_queue(stage, 1), Err(SimError::Journey(JourneyError::NotAQueue(_)))));
        assert!(matches!(sim.pop_queue(StageId(3), 1), Err(SimError::UnknownStage(_))));
    }

    #[test]
    fn exit_stage_inside_building_removes_as_reached_goal() {
        let mut journeys = JourneyRegistry::new();
        let exit = journeys
            .add_stage(StageSpec::Exit { polygon: Polygon::rectangle(p(15.0, 4.0), p(16.0, 6.0)) })
            .unwrap();
        let journey = journeys.add_journey(JourneyDesc::single(exit)).unwrap();
        let mut sim = SimBuilder::new(config(), hall()).journeys(journeys).build().unwrap();
        let id = sim.add_agent(AgentSpec::new(p(12.0, 5.0), journey, exit)).unwrap();

        let mut log = EventLog::default();
        sim.run_iterations(400, &mut log).unwrap();
        assert_eq!(sim.agent_count(), 0);
        assert!(log
            .events
            .iter()
            .any(|(_, e)| *e == SimEvent::AgentRemoved { agent: id, cause: RemovalCause::ReachedGoal }));
        assert_eq!(sim.stats().reached_goal, 1);
        assert_eq!(sim.stats().lost, 0);
    }
}

// ── Relocation and doors ──────────────────────────────────────────────────────

#[cfg(test)]
mod door_tests {
    use super::*;

    #[test]
    fn crossing_relocates_and_counts_the_door() {
        let (mut sim, c) = teleport_sim(p(6.0, 2.0), LostAgentPolicy::Remove);
        let id = sim.add_agent(AgentSpec::new(p(3.7, 2.0), c.journey, c.stage)).unwrap();
        assert_eq!(sim.agent(id).unwrap().subroom, c.left);

        sim.iterate().unwrap();
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.subroom, c.right);
        assert_eq!(sim.building().subroom(c.right).unwrap().room, agent.room);
        assert_eq!(sim.door_usage(c.door).unwrap(), 1);
        assert!(sim.events().contains(&SimEvent::DoorCrossed {
            agent:     id,
            door:      c.door,
            direction: CrossingDirection::Outbound,
        }));
    }

    #[test]
    fn walking_out_through_both_doors() {
        let c = corridor(DoorLimits::default());
        let (journey, stage, door, exit) = (c.journey, c.stage, c.door, c.exit);
        let mut sim = c.sim(config());
        let id = sim.add_agent(AgentSpec::new(p(3.7, 2.0), journey, stage)).unwrap();

        let mut usage = 0;
        let mut log = EventLog::default();
        for _ in 0..1_000 {
            sim.run_iterations(1, &mut log).unwrap();
            assert!(every_agent_in_its_subroom(&sim));
            let now = sim.door_usage(door).unwrap();
            assert!(now >= usage);
            usage = now;
        }

        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.door_usage(door).unwrap(), 1);
        assert_eq!(sim.door_usage(exit).unwrap(), 1);
        assert!(log
            .events
            .iter()
            .any(|(_, e)| *e == SimEvent::AgentRemoved { agent: id, cause: RemovalCause::LeftBuilding }));
        assert_eq!(sim.stats().left_building, 1);
        let curve = sim.building().door_flow(exit).unwrap().flow_curve();
        assert_eq!(curve.len(), 1);
        assert_eq!(curve[0].usage, 1);
    }

    #[test]
    fn max_usage_closes_and_reset_reopens() {
        let c = corridor(DoorLimits::default().with_max_usage(1).with_dn(1));
        let (journey, stage, door) = (c.journey, c.stage, c.door);
        let mut sim = c.sim(config());
        sim.add_agent(AgentSpec::new(p(3.7, 2.0), journey, stage)).unwrap();

        let mut log = EventLog::default();
        sim.run_iterations(100, &mut log).unwrap();
        assert_eq!(sim.building().door_flow(door).unwrap().state(), DoorState::TempClose);
        assert!(log.events.iter().any(|(_, e)| *e
            == SimEvent::DoorStateChanged { door, from: DoorState::Open, to: DoorState::TempClose }));

        sim.reset_door_usage(door).unwrap();
        assert_eq!(sim.building().door_flow(door).unwrap().state(), DoorState::Open);
        sim.iterate().unwrap();
        assert!(sim.events().contains(&SimEvent::DoorStateChanged {
            door,
            from: DoorState::TempClose,
            to:   DoorState::Open,
        }));
        assert_eq!(sim.door_usage(door).unwrap(), 1);
    }

    #[test]
    fn closed_door_makes_routing_fail_without_stopping() {
        let c = corridor(DoorLimits::default());
        let (journey, stage, door) = (c.journey, c.stage, c.door);
        let mut sim = c.sim(config());
        let id = sim.add_agent(AgentSpec::new(p(2.0, 2.0), journey, stage)).unwrap();
        sim.set_door_state(door, DoorState::Close).unwrap();

        sim.iterate().unwrap();
        assert_eq!(sim.stats().routing_failures, 1);
        assert!(sim.events().iter().any(|e| matches!(e, SimEvent::RoutingFailed { agent, .. } if *agent == id)));
        assert!(sim.events().contains(&SimEvent::DoorStateChanged {
            door,
            from: DoorState::Open,
            to:   DoorState::Close,
        }));
        assert_eq!(sim.agent_count(), 1);
    }

    fn door_changes<'a>(events: impl IntoIterator<Item = &'a SimEvent>) -> Vec<(DoorState, DoorState)> {
        events
            .into_iter()
            .filter_map(|e| match e {
                SimEvent::DoorStateChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn booked_door_changes_fire_on_their_iteration() {
        let c = corridor(DoorLimits::default());
        let door = c.door;
        let mut sim = c.sim(config());
        let dt = sim.config().dt;
        sim.schedule_door_event(5.0 * dt, door, DoorState::Close).unwrap();
        sim.schedule_door_event(8.0 * dt, door, DoorState::Open).unwrap();
        assert_eq!(sim.scheduled_door_events(), 2);

        let mut log = EventLog::default();
        sim.run_iterations(5, &mut log).unwrap();
        assert!(door_changes(log.events.iter().map(|(_, e)| e)).is_empty());
        assert_eq!(sim.building().door_flow(door).unwrap().state(), DoorState::Open);

        sim.iterate().unwrap();
        assert_eq!(sim.building().door_flow(door).unwrap().state(), DoorState::Close);
        assert_eq!(door_changes(sim.events()), vec![(DoorState::Open, DoorState::Close)]);
        assert_eq!(sim.scheduled_door_events(), 1);

        sim.run_iterations(2, &mut NoopObserver).unwrap();
        assert_eq!(sim.building().door_flow(door).unwrap().state(), DoorState::Close);

        sim.iterate().unwrap();
        assert_eq!(sim.building().door_flow(door).unwrap().state(), DoorState::Open);
        assert_eq!(door_changes(sim.events()), vec![(DoorState::Close, DoorState::Open)]);
        assert_eq!(sim.scheduled_door_events(), 0);
        assert_eq!(sim.stats().door_state_changes, 2);
    }

    #[test]
    fn booked_closure_in_the_past_applies_before_routing() {
        let c = corridor(DoorLimits::default());
        let (journey, stage, door) = (c.journey, c.stage, c.door);
        let mut sim = c.sim(config());
        let id = sim.add_agent(AgentSpec::new(p(2.0, 2.0), journey, stage)).unwrap();
        sim.run_iterations(10, &mut NoopObserver).unwrap();

        sim.schedule_door_event(0.0, door, DoorState::Close).unwrap();
        sim.iterate().unwrap();
        assert_eq!(door_changes(sim.events()), vec![(DoorState::Open, DoorState::Close)]);
        assert!(sim.events().iter().any(|e| matches!(e, SimEvent::RoutingFailed { agent, .. } if *agent == id)));

        // Booking the state the door is already in changes nothing.
        sim.schedule_door_event(sim.elapsed_time(), door, DoorState::Close).unwrap();
        sim.iterate().unwrap();
        assert!(door_changes(sim.events()).is_empty());
        assert_eq!(sim.scheduled_door_events(), 0);
    }

    #[test]
    fn invalid_bookings_are_rejected() {
        let c = corridor(DoorLimits::default());
        let door = c.door;
        let mut sim = c.sim(config());
        let unknown = sim.schedule_door_event(1.0, NavLineId(99), DoorState::Close);
        assert!(matches!(unknown, Err(SimError::Geometry(_))));
        for time in [f64::NAN, f64::INFINITY, -0.5] {
            let bad = sim.schedule_door_event(time, door, DoorState::Close);
            assert!(matches!(bad, Err(SimError::Config(_))), "time {time}");
        }
        assert_eq!(sim.scheduled_door_events(), 0);
    }

    #[test]
    fn edge_factor_needs_a_door() {
        let c = corridor(DoorLimits::default());
        let door = c.door;
        let mut sim = c.sim(config());
        sim.apply_edge_factor(ps_routing::EdgeFactor::new(door, "smoke", 5.0)).unwrap();
        let missing = sim.apply_edge_factor(ps_routing::EdgeFactor::new(NavLineId(99), "smoke", 5.0));
        assert!(matches!(missing, Err(SimError::Geometry(_))));
    }

    #[test]
    fn lost_agent_is_removed_under_remove_policy() {
        let (mut sim, c) = teleport_sim(p(50.0, 50.0), LostAgentPolicy::Remove);
        let id = sim.add_agent(AgentSpec::new(p(2.0, 2.0), c.journey, c.stage)).unwrap();

        sim.iterate().unwrap();
        assert_eq!(sim.agent_count(), 0);
        assert!(sim.events().contains(&SimEvent::AgentRemoved { agent: id, cause: RemovalCause::Lost }));
        assert_eq!(sim.stats().lost, 1);
        assert_eq!(sim.stats().reached_goal, 0);
        assert_eq!(sim.journeys().stage(c.stage).unwrap().targeting(), 0);
    }

    #[test]
    fn lost_agent_halts_under_halt_policy() {
        let (mut sim, c) = teleport_sim(p(50.0, 50.0), LostAgentPolicy::Halt);
        let id = sim.add_agent(AgentSpec::new(p(2.0, 2.0), c.journey, c.stage)).unwrap();
        match sim.iterate() {
            Err(SimError::LostAgent { agent, position }) => {
                assert_eq!(agent, id);
                assert_eq!(position, p(50.0, 50.0));
            }
            other => panic!("expected LostAgent, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_update_is_fatal_and_not_committed() {
        let c = corridor(DoorLimits::default());
        let mut sim = c.sim_with(config(), Box::new(Diverging));
        let id = sim.add_agent(AgentSpec::new(p(2.0, 2.0), c.journey, c.stage)).unwrap();

        let err = sim.iterate().unwrap_err();
        assert!(matches!(err, SimError::Model(ModelError::NonFinite { .. })));
        assert_eq!(sim.agent(id).unwrap().pos, p(2.0, 2.0));
    }
}

// ── Run loop and observers ────────────────────────────────────────────────────

#[cfg(test)]
mod schedule_tests {
    use super::*;
    use crate::{DoorEvent, DoorSchedule};

    fn booking(time: f64, door: u32, state: DoorState) -> DoorEvent {
        DoorEvent { time, door: NavLineId(door), state }
    }

    #[test]
    fn times_map_to_the_first_iteration_at_or_after_them() {
        let mut schedule = DoorSchedule::new();
        schedule.push(booking(0.3, 0, DoorState::Close), 0.1);
        schedule.push(booking(0.31, 1, DoorState::Close), 0.1);
        assert_eq!(schedule.next_due(), Some(Iteration(3)));
        assert_eq!(schedule.len(), 2);

        assert!(schedule.drain_due(Iteration(2)).is_empty());
        let due = schedule.drain_due(Iteration(3));
        assert_eq!(due, vec![booking(0.3, 0, DoorState::Close)]);
        assert_eq!(schedule.next_due(), Some(Iteration(4)));
    }

    #[test]
    fn overdue_bookings_drain_in_order() {
        let mut schedule = DoorSchedule::new();
        schedule.push(booking(0.5, 2, DoorState::Open), 0.1);
        schedule.push(booking(0.2, 2, DoorState::Close), 0.1);
        schedule.push(booking(0.5, 2, DoorState::Close), 0.1);

        let due = schedule.drain_due(Iteration(10));
        let states: Vec<DoorState> = due.iter().map(|e| e.state).collect();
        assert_eq!(states, vec![DoorState::Close, DoorState::Open, DoorState::Close]);
        assert!(schedule.is_empty());
        assert_eq!(schedule.next_due(), None);
    }
}

#[cfg(test)]
mod run_tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        starts:    u64,
        ends:      u64,
        snapshots: Vec<(Iteration, usize)>,
        finished:  bool,
        last_time: f64,
    }

    impl SimObserver for Counter {
        fn on_iteration_start(&mut self, _iteration: Iteration, _time: f64) {
            self.starts += 1;
        }

        fn on_iteration_end(&mut self, report: &IterationReport<'_>) {
            self.ends += 1;
            self.last_time = report.time;
        }

        fn on_snapshot(&mut self, iteration: Iteration, _time: f64, agents: &[AgentSnapshot]) {
            self.snapshots.push((iteration, agents.len()));
        }

        fn on_sim_end(&mut self, _final: Iteration, _stats: &crate::SimStats, _building: &Building) {
            self.finished = true;
        }
    }

    #[test]
    fn run_stops_at_max_iterations() {
        let (journeys, journey, stage) = waypoint_journey();
        let cfg = SimConfig { max_iterations: Some(25), snapshot_interval: 10, ..config() };
        let mut sim = SimBuilder::new(cfg, hall()).journeys(journeys).build().unwrap();
        sim.add_agent(AgentSpec::new(p(2.0, 5.0), journey, stage)).unwrap();

        let mut counter = Counter::default();
        sim.run(&mut counter).unwrap();
        assert_eq!(sim.iteration_count(), 25);
        assert_eq!(counter.starts, 25);
        assert_eq!(counter.ends, 25);
        assert!((counter.last_time - 0.25).abs() < 1e-9);
        assert_eq!(counter.snapshots, vec![(Iteration(10), 1), (Iteration(20), 1)]);
        assert!(counter.finished);
    }

    #[test]
    fn run_stops_at_max_time() {
        let cfg = SimConfig { max_iterations: None, max_time: Some(0.5), dt: 0.05, ..config() };
        let mut sim = SimBuilder::new(cfg, hall()).build().unwrap();
        sim.run(&mut NoopObserver).unwrap();
        assert_eq!(sim.iteration_count(), 10);
    }

    #[test]
    fn empty_run_without_limits_ends_immediately() {
        let cfg = SimConfig { max_iterations: None, max_time: None, ..config() };
        let mut sim = SimBuilder::new(cfg, hall()).build().unwrap();
        let mut counter = Counter::default();
        sim.run(&mut counter).unwrap();
        assert_eq!(sim.iteration_count(), 0);
        assert!(counter.finished);
    }

    #[test]
    fn shutdown_flag_stops_the_run() {
        let (journeys, journey, stage) = waypoint_journey();
        let mut sim = SimBuilder::new(config(), hall()).journeys(journeys).build().unwrap();
        sim.add_agent(AgentSpec::new(p(2.0, 5.0), journey, stage)).unwrap();
        sim.shutdown_handle().store(true, std::sync::atomic::Ordering::Relaxed);

        sim.run(&mut NoopObserver).unwrap();
        assert_eq!(sim.iteration_count(), 0);
        sim.run_iterations(5, &mut NoopObserver).unwrap();
        assert_eq!(sim.iteration_count(), 0);
    }

    #[test]
    fn runs_are_reproducible() {
        let trajectory = || {
            let (journeys, journey, stage) = waypoint_journey();
            let spec = SourceSpec::new(journey, stage, vec![p(2.0, 2.0), p(2.0, 5.0), p(2.0, 8.0)])
                .max_agents(3)
                .v0_range(0.8, 1.4);
            let mut sim =
                SimBuilder::new(config(), hall()).journeys(journeys).source(spec).build().unwrap();
            sim.run_iterations(200, &mut NoopObserver).unwrap();
            sim.snapshots()
        };
        assert_eq!(trajectory(), trajectory());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn thread_count_does_not_change_trajectories() {
        let trajectory = |num_threads: Option<usize>| {
            let (journeys, journey, stage) = waypoint_journey();
            let config = SimConfig { num_threads, ..config() };
            let mut sim = SimBuilder::new(config, hall()).journeys(journeys).build().unwrap();
            for x in [2.0, 4.0, 6.0] {
                for y in [2.0, 4.0, 6.0, 8.0] {
                    sim.add_agent(AgentSpec::new(p(x, y), journey, stage)).unwrap();
                }
            }
            sim.run_iterations(300, &mut NoopObserver).unwrap();
            sim.snapshots()
        };
        let one_thread = trajectory(Some(1));
        assert_eq!(one_thread.len(), 12);
        assert_eq!(one_thread, trajectory(Some(4)));
        assert_eq!(one_thread, trajectory(None));
    }
}
