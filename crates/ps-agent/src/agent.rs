//! The per-agent record.

use ps_core::{AgentId, JourneyId, NavLineId, Point, RoomId, StageId, SubRoomId};

use crate::params::{AgentParams, SpeedClass};

/// Model-internal state carried between iterations.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelState {
    /// Smoothed desired direction (unit vector or zero).
    pub e0:                Point,
    /// Iterations since the waypoint last changed; drives the smoothing of `e0`.
    pub orientation_delay: u32,
    /// Walking surface of the current subroom.
    pub speed_class:       SpeedClass,
    /// Desired speed at the moment the surface changed.
    pub v0_anchor:         f64,
    /// Simulated time at which the surface changed.
    pub class_since:       f64,
}

impl ModelState {
    pub fn new(v0: f64) -> Self {
        Self {
            e0:                Point::ZERO,
            orientation_delay: 0,
            speed_class:       SpeedClass::Floor,
            v0_anchor:         v0,
            class_since:       f64::NEG_INFINITY,
        }
    }
}

/// One pedestrian.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Agent {
    pub id:          AgentId,
    pub journey:     JourneyId,
    pub stage:       StageId,
    pub room:        RoomId,
    pub subroom:     SubRoomId,
    pub pos:         Point,
    /// Position before the last operational step.
    pub last_pos:    Point,
    pub velocity:    Point,
    /// Unit vector; kept when the agent stands still.
    pub orientation: Point,
    /// Current waypoint chosen by the router.
    pub destination: Point,
    /// Door the current waypoint leads through, if any.
    pub target_door: Option<NavLineId>,
    pub params:      AgentParams,
    pub state:       ModelState,
}

impl Agent {
    #[inline]
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// The step taken during the last operational update.
    #[inline]
    pub fn step(&self) -> ps_core::LineSegment {
        ps_core::LineSegment::new(self.last_pos, self.pos)
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id:          self.id,
            pos:         self.pos,
            velocity:    self.velocity,
            orientation: self.orientation,
            journey:     self.journey,
            stage:       self.stage,
            room:        self.room,
            subroom:     self.subroom,
        }
    }
}

/// A request to add an agent.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentSpec {
    pub position:    Point,
    /// Initial facing; normalised on insertion, `(1, 0)` if zero.
    pub orientation: Point,
    pub journey:     JourneyId,
    pub stage:       StageId,
    pub params:      AgentParams,
}

impl AgentSpec {
    pub fn new(position: Point, journey: JourneyId, stage: StageId) -> Self {
        Self {
            position,
            orientation: Point::new(1.0, 0.0),
            journey,
            stage,
            params: AgentParams::default(),
        }
    }

    pub fn with_params(mut self, params: AgentParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_orientation(mut self, orientation: Point) -> Self {
        self.orientation = orientation;
        self
    }

    /// Materialise the agent once the store has issued its ID and the
    /// simulation has located it.
    pub fn into_agent(self, id: AgentId, room: RoomId, subroom: SubRoomId) -> Agent {
        let orientation = match self.orientation.normalized() {
            o if o == Point::ZERO => Point::new(1.0, 0.0),
            o => o,
        };
        Agent {
            id,
            journey: self.journey,
            stage: self.stage,
            room,
            subroom,
            pos: self.position,
            last_pos: self.position,
            velocity: Point::ZERO,
            orientation,
            destination: self.position,
            target_door: None,
            params: self.params,
            state: ModelState::new(self.params.speed.v0),
        }
    }
}

/// Externally visible state of one agent at the end of an iteration.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentSnapshot {
    pub id:          AgentId,
    pub pos:         Point,
    pub velocity:    Point,
    pub orientation: Point,
    pub journey:     JourneyId,
    pub stage:       StageId,
    pub room:        RoomId,
    pub subroom:     SubRoomId,
}
