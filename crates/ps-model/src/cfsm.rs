//! Collision-free speed model.
//!
//! Velocity-based: the walking direction is the desired direction bent by
//! exponential repulsion from neighbours and walls, and the speed is limited
//! by the free space ahead, `min(max(spacing / T, 0), v0)`.

use ps_agent::Agent;
use ps_core::{LineSegment, Point};

use crate::model::{check_range, ensure_finite, orientation_from, ModelUpdate, OperationalModel};
use crate::speed::desired_speed;
use crate::{ConstraintViolation, ModelContext, ModelError, ModelResult};

const VALIDATION_RADIUS: f64 = 2.0;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CfsmParams {
    pub strength_neighbour_repulsion: f64,
    /// Decay length (m) of the neighbour repulsion.
    pub range_neighbour_repulsion:    f64,
    pub strength_geometry_repulsion:  f64,
    pub range_geometry_repulsion:     f64,
    /// Neighbours and walls farther than this are ignored.
    pub cutoff:                       f64,
    /// Width (m) over which a repulsion fades to zero before the cutoff.
    pub taper:                        f64,
    /// Upper bound on the magnitude of a single repulsion term.
    pub max_repulsion:                f64,
}

impl Default for CfsmParams {
    fn default() -> Self {
        Self {
            strength_neighbour_repulsion: 8.0,
            range_neighbour_repulsion:    0.1,
            strength_geometry_repulsion:  5.0,
            range_geometry_repulsion:     0.02,
            cutoff:                       2.0,
            taper:                        0.5,
            max_repulsion:                100.0,
        }
    }
}

pub struct CollisionFreeSpeedModel {
    params: CfsmParams,
}

impl CollisionFreeSpeedModel {
    pub fn new(params: CfsmParams) -> ModelResult<Self> {
        let positive = [
            ("range_neighbour_repulsion", params.range_neighbour_repulsion),
            ("range_geometry_repulsion", params.range_geometry_repulsion),
            ("cutoff", params.cutoff),
            ("max_repulsion", params.max_repulsion),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ModelError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if !(0.0..=params.cutoff).contains(&params.taper) {
            return Err(ModelError::Config(format!(
                "taper {} must lie in [0, cutoff = {}]",
                params.taper, params.cutoff
            )));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &CfsmParams {
        &self.params
    }

    /// 1 up to `cutoff - taper`, 0 from `cutoff` on, smoothstep in between.
    pub(crate) fn taper_weight(&self, distance: f64) -> f64 {
        let CfsmParams { cutoff, taper, .. } = self.params;
        if distance >= cutoff {
            return 0.0;
        }
        if taper <= 0.0 || distance <= cutoff - taper {
            return 1.0;
        }
        let t = (cutoff - distance) / taper;
        t * t * (3.0 - 2.0 * t)
    }

    fn repulsion(&self, strength: f64, range: f64, contact: f64, distance: f64) -> f64 {
        let magnitude = strength * ((contact - distance) / range).exp() * self.taper_weight(distance);
        magnitude.min(self.params.max_repulsion)
    }

    pub(crate) fn neighbour_repulsion(&self, agent: &Agent, other: &Agent) -> Point {
        let offset = other.pos - agent.pos;
        let l = agent.params.radius + other.params.radius;
        let p = &self.params;
        offset.normalized()
            * -self.repulsion(p.strength_neighbour_repulsion, p.range_neighbour_repulsion, l, offset.norm())
    }

    pub(crate) fn boundary_repulsion(&self, agent: &Agent, wall: &LineSegment) -> Point {
        let offset = wall.shortest_point(agent.pos) - agent.pos;
        let p = &self.params;
        offset.normalized()
            * -self.repulsion(
                p.strength_geometry_repulsion,
                p.range_geometry_repulsion,
                agent.params.radius,
                offset.norm(),
            )
    }

    /// Free distance to `other` along `direction`, or infinity if it is not
    /// in the corridor ahead.
    fn spacing(agent: &Agent, other: &Agent, direction: Point) -> f64 {
        let offset = other.pos - agent.pos;
        if direction.dot(offset) < 0.0 {
            return f64::INFINITY;
        }
        let l = agent.params.radius + other.params.radius;
        if direction.rotate90().dot(offset).abs() > l {
            return f64::INFINITY;
        }
        offset.norm() - l
    }
}

impl OperationalModel for CollisionFreeSpeedModel {
    fn interaction_radius(&self) -> f64 {
        self.params.cutoff
    }

    fn compute_update(
        &self,
        agent: &Agent,
        ctx:   &ModelContext<'_>,
        dt:    f64,
    ) -> ModelResult<ModelUpdate> {
        let (v0, mut state) = desired_speed(agent, ctx.building, ctx.time);
        let neighbours: Vec<&Agent> = ctx.visible_neighbours(agent, self.params.cutoff).collect();

        let mut push = Point::ZERO;
        for other in &neighbours {
            push += self.neighbour_repulsion(agent, other);
        }
        for wall in ctx.boundary_within(agent.pos, self.params.cutoff) {
            push += self.boundary_repulsion(agent, wall);
        }

        let desired = (agent.destination - agent.pos).normalized();
        let mut direction = (desired + push).normalized();
        if direction == Point::ZERO {
            direction = agent.orientation;
        }

        let spacing = neighbours
            .iter()
            .map(|other| Self::spacing(agent, other, direction))
            .fold(f64::INFINITY, f64::min);
        // Never step past the waypoint.
        let remaining = agent.pos.distance(agent.destination) / dt;
        let speed = (spacing / agent.params.time_gap).max(0.0).min(v0).min(remaining);
        let velocity = direction * speed;

        state.e0 = desired;
        ensure_finite(agent, ModelUpdate {
            position: agent.pos + velocity * dt,
            velocity,
            orientation: orientation_from(velocity, agent.orientation),
            state,
        })
    }

    fn validate_agent(&self, agent: &Agent, ctx: &ModelContext<'_>) -> ModelResult<()> {
        let p = &agent.params;
        if !(p.radius > 0.0) {
            return Err(ConstraintViolation::OutOfRange {
                agent:     agent.id,
                parameter: "radius",
                value:     p.radius,
                min:       0.0,
                max:       2.0,
            }
            .into());
        }
        check_range(agent, "radius", p.radius, 0.0, 2.0)?;
        check_range(agent, "v0", p.speed.v0, 0.0, 10.0)?;
        check_range(agent, "time_gap", p.time_gap, 0.1, 10.0)?;

        for entry in ctx.grid.get_neighboring_agents(agent.pos, VALIDATION_RADIUS) {
            if entry.id == agent.id {
                continue;
            }
            let Some(other) = ctx.agents.get(entry.id) else { continue };
            let distance = agent.pos.distance(other.pos);
            if p.radius + other.params.radius >= distance {
                return Err(ConstraintViolation::Overlap { agent: agent.id, other: other.id, distance }.into());
            }
        }

        if ctx.boundary_within(agent.pos, p.radius).next().is_some() {
            return Err(ConstraintViolation::TooCloseToWall { agent: agent.id, limit: p.radius }.into());
        }
        Ok(())
    }
}
