//! Generalized centrifugal force model.
//!
//! Agents are velocity-dependent ellipses.  The acceleration is the sum of
//! a driving force towards the waypoint and repulsive forces from visible
//! neighbours and nearby walls, divided by the mass.
//!
//! # Repulsion profile
//!
//! Both repulsions are piecewise in the effective distance `s` (gap between
//! the bodies):
//!
//! ```text
//!        smax        left                       right        cutoff
//!   ------|-----------|---------------------------|-------------|------
//!     5   |     4     |             3             |      2      |  1
//! ```
//!
//! Region 3 is the centrifugal `1/s` force, region 1 is zero, region 2 is a
//! Hermite spline that brings the force smoothly to zero at the cutoff and
//! region 4 one that blends into the clamp of region 5.

use ps_agent::Agent;
use ps_core::{LineSegment, Point, EPS};
use tracing::warn;

use crate::ellipse::Ellipse;
use crate::integrator::{Drive, ForceModel, Integrator, Kinematics};
use crate::model::{check_range, ensure_finite, orientation_from, ModelUpdate, OperationalModel};
use crate::speed::{desired_speed, smoothed_v0};
use crate::{ConstraintViolation, ModelContext, ModelError, ModelResult};

/// Assumed centre spacing at contact; anchors the inner regions.
const CONTACT_DISTANCE: f64 = 0.5;
/// No new desired direction is taken closer than this to the waypoint.
const GOAL_EPS: f64 = 0.005;
/// Walls shorter than 10 cm exert no force.
const MIN_WALL_LENGTH_SQ: f64 = 0.01;
/// Radius of the insertion-time overlap check.
const VALIDATION_RADIUS: f64 = 2.0;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GcfmParams {
    /// Strength of the neighbour repulsion (ν).
    pub nu_ped:                   f64,
    /// Strength of the wall repulsion.
    pub nu_wall:                  f64,
    /// Effective distance beyond which neighbours exert no force.
    pub ped_cutoff:               f64,
    pub wall_cutoff:              f64,
    /// Width of the Hermite blends at both ends of region 3.
    pub ped_interpolation_width:  f64,
    pub wall_interpolation_width: f64,
    /// Clamp factor of the contact region.
    pub ped_max_force:            f64,
    pub wall_max_force:           f64,
    /// Radius of the neighbour query.
    pub neighbour_radius:         f64,
    pub integrator:               Integrator,
}

impl Default for GcfmParams {
    fn default() -> Self {
        Self {
            nu_ped:                   0.3,
            nu_wall:                  0.2,
            ped_cutoff:               2.0,
            wall_cutoff:              2.0,
            ped_interpolation_width:  0.1,
            wall_interpolation_width: 0.1,
            ped_max_force:            3.0,
            wall_max_force:           3.0,
            neighbour_radius:         4.0,
            integrator:               Integrator::default(),
        }
    }
}

/// Cubic Hermite interpolation on `[x1, x2]` with end values `y1`, `y2` and
/// end slopes `dy1`, `dy2`.
pub fn hermite_interp(x: f64, x1: f64, x2: f64, y1: f64, y2: f64, dy1: f64, dy2: f64) -> f64 {
    let scale = x2 - x1;
    let t = (x - x1) / scale;
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h10 = t3 - 2.0 * t2 + t;
    let h11 = t3 - t2;
    y1 * h00 + dy1 * h10 * scale + y2 * h01 + dy2 * h11 * scale
}

/// Smoothed desired direction.
///
/// Turns from `previous` towards the waypoint with time constant `tau`;
/// `delay` counts the steps since the waypoint changed.  A fresh agent
/// (zero `previous`) faces the waypoint at once.
pub fn mollify_e0(target: Point, pos: Point, previous: Point, delay: u32, dt: f64, tau: f64) -> Point {
    let desired = (target - pos).normalized();
    if previous == Point::ZERO {
        return desired;
    }
    let t = f64::from(delay) * dt;
    previous + (desired - previous) * (1.0 - (-t / tau).exp())
}

/// Scalar repulsion over the five regions.  `nominator` is the region-3
/// numerator; returns a non-positive magnitude along the direction to the
/// source.
pub(crate) fn piecewise_repulsion(s: f64, nominator: f64, cutoff: f64, width: f64, max_force: f64) -> f64 {
    let smax = CONTACT_DISTANCE - width;
    let left = CONTACT_DISTANCE + width;
    let right = cutoff - width;
    if s >= cutoff {
        0.0
    } else if s <= smax {
        -nominator / left * max_force
    } else if s >= right {
        let f = -nominator / right;
        hermite_interp(s, right, cutoff, f, 0.0, -f / right, 0.0)
    } else if s >= left {
        -nominator / s.abs()
    } else {
        let f = -nominator / left;
        hermite_interp(s, smax, left, max_force * f, f, 0.0, -f / left)
    }
}

pub struct GeneralizedCentrifugalForceModel {
    params: GcfmParams,
}

impl GeneralizedCentrifugalForceModel {
    pub fn new(params: GcfmParams) -> ModelResult<Self> {
        let finite = [
            ("nu_ped", params.nu_ped),
            ("nu_wall", params.nu_wall),
            ("ped_cutoff", params.ped_cutoff),
            ("wall_cutoff", params.wall_cutoff),
            ("ped_max_force", params.ped_max_force),
            ("wall_max_force", params.wall_max_force),
            ("neighbour_radius", params.neighbour_radius),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ModelError::Config(format!("{name} must be finite, got {value}")));
            }
        }
        let check = |name: &str, cutoff: f64, width: f64| {
            if !(width > 0.0 && cutoff - width > CONTACT_DISTANCE + width) {
                return Err(ModelError::Config(format!(
                    "{name}: cutoff {cutoff} too small for interpolation width {width}"
                )));
            }
            Ok(())
        };
        check("neighbour repulsion", params.ped_cutoff, params.ped_interpolation_width)?;
        check("wall repulsion", params.wall_cutoff, params.wall_interpolation_width)?;
        if !(params.neighbour_radius > 0.0) {
            return Err(ModelError::Config("neighbour_radius must be positive".into()));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &GcfmParams {
        &self.params
    }

    fn ellipse_of(agent: &Agent, at: Kinematics, v0: f64) -> Ellipse {
        let orientation = orientation_from(at.vel, agent.orientation);
        Ellipse::new(&agent.params.shape, at.pos, orientation, at.vel.norm(), v0)
    }

    fn neighbour_repulsion(
        &self,
        agent: &Agent,
        me:    &Ellipse,
        at:    Kinematics,
        v0:    f64,
        other: &Agent,
        now:   f64,
    ) -> Point {
        let other_v0 = smoothed_v0(&other.params.speed, &other.state, now);
        let them = Ellipse::new(&other.params.shape, other.pos, other.orientation, other.speed(), other_v0);
        let s = me.effective_distance(&them);
        if s >= self.params.ped_cutoff {
            return Point::ZERO;
        }

        let offset = other.pos - at.pos;
        let d = offset.norm();
        if d < EPS {
            warn!(agent = %agent.id, other = %other.id, "agents on the same spot; repulsion skipped");
            return Point::ZERO;
        }
        let e = offset / d;

        let closing = (at.vel - other.velocity).dot(e);
        let v_ij = 0.5 * (closing + closing.abs());
        // Only neighbours in the field of view push.
        let ahead = at.vel.dot(e);
        let v_sq = at.vel.norm_sq();
        if v_sq < EPS * EPS {
            return Point::ZERO;
        }
        let k_sq = 0.25 * (ahead + ahead.abs()).powi(2) / v_sq;
        if k_sq < EPS * EPS {
            return Point::ZERO;
        }

        let nominator = agent.params.mass * k_sq.sqrt() * (self.params.nu_ped * v0 + v_ij).powi(2);
        e * piecewise_repulsion(
            s,
            nominator,
            self.params.ped_cutoff,
            self.params.ped_interpolation_width,
            self.params.ped_max_force,
        )
    }

    fn wall_repulsion(&self, me: &Ellipse, at: Kinematics, v0: f64, wall: &LineSegment) -> Point {
        if wall.direction().norm_sq() < MIN_WALL_LENGTH_SQ {
            return Point::ZERO;
        }
        let closest = wall.shortest_point(at.pos);
        // Acts only perpendicular to the wall, never from its end points.
        if wall.direction().dot(at.pos - closest).abs() > EPS {
            return Point::ZERO;
        }
        let offset = closest - at.pos;
        let d = offset.norm();
        let speed = at.vel.norm();
        if d < EPS || speed < EPS {
            return Point::ZERO;
        }
        let e = offset / d;
        let ahead = at.vel.dot(e);
        if ahead <= 0.0 {
            return Point::ZERO;
        }
        let k = ahead / speed;
        let vn = wall.normal_component(at.vel);
        let nominator = (self.params.nu_wall * v0 + vn).powi(2) * k;
        let s = d - me.radius_towards(closest);
        let p = &self.params;
        if s <= CONTACT_DISTANCE - p.wall_interpolation_width {
            return e * -p.wall_max_force;
        }
        e * piecewise_repulsion(s, nominator, p.wall_cutoff, p.wall_interpolation_width, p.wall_max_force)
    }
}

impl ForceModel for GeneralizedCentrifugalForceModel {
    fn acceleration(
        &self,
        agent: &Agent,
        drive: Drive,
        at:    Kinematics,
        ctx:   &ModelContext<'_>,
    ) -> Point {
        let mass = agent.params.mass;
        let me = Self::ellipse_of(agent, at, drive.v0);

        let mut force = (drive.e0 * drive.v0 - at.vel) * (mass / agent.params.tau);
        for other in ctx.visible_neighbours(agent, self.params.neighbour_radius) {
            force += self.neighbour_repulsion(agent, &me, at, drive.v0, other, ctx.time);
        }
        let reach = self.params.wall_cutoff + me.a.max(me.b);
        for wall in ctx.boundary_within(at.pos, reach) {
            force += self.wall_repulsion(&me, at, drive.v0, wall);
        }
        force / mass
    }
}

impl OperationalModel for GeneralizedCentrifugalForceModel {
    fn interaction_radius(&self) -> f64 {
        self.params.neighbour_radius
    }

    fn compute_update(
        &self,
        agent: &Agent,
        ctx:   &ModelContext<'_>,
        dt:    f64,
    ) -> ModelResult<ModelUpdate> {
        let (v0, mut state) = desired_speed(agent, ctx.building, ctx.time);
        if agent.pos.distance(agent.destination) > GOAL_EPS {
            state.e0 = mollify_e0(
                agent.destination,
                agent.pos,
                state.e0,
                state.orientation_delay,
                dt,
                agent.params.tau,
            );
        }
        state.orientation_delay = state.orientation_delay.saturating_add(1);

        let drive = Drive { e0: state.e0, v0 };
        let (position, velocity) = self.params.integrator.step(self, agent, drive, ctx, dt);
        ensure_finite(agent, ModelUpdate {
            position,
            velocity,
            orientation: orientation_from(velocity, agent.orientation),
            state,
        })
    }

    fn validate_agent(&self, agent: &Agent, ctx: &ModelContext<'_>) -> ModelResult<()> {
        let p = &agent.params;
        check_range(agent, "mass", p.mass, 1.0, 100.0)?;
        check_range(agent, "tau", p.tau, 0.1, 10.0)?;
        check_range(agent, "v0", p.speed.v0, 0.0, 10.0)?;
        check_range(agent, "a_v", p.shape.a_v, 0.0, 10.0)?;
        check_range(agent, "a_min", p.shape.a_min, 0.1, 1.0)?;
        check_range(agent, "b_min", p.shape.b_min, 0.1, 1.0)?;
        check_range(agent, "b_max", p.shape.b_max, p.shape.b_min, 2.0)?;

        let at = Kinematics { pos: agent.pos, vel: agent.velocity };
        let me = Self::ellipse_of(agent, at, p.speed.v0);
        for entry in ctx.grid.get_neighboring_agents(agent.pos, VALIDATION_RADIUS) {
            if entry.id == agent.id {
                continue;
            }
            let Some(other) = ctx.agents.get(entry.id) else { continue };
            let them = Ellipse::new(
                &other.params.shape,
                other.pos,
                other.orientation,
                other.speed(),
                other.params.speed.v0,
            );
            if me.effective_distance(&them) < 0.0 {
                return Err(ConstraintViolation::Overlap {
                    agent:    agent.id,
                    other:    other.id,
                    distance: agent.pos.distance(other.pos),
                }
                .into());
            }
        }

        let limit = p.shape.a_min.max(p.shape.b_max) / 2.0;
        if ctx.boundary_within(agent.pos, limit).next().is_some() {
            return Err(ConstraintViolation::TooCloseToWall { agent: agent.id, limit }.into());
        }
        Ok(())
    }
}
