//! Time integration of force-based models.
//!
//! A [`ForceModel`] only evaluates accelerations; an [`Integrator`] turns
//! them into a new position and velocity.  The integrator may evaluate the
//! force more than once per step, at trial kinematics, against the same
//! immutable context.

use ps_agent::Agent;
use ps_core::Point;

use crate::ModelContext;

/// Position and velocity at which a force is evaluated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Kinematics {
    pub pos: Point,
    pub vel: Point,
}

/// Desired direction and speed for the current step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Drive {
    pub e0: Point,
    pub v0: f64,
}

/// A model expressed as an acceleration field.
pub trait ForceModel: Send + Sync {
    fn acceleration(
        &self,
        agent: &Agent,
        drive: Drive,
        at:    Kinematics,
        ctx:   &ModelContext<'_>,
    ) -> Point;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Integrator {
    /// Explicit Euler: position advances with the old velocity.
    Euler,
    /// Two force evaluations per step; the second at the predicted state.
    VelocityVerlet,
    /// Kick then drift: position advances with the new velocity.
    #[default]
    Leapfrog,
}

impl Integrator {
    /// Advance `agent` by `dt`.  Returns the new `(position, velocity)`.
    pub fn step<F: ForceModel + ?Sized>(
        self,
        model: &F,
        agent: &Agent,
        drive: Drive,
        ctx:   &ModelContext<'_>,
        dt:    f64,
    ) -> (Point, Point) {
        let now = Kinematics { pos: agent.pos, vel: agent.velocity };
        let acc = model.acceleration(agent, drive, now, ctx);
        match self {
            Integrator::Euler => (now.pos + now.vel * dt, now.vel + acc * dt),
            Integrator::Leapfrog => {
                let vel = now.vel + acc * dt;
                (now.pos + vel * dt, vel)
            }
            Integrator::VelocityVerlet => {
                let pos = now.pos + now.vel * dt + acc * (0.5 * dt * dt);
                let predicted = Kinematics { pos, vel: now.vel + acc * dt };
                let acc_next = model.acceleration(agent, drive, predicted, ctx);
                (pos, now.vel + (acc + acc_next) * (0.5 * dt))
            }
        }
    }
}
