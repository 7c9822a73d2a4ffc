//! The `OperationalModel` trait and the model factory.

use ps_agent::{Agent, ModelState};
use ps_core::Point;

use crate::cfsm::{CfsmParams, CollisionFreeSpeedModel};
use crate::gcfm::{GcfmParams, GeneralizedCentrifugalForceModel};
use crate::{ConstraintViolation, ModelContext, ModelError, ModelResult};

/// Speed below which an agent keeps its previous orientation.
pub const ORIENTATION_SPEED_THRESHOLD: f64 = 0.01;

/// The new kinematic state of one agent, computed from the snapshot and
/// committed by the driver only after every agent's update is known.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ModelUpdate {
    pub position:    Point,
    pub velocity:    Point,
    /// Unit vector.
    pub orientation: Point,
    pub state:       ModelState,
}

impl ModelUpdate {
    /// Apply to `agent`, remembering the old position as `last_pos`.
    pub fn commit(self, agent: &mut Agent) {
        agent.last_pos = agent.pos;
        agent.pos = self.position;
        agent.velocity = self.velocity;
        agent.orientation = self.orientation;
        agent.state = self.state;
    }
}

/// Orientation after moving with `velocity`; `previous` when nearly still.
#[inline]
pub fn orientation_from(velocity: Point, previous: Point) -> Point {
    if velocity.norm() > ORIENTATION_SPEED_THRESHOLD { velocity.normalized() } else { previous }
}

/// Pluggable operational model.
///
/// Moves one agent by one step towards its current waypoint
/// (`agent.destination`), taking neighbours and walls into account.
///
/// # Thread safety
///
/// The driver calls `compute_update` for many agents in parallel via Rayon,
/// so implementations must be `Send + Sync`.  Per-agent state lives in
/// `Agent::state` and is returned in [`ModelUpdate::state`]; models hold
/// only their parameters.
pub trait OperationalModel: Send + Sync {
    /// Radius within which neighbours are considered.
    fn interaction_radius(&self) -> f64;

    /// Next kinematic state of `agent` after a step of `dt` seconds.
    ///
    /// A non-finite result is reported as [`ModelError::NonFinite`].
    fn compute_update(
        &self,
        agent: &Agent,
        ctx:   &ModelContext<'_>,
        dt:    f64,
    ) -> ModelResult<ModelUpdate>;

    /// Check an agent about to be inserted: parameter ranges and clearance
    /// to neighbours and walls.
    fn validate_agent(&self, agent: &Agent, ctx: &ModelContext<'_>) -> ModelResult<()>;
}

/// Reject non-finite positions or velocities.
pub(crate) fn ensure_finite(agent: &Agent, update: ModelUpdate) -> ModelResult<ModelUpdate> {
    if !update.position.is_finite() {
        return Err(ModelError::NonFinite { agent: agent.id, quantity: "position" });
    }
    if !update.velocity.is_finite() {
        return Err(ModelError::NonFinite { agent: agent.id, quantity: "velocity" });
    }
    Ok(update)
}

/// Reject a parameter outside `[min, max]` (or non-finite).
pub(crate) fn check_range(
    agent:     &Agent,
    parameter: &'static str,
    value:     f64,
    min:       f64,
    max:       f64,
) -> ModelResult<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        return Ok(());
    }
    Err(ConstraintViolation::OutOfRange { agent: agent.id, parameter, value, min, max }.into())
}

// ── Factory ───────────────────────────────────────────────────────────────────

/// Which operational model drives the simulation, with its parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModelConfig {
    Gcfm(GcfmParams),
    Cfsm(CfsmParams),
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::Cfsm(CfsmParams::default())
    }
}

impl ModelConfig {
    /// Validate the parameters and build the model.
    pub fn build(&self) -> ModelResult<Box<dyn OperationalModel>> {
        Ok(match self {
            ModelConfig::Gcfm(p) => Box::new(GeneralizedCentrifugalForceModel::new(p.clone())?),
            ModelConfig::Cfsm(p) => Box::new(CollisionFreeSpeedModel::new(p.clone())?),
        })
    }
}
