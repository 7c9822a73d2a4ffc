//! Desired speed by walking surface.
//!
//! Each subroom kind maps to a [`SpeedClass`].  When an agent enters a
//! subroom of a different class its desired speed does not jump: it decays
//! exponentially from the value it had at the moment of the change towards
//! the new class's speed, with time constant `SpeedProfile::smoothing`.

use ps_agent::{Agent, ModelState, SpeedClass, SpeedProfile};
use ps_core::Point;
use ps_geometry::{Building, SubRoomKind};

/// Surface class of `kind` for an agent heading along `heading`.
pub fn speed_class(kind: SubRoomKind, heading: Point) -> SpeedClass {
    match kind {
        SubRoomKind::Floor => SpeedClass::Floor,
        SubRoomKind::Stair { uphill } => {
            if heading.dot(uphill) >= 0.0 { SpeedClass::Upstairs } else { SpeedClass::Downstairs }
        }
        SubRoomKind::Escalator { up: true, .. } => SpeedClass::EscalatorUp,
        SubRoomKind::Escalator { up: false, .. } => SpeedClass::EscalatorDown,
    }
}

/// Desired speed implied by `state` at time `now`.
pub fn smoothed_v0(profile: &SpeedProfile, state: &ModelState, now: f64) -> f64 {
    let target = profile.for_class(state.speed_class).max(0.0);
    if profile.smoothing <= 0.0 || !state.class_since.is_finite() {
        return target;
    }
    let elapsed = (now - state.class_since).max(0.0);
    target + (state.v0_anchor - target) * (-elapsed / profile.smoothing).exp()
}

/// Current desired speed of `agent`, and its model state updated for a
/// change of walking surface.
pub fn desired_speed(agent: &Agent, building: &Building, now: f64) -> (f64, ModelState) {
    let mut state = agent.state;
    let class = current_class(agent, building);
    if class != state.speed_class {
        state.v0_anchor = smoothed_v0(&agent.params.speed, &state, now);
        state.speed_class = class;
        state.class_since = now;
    }
    (smoothed_v0(&agent.params.speed, &state, now), state)
}

/// Put a newly placed agent on its surface's speed class without blending.
pub fn settle(agent: &mut Agent, building: &Building) {
    let class = current_class(agent, building);
    agent.state.speed_class = class;
    agent.state.v0_anchor = agent.params.speed.for_class(class);
    agent.state.class_since = f64::NEG_INFINITY;
}

fn current_class(agent: &Agent, building: &Building) -> SpeedClass {
    let kind = building.subroom(agent.subroom).map_or(SubRoomKind::Floor, |s| s.kind);
    speed_class(kind, agent.destination - agent.pos)
}
