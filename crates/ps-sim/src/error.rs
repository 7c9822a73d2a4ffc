use ps_core::{AgentId, JourneyId, Point, PsError, StageId};
use ps_geometry::GeometryError;
use ps_journey::JourneyError;
use ps_model::ModelError;
use ps_routing::RoutingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("agent {0} does not exist")]
    UnknownAgent(AgentId),

    #[error("stage {0} does not exist")]
    UnknownStage(StageId),

    #[error("journey {0} does not exist")]
    UnknownJourney(JourneyId),

    #[error("position {0} lies in no subroom")]
    OutsideBuilding(Point),

    /// Raised under `LostAgentPolicy::Halt`.
    #[error("agent {agent} at {position} left every subroom without passing an exit")]
    LostAgent { agent: AgentId, position: Point },

    #[error("operational model: {0}")]
    Model(#[from] ModelError),

    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("routing: {0}")]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Core(#[from] PsError),

    #[error("journey: {0}")]
    Journey(JourneyError),
}

/// Unknown stage/journey IDs get their own variants; every other journey
/// error is wrapped as is.
impl From<JourneyError> for SimError {
    fn from(e: JourneyError) -> Self {
        match e {
            JourneyError::UnknownStage(s) => SimError::UnknownStage(s),
            JourneyError::UnknownJourney(j) => SimError::UnknownJourney(j),
            other => SimError::Journey(other),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
