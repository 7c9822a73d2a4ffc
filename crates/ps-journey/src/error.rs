use ps_core::{JourneyId, StageId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JourneyError {
    #[error("unknown stage {0}")]
    UnknownStage(StageId),

    #[error("unknown journey {0}")]
    UnknownJourney(JourneyId),

    #[error("{stage} is not part of {journey}")]
    StageNotInJourney { stage: StageId, journey: JourneyId },

    #[error("a journey needs at least one stage")]
    EmptyJourney,

    #[error("invalid stage: {0}")]
    InvalidStage(String),

    #[error("invalid transition from {from}: {reason}")]
    InvalidTransition { from: StageId, reason: String },

    #[error("{0} is not a waiting set")]
    NotAWaitingSet(StageId),

    #[error("{0} is not a queue")]
    NotAQueue(StageId),

    #[error("invalid agent source: {0}")]
    InvalidSource(String),
}

pub type JourneyResult<T> = Result<T, JourneyError>;
