//! Base error type.
//!
//! Sub-crates define their own error enums (`GeometryError`, `RoutingError`,
//! `ModelError`, …) and wrap `PsError` as one variant where useful.

use thiserror::Error;

use crate::{AgentId, JourneyId, StageId};

/// Errors shared by several `ps-*` crates.
#[derive(Debug, Error)]
pub enum PsError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("stage {0} not found")]
    StageNotFound(StageId),

    #[error("journey {0} not found")]
    JourneyNotFound(JourneyId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type.
pub type PsResult<T> = Result<T, PsError>;
