use ps_core::AgentId;
use thiserror::Error;

/// A model constraint an agent violates at insertion time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintViolation {
    #[error("agent {agent}: {parameter} = {value} outside [{min}, {max}]")]
    OutOfRange {
        agent:     AgentId,
        parameter: &'static str,
        value:     f64,
        min:       f64,
        max:       f64,
    },

    #[error("agent {agent} overlaps agent {other} (centre distance {distance:.3} m)")]
    Overlap { agent: AgentId, other: AgentId, distance: f64 },

    #[error("agent {agent} is within {limit:.3} m of a wall")]
    TooCloseToWall { agent: AgentId, limit: f64 },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("non-finite {quantity} computed for agent {agent}")]
    NonFinite { agent: AgentId, quantity: &'static str },

    #[error("model constraint violated: {0}")]
    Constraint(#[from] ConstraintViolation),

    #[error("model configuration error: {0}")]
    Config(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
