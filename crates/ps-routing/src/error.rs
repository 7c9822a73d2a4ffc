use ps_core::{Point, StageId, SubRoomId};
use ps_geometry::GeometryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no path from subroom {from} to {to}")]
    NoPath { from: SubRoomId, to: Point },

    #[error("position {0} is not reached by the distance map")]
    Unreachable(Point),

    #[error("background distance-map build for {0} panicked")]
    BuildPanicked(StageId),

    #[error("invalid router configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
