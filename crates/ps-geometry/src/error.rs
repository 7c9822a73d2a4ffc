use ps_core::{LineSegment, NavLineId, RoomId, SubRoomId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("a polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("segments {a} and {b} cross away from a shared endpoint")]
    CrossingSegments { a: LineSegment, b: LineSegment },

    #[error("segments {a} and {b} overlap")]
    OverlappingSegments { a: LineSegment, b: LineSegment },

    #[error("outline is not closed: gap of {gap:.3} m between last and first point")]
    NotClosed { gap: f64 },

    #[error("{count} segment(s) are not part of the closed outline")]
    UnusedSegments { count: usize },

    #[error("outline is self-intersecting")]
    SelfIntersecting,

    #[error("subroom {subroom}: {source}")]
    SubRoom {
        subroom: SubRoomId,
        #[source]
        source:  Box<GeometryError>,
    },

    #[error("room {0} does not exist")]
    UnknownRoom(RoomId),

    #[error("subroom {0} does not exist")]
    UnknownSubRoom(SubRoomId),

    #[error("navigable line {0} does not exist")]
    UnknownLine(NavLineId),

    #[error("navigable line {0} is not a door")]
    NotADoor(NavLineId),

    #[error("invalid door {line}: {reason}")]
    InvalidDoor { line: NavLineId, reason: String },

    #[error("navigable line {line} is not adjacent to subroom {subroom}")]
    NotAdjacent { line: NavLineId, subroom: SubRoomId },
}

pub type GeometryResult<T> = Result<T, GeometryError>;
