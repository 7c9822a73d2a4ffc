//! Rooms, subrooms, and goals.

use ps_core::{GoalId, LineSegment, NavLineId, Point, RoomId, SubRoomId};

use crate::polygon::Polygon;

/// Walking surface of a subroom.  Selects the desired-speed profile used by
/// the operational model.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubRoomKind {
    #[default]
    Floor,
    /// `uphill` points in the ascending direction.
    Stair { uphill: Point },
    /// Moving walkway; `up` tells which way it runs relative to `uphill`.
    Escalator { uphill: Point, up: bool },
}

/// A convex or concave walkable area bounded by walls and doors.
#[derive(Clone, Debug)]
pub struct SubRoom {
    pub id:      SubRoomId,
    pub room:    RoomId,
    pub caption: String,
    pub kind:    SubRoomKind,
    pub walls:   Vec<LineSegment>,
    /// Outline built from `walls` plus the doors on its boundary.
    pub polygon: Polygon,
    /// Doors and measurement lines touching this subroom, in insertion order.
    pub lines:   Vec<NavLineId>,
}

impl SubRoom {
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.polygon.contains(p)
    }
}

#[derive(Clone, Debug)]
pub struct Room {
    pub id:         RoomId,
    pub caption:    String,
    pub subrooms:   Vec<SubRoomId>,
    /// Room doors with a side in this room, in insertion order.
    pub room_doors: Vec<NavLineId>,
}

/// A named target area, e.g. the assembly point outside an exit.
#[derive(Clone, Debug)]
pub struct Goal {
    pub id:      GoalId,
    pub caption: String,
    pub polygon: Polygon,
}
