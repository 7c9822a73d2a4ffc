//! Navigable lines: doors between subrooms, doors between rooms (or to the
//! outside), and measurement lines.
//!
//! Each variant carries only the fields it needs.  Behaviour common to all
//! of them (geometry, adjacency) is implemented once on [`LineGeometry`].

use ps_core::{LineSegment, NavLineId, Point, RoomId, SubRoomId};

use crate::door::DoorFlow;
use crate::{GeometryError, GeometryResult};

// ── LineGeometry ──────────────────────────────────────────────────────────────

/// Shared behaviour of every navigable line.
pub trait LineGeometry {
    fn id(&self) -> NavLineId;

    fn segment(&self) -> &LineSegment;

    /// The subrooms on either side.  `None` is the outside of the building.
    fn sides(&self) -> [Option<SubRoomId>; 2];

    #[inline]
    fn centre(&self) -> Point {
        self.segment().centre()
    }

    #[inline]
    fn touches(&self, subroom: SubRoomId) -> bool {
        self.sides().contains(&Some(subroom))
    }

    /// The subroom opposite `subroom`; `Ok(None)` for the outside.
    ///
    /// Asking from a subroom the line does not touch is a configuration
    /// integrity violation and yields [`GeometryError::NotAdjacent`].
    fn other_side(&self, subroom: SubRoomId) -> GeometryResult<Option<SubRoomId>> {
        let [a, b] = self.sides();
        if a == Some(subroom) {
            Ok(b)
        } else if b == Some(subroom) {
            Ok(a)
        } else {
            Err(GeometryError::NotAdjacent { line: self.id(), subroom })
        }
    }
}

// ── Variants ──────────────────────────────────────────────────────────────────

/// A door between two subrooms of the same room.
#[derive(Clone, Debug)]
pub struct InternalDoor {
    pub id:       NavLineId,
    pub caption:  String,
    pub segment:  LineSegment,
    pub room:     RoomId,
    pub subrooms: [SubRoomId; 2],
    pub flow:     DoorFlow,
}

/// One side of a room door.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoorSide {
    pub room:    RoomId,
    pub subroom: SubRoomId,
}

/// A door between two rooms, or between a room and the outside.
#[derive(Clone, Debug)]
pub struct RoomDoor {
    pub id:      NavLineId,
    pub caption: String,
    pub segment: LineSegment,
    pub inside:  DoorSide,
    /// `None` for an exit to the outside.
    pub outside: Option<DoorSide>,
    pub flow:    DoorFlow,
}

impl RoomDoor {
    #[inline]
    pub fn is_exit(&self) -> bool {
        self.outside.is_none()
    }

    /// `true` if either side belongs to `room`.
    pub fn connects_room(&self, room: RoomId) -> bool {
        self.inside.room == room || self.outside.is_some_and(|s| s.room == room)
    }
}

/// A counting line inside one subroom.  Never a door.
#[derive(Clone, Debug)]
pub struct MeasurementLine {
    pub id:      NavLineId,
    pub caption: String,
    pub segment: LineSegment,
    pub room:    RoomId,
    pub subroom: SubRoomId,
}

impl LineGeometry for InternalDoor {
    fn id(&self) -> NavLineId {
        self.id
    }

    fn segment(&self) -> &LineSegment {
        &self.segment
    }

    fn sides(&self) -> [Option<SubRoomId>; 2] {
        [Some(self.subrooms[0]), Some(self.subrooms[1])]
    }
}

impl LineGeometry for RoomDoor {
    fn id(&self) -> NavLineId {
        self.id
    }

    fn segment(&self) -> &LineSegment {
        &self.segment
    }

    fn sides(&self) -> [Option<SubRoomId>; 2] {
        [Some(self.inside.subroom), self.outside.map(|s| s.subroom)]
    }
}

impl LineGeometry for MeasurementLine {
    fn id(&self) -> NavLineId {
        self.id
    }

    fn segment(&self) -> &LineSegment {
        &self.segment
    }

    /// Both sides are the owning subroom: crossing never changes location.
    fn sides(&self) -> [Option<SubRoomId>; 2] {
        [Some(self.subroom), Some(self.subroom)]
    }
}

// ── NavigableLine ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum NavigableLine {
    InternalDoor(InternalDoor),
    RoomDoor(RoomDoor),
    Measurement(MeasurementLine),
}

impl NavigableLine {
    /// View as the shared trait.
    #[inline]
    pub fn geometry(&self) -> &dyn LineGeometry {
        match self {
            NavigableLine::InternalDoor(d) => d,
            NavigableLine::RoomDoor(d) => d,
            NavigableLine::Measurement(m) => m,
        }
    }

    #[inline]
    pub fn is_door(&self) -> bool {
        !matches!(self, NavigableLine::Measurement(_))
    }

    pub fn caption(&self) -> &str {
        match self {
            NavigableLine::InternalDoor(d) => &d.caption,
            NavigableLine::RoomDoor(d) => &d.caption,
            NavigableLine::Measurement(m) => &m.caption,
        }
    }

    /// Flow state of a door; `None` for measurement lines.
    pub fn flow(&self) -> Option<&DoorFlow> {
        match self {
            NavigableLine::InternalDoor(d) => Some(&d.flow),
            NavigableLine::RoomDoor(d) => Some(&d.flow),
            NavigableLine::Measurement(_) => None,
        }
    }

    pub fn flow_mut(&mut self) -> Option<&mut DoorFlow> {
        match self {
            NavigableLine::InternalDoor(d) => Some(&mut d.flow),
            NavigableLine::RoomDoor(d) => Some(&mut d.flow),
            NavigableLine::Measurement(_) => None,
        }
    }

    pub fn as_room_door(&self) -> Option<&RoomDoor> {
        match self {
            NavigableLine::RoomDoor(d) => Some(d),
            _ => None,
        }
    }
}

impl LineGeometry for NavigableLine {
    fn id(&self) -> NavLineId {
        self.geometry().id()
    }

    fn segment(&self) -> &LineSegment {
        match self {
            NavigableLine::InternalDoor(d) => &d.segment,
            NavigableLine::RoomDoor(d) => &d.segment,
            NavigableLine::Measurement(m) => &m.segment,
        }
    }

    fn sides(&self) -> [Option<SubRoomId>; 2] {
        self.geometry().sides()
    }
}
