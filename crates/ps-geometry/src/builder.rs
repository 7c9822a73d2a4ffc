//! Incremental construction of a validated [`Building`].

use ps_core::{GoalId, LineSegment, NavLineId, RoomId, SubRoomId, EPS};

use crate::building::Building;
use crate::door::{DoorFlow, DoorLimits};
use crate::navline::{DoorSide, InternalDoor, MeasurementLine, NavigableLine, RoomDoor};
use crate::polygon::{convert_lines_to_polygon, Polygon};
use crate::room::{Goal, Room, SubRoom, SubRoomKind};
use crate::{GeometryError, GeometryResult};

struct SubRoomDraft {
    room:    RoomId,
    caption: String,
    kind:    SubRoomKind,
    walls:   Vec<LineSegment>,
}

enum LineDraft {
    Internal { segment: LineSegment, subrooms: [SubRoomId; 2], limits: DoorLimits },
    Room { segment: LineSegment, inside: SubRoomId, outside: Option<SubRoomId>, limits: DoorLimits },
    Measurement { segment: LineSegment, subroom: SubRoomId },
}

impl LineDraft {
    fn segment(&self) -> &LineSegment {
        match self {
            LineDraft::Internal { segment, .. }
            | LineDraft::Room { segment, .. }
            | LineDraft::Measurement { segment, .. } => segment,
        }
    }

    /// Subrooms whose outline this line is part of.
    fn boundary_of(&self) -> Vec<SubRoomId> {
        match *self {
            LineDraft::Internal { subrooms, .. } => subrooms.to_vec(),
            LineDraft::Room { inside, outside, .. } => {
                std::iter::once(inside).chain(outside).collect()
            }
            LineDraft::Measurement { .. } => Vec::new(),
        }
    }
}

/// Construct a [`Building`] incrementally, then call [`build`](Self::build).
///
/// Adders hand out IDs immediately; all cross-references and outlines are
/// checked in `build()`.
///
/// # Example
///
/// ```
/// use ps_core::{LineSegment, Point};
/// use ps_geometry::{BuildingBuilder, DoorLimits};
///
/// let p = Point::new;
/// let seg = |a, b| LineSegment::new(a, b);
/// let mut b = BuildingBuilder::new();
/// let hall = b.add_room("hall");
/// let s = b.add_subroom(hall, "floor", vec![
///     seg(p(0.0, 0.0), p(4.0, 0.0)),
///     seg(p(4.0, 0.0), p(4.0, 4.0)),
///     seg(p(4.0, 4.0), p(0.0, 4.0)),
/// ]);
/// b.add_room_door("exit", seg(p(0.0, 4.0), p(0.0, 0.0)), s, None, DoorLimits::default());
/// let building = b.build().unwrap();
/// assert!(building.subrooms()[0].contains(p(2.0, 2.0)));
/// ```
#[derive(Default)]
pub struct BuildingBuilder {
    rooms:    Vec<String>,
    subrooms: Vec<SubRoomDraft>,
    lines:    Vec<(String, LineDraft)>,
    goals:    Vec<(String, Polygon)>,
}

impl BuildingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&mut self, caption: impl Into<String>) -> RoomId {
        self.rooms.push(caption.into());
        RoomId((self.rooms.len() - 1) as u32)
    }

    /// Add a flat subroom bounded by `walls` (plus whatever doors are later
    /// placed on its boundary).
    pub fn add_subroom(
        &mut self,
        room:    RoomId,
        caption: impl Into<String>,
        walls:   Vec<LineSegment>,
    ) -> SubRoomId {
        self.add_subroom_with_kind(room, caption, SubRoomKind::Floor, walls)
    }

    pub fn add_subroom_with_kind(
        &mut self,
        room:    RoomId,
        caption: impl Into<String>,
        kind:    SubRoomKind,
        walls:   Vec<LineSegment>,
    ) -> SubRoomId {
        self.subrooms.push(SubRoomDraft { room, caption: caption.into(), kind, walls });
        SubRoomId((self.subrooms.len() - 1) as u32)
    }

    /// Door between two subrooms of the same room.
    pub fn add_internal_door(
        &mut self,
        caption: impl Into<String>,
        segment: LineSegment,
        a:       SubRoomId,
        b:       SubRoomId,
        limits:  DoorLimits,
    ) -> NavLineId {
        self.push_line(caption.into(), LineDraft::Internal { segment, subrooms: [a, b], limits })
    }

    /// Door between two rooms; `outside = None` makes it an exit.
    pub fn add_room_door(
        &mut self,
        caption: impl Into<String>,
        segment: LineSegment,
        inside:  SubRoomId,
        outside: Option<SubRoomId>,
        limits:  DoorLimits,
    ) -> NavLineId {
        self.push_line(caption.into(), LineDraft::Room { segment, inside, outside, limits })
    }

    pub fn add_measurement_line(
        &mut self,
        caption: impl Into<String>,
        segment: LineSegment,
        subroom: SubRoomId,
    ) -> NavLineId {
        self.push_line(caption.into(), LineDraft::Measurement { segment, subroom })
    }

    pub fn add_goal(&mut self, caption: impl Into<String>, polygon: Polygon) -> GoalId {
        self.goals.push((caption.into(), polygon));
        GoalId((self.goals.len() - 1) as u32)
    }

    fn push_line(&mut self, caption: String, draft: LineDraft) -> NavLineId {
        self.lines.push((caption, draft));
        NavLineId((self.lines.len() - 1) as u32)
    }

    /// Validate references, build every subroom outline, and assemble the
    /// building.
    pub fn build(self) -> GeometryResult<Building> {
        let room_of = |s: SubRoomId| -> GeometryResult<RoomId> {
            self.subrooms
                .get(s.index())
                .map(|d| d.room)
                .ok_or(GeometryError::UnknownSubRoom(s))
        };

        for draft in &self.subrooms {
            if draft.room.index() >= self.rooms.len() {
                return Err(GeometryError::UnknownRoom(draft.room));
            }
        }

        // ── Lines ─────────────────────────────────────────────────────────
        let mut lines = Vec::with_capacity(self.lines.len());
        for (i, (caption, draft)) in self.lines.iter().enumerate() {
            let id = NavLineId(i as u32);
            if draft.segment().length() < EPS {
                return Err(GeometryError::InvalidDoor { line: id, reason: "zero length".into() });
            }
            let line = match *draft {
                LineDraft::Internal { segment, subrooms, limits } => {
                    let (ra, rb) = (room_of(subrooms[0])?, room_of(subrooms[1])?);
                    if ra != rb {
                        return Err(GeometryError::InvalidDoor {
                            line:   id,
                            reason: format!("internal door joins rooms {ra} and {rb}"),
                        });
                    }
                    if subrooms[0] == subrooms[1] {
                        return Err(GeometryError::InvalidDoor {
                            line:   id,
                            reason: "both sides are the same subroom".into(),
                        });
                    }
                    NavigableLine::InternalDoor(InternalDoor {
                        id,
                        caption: caption.clone(),
                        segment,
                        room: ra,
                        subrooms,
                        flow: DoorFlow::new(limits),
                    })
                }
                LineDraft::Room { segment, inside, outside, limits } => {
                    let inside = DoorSide { room: room_of(inside)?, subroom: inside };
                    let outside = match outside {
                        Some(s) => Some(DoorSide { room: room_of(s)?, subroom: s }),
                        None => None,
                    };
                    if outside.is_some_and(|o| o.room == inside.room) {
                        return Err(GeometryError::InvalidDoor {
                            line:   id,
                            reason: format!("room door has both sides in {}", inside.room),
                        });
                    }
                    NavigableLine::RoomDoor(RoomDoor {
                        id,
                        caption: caption.clone(),
                        segment,
                        inside,
                        outside,
                        flow: DoorFlow::new(limits),
                    })
                }
                LineDraft::Measurement { segment, subroom } => {
                    NavigableLine::Measurement(MeasurementLine {
                        id,
                        caption: caption.clone(),
                        segment,
                        room: room_of(subroom)?,
                        subroom,
                    })
                }
            };
            lines.push(line);
        }

        // ── Subrooms ──────────────────────────────────────────────────────
        let mut subrooms = Vec::with_capacity(self.subrooms.len());
        for (i, draft) in self.subrooms.iter().enumerate() {
            let id = SubRoomId(i as u32);
            let doors: Vec<LineSegment> = self
                .lines
                .iter()
                .filter(|(_, l)| l.boundary_of().contains(&id))
                .map(|(_, l)| *l.segment())
                .collect();
            let polygon = convert_lines_to_polygon(&draft.walls, &doors).map_err(|e| {
                GeometryError::SubRoom { subroom: id, source: Box::new(e) }
            })?;
            let touching = self
                .lines
                .iter()
                .enumerate()
                .filter(|(_, (_, l))| match l {
                    LineDraft::Measurement { subroom, .. } => *subroom == id,
                    other => other.boundary_of().contains(&id),
                })
                .map(|(j, _)| NavLineId(j as u32))
                .collect();
            subrooms.push(SubRoom {
                id,
                room: draft.room,
                caption: draft.caption.clone(),
                kind: draft.kind,
                walls: draft.walls.clone(),
                polygon,
                lines: touching,
            });
        }

        // ── Rooms ─────────────────────────────────────────────────────────
        let rooms = self
            .rooms
            .iter()
            .enumerate()
            .map(|(i, caption)| {
                let id = RoomId(i as u32);
                Room {
                    id,
                    caption: caption.clone(),
                    subrooms: subrooms.iter().filter(|s| s.room == id).map(|s| s.id).collect(),
                    room_doors: lines
                        .iter()
                        .filter_map(|l| l.as_room_door())
                        .filter(|d| d.connects_room(id))
                        .map(|d| d.id)
                        .collect(),
                }
            })
            .collect();

        let goals = self
            .goals
            .into_iter()
            .enumerate()
            .map(|(i, (caption, polygon))| Goal { id: GoalId(i as u32), caption, polygon })
            .collect();

        Ok(Building { rooms, subrooms, lines, goals })
    }
}
