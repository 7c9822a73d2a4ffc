//! The assembled building and its queries.

use ps_core::{LineSegment, NavLineId, Point, RoomId, SubRoomId, GoalId};
use tracing::{error, info};

use crate::door::{DoorFlow, DoorState};
use crate::navline::{LineGeometry, NavigableLine};
use crate::room::{Goal, Room, SubRoom};
use crate::{GeometryError, GeometryResult};

/// A door whose state changed during regulation or by command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DoorStateChange {
    pub door: NavLineId,
    pub from: DoorState,
    pub to:   DoorState,
}

/// Rooms, subrooms, navigable lines, and goals, stored in arenas indexed by
/// their typed IDs.
///
/// Do not construct directly; use [`BuildingBuilder`](crate::BuildingBuilder),
/// which validates every subroom outline.
#[derive(Clone, Debug)]
pub struct Building {
    pub(crate) rooms:    Vec<Room>,
    pub(crate) subrooms: Vec<SubRoom>,
    pub(crate) lines:    Vec<NavigableLine>,
    pub(crate) goals:    Vec<Goal>,
}

impl Building {
    // ── Arena access ──────────────────────────────────────────────────────

    #[inline]
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    #[inline]
    pub fn subrooms(&self) -> &[SubRoom] {
        &self.subrooms
    }

    #[inline]
    pub fn lines(&self) -> &[NavigableLine] {
        &self.lines
    }

    #[inline]
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    #[inline]
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.index())
    }

    #[inline]
    pub fn subroom(&self, id: SubRoomId) -> Option<&SubRoom> {
        self.subrooms.get(id.index())
    }

    #[inline]
    pub fn line(&self, id: NavLineId) -> Option<&NavigableLine> {
        self.lines.get(id.index())
    }

    #[inline]
    pub fn goal(&self, id: GoalId) -> Option<&Goal> {
        self.goals.get(id.index())
    }

    /// Door flow state; errors for unknown IDs and measurement lines.
    pub fn door_flow(&self, id: NavLineId) -> GeometryResult<&DoorFlow> {
        self.line(id)
            .ok_or(GeometryError::UnknownLine(id))?
            .flow()
            .ok_or(GeometryError::NotADoor(id))
    }

    pub fn door_flow_mut(&mut self, id: NavLineId) -> GeometryResult<&mut DoorFlow> {
        self.lines
            .get_mut(id.index())
            .ok_or(GeometryError::UnknownLine(id))?
            .flow_mut()
            .ok_or(GeometryError::NotADoor(id))
    }

    /// Iterator over `(id, flow)` for every door.
    pub fn doors(&self) -> impl Iterator<Item = (NavLineId, &DoorFlow)> + '_ {
        self.lines.iter().filter_map(|l| l.flow().map(|f| (l.id(), f)))
    }

    /// Every wall segment of every subroom.
    pub fn walls(&self) -> impl Iterator<Item = &LineSegment> + '_ {
        self.subrooms.iter().flat_map(|s| s.walls.iter())
    }

    /// Segments of doors that are currently not open.  The operational model
    /// treats them as walls.
    pub fn closed_door_segments(&self) -> Vec<LineSegment> {
        self.lines
            .iter()
            .filter(|l| l.flow().is_some_and(|f| !f.state().is_open()))
            .map(|l| *l.segment())
            .collect()
    }

    /// `(min, max)` corners of the box enclosing every subroom.
    pub fn bounds(&self) -> (Point, Point) {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for s in &self.subrooms {
            let (lo, hi) = s.polygon.bounding_box();
            min = Point::new(min.x.min(lo.x), min.y.min(lo.y));
            max = Point::new(max.x.max(hi.x), max.y.max(hi.y));
        }
        (min, max)
    }

    // ── Topology ──────────────────────────────────────────────────────────

    /// The subroom on the other side of `line` as seen from `subroom`.
    ///
    /// `Ok(None)` means the line leads outside.  Asking from a subroom the
    /// line does not touch is an integrity violation: it is logged and
    /// returned as [`GeometryError::NotAdjacent`], which callers treat as
    /// fatal.
    pub fn other_subroom(
        &self,
        line:    NavLineId,
        subroom: SubRoomId,
    ) -> GeometryResult<Option<SubRoomId>> {
        let l = self.line(line).ok_or(GeometryError::UnknownLine(line))?;
        l.other_side(subroom).inspect_err(|e| error!("{e}"))
    }

    /// Subrooms reachable from `subroom` through one door, in line order.
    pub fn neighbour_subrooms(&self, subroom: SubRoomId) -> Vec<SubRoomId> {
        let Some(sub) = self.subroom(subroom) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for &id in &sub.lines {
            let line = &self.lines[id.index()];
            if !line.is_door() {
                continue;
            }
            if let Ok(Some(other)) = line.other_side(subroom) {
                if other != subroom && !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        out
    }

    /// Rooms sharing a room door with `room`, in door order.
    pub fn neighbour_rooms(&self, room: RoomId) -> Vec<RoomId> {
        let Some(r) = self.room(room) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for &id in &r.room_doors {
            if let Some(door) = self.lines[id.index()].as_room_door() {
                for side in [Some(door.inside), door.outside].into_iter().flatten() {
                    if side.room != room && !out.contains(&side.room) {
                        out.push(side.room);
                    }
                }
            }
        }
        out
    }

    // ── Location queries ──────────────────────────────────────────────────

    /// First subroom (in arena order) containing `p`.
    pub fn find_subroom(&self, p: Point) -> Option<SubRoomId> {
        self.subrooms.iter().find(|s| s.contains(p)).map(|s| s.id)
    }

    /// Find the subroom containing `p`, searching outward from `previous`:
    /// the previous subroom itself, then subrooms one door away, then every
    /// subroom of the neighbouring rooms.  `None` means the point is in none
    /// of them.
    pub fn relocate(&self, previous: SubRoomId, p: Point) -> Option<SubRoomId> {
        let Some(prev) = self.subroom(previous) else {
            return self.find_subroom(p);
        };
        if prev.contains(p) {
            return Some(previous);
        }
        if let Some(s) = self
            .neighbour_subrooms(previous)
            .into_iter()
            .find(|&s| self.subrooms[s.index()].contains(p))
        {
            return Some(s);
        }
        self.neighbour_rooms(prev.room)
            .into_iter()
            .flat_map(|r| self.rooms[r.index()].subrooms.iter().copied())
            .find(|&s| self.subrooms[s.index()].contains(p))
    }

    /// The room door of `room` closest to `p` (point-to-segment distance).
    /// Ties keep the door inserted first.
    pub fn find_closest_transition(&self, room: RoomId, p: Point) -> Option<NavLineId> {
        let r = self.room(room)?;
        let mut best: Option<(NavLineId, f64)> = None;
        for &id in &r.room_doors {
            let d = self.lines[id.index()].segment().distance_to(p);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    // ── Doors ─────────────────────────────────────────────────────────────

    /// Count one passage through `door` at `time`.  Returns the new
    /// cumulative usage.
    pub fn record_passage(&mut self, door: NavLineId, time: f64) -> GeometryResult<u64> {
        let flow = self.door_flow_mut(door)?;
        flow.increase_usage(1, time);
        Ok(flow.usage())
    }

    /// Run one regulation step over every door: advance countdowns, then
    /// evaluate the flow of doors with enough new passages.
    pub fn regulate_doors(&mut self, time: f64, dt: f64) -> Vec<DoorStateChange> {
        let mut changes = Vec::new();
        for line in &mut self.lines {
            let id = line.id();
            let Some(flow) = line.flow_mut() else {
                continue;
            };
            let before = flow.state();
            flow.update_temporary_state(dt);
            if flow.evaluation_due() {
                flow.regulate_flow(time);
                flow.reset_partial_usage();
            }
            let after = flow.state();
            if after != before {
                info!(door = %id, ?before, ?after, closing_time = flow.closing_time(), "door state changed");
                changes.push(DoorStateChange { door: id, from: before, to: after });
            }
        }
        changes
    }

    /// Command: force a door into `state`.
    pub fn set_door_state(
        &mut self,
        door:  NavLineId,
        state: DoorState,
    ) -> GeometryResult<Option<DoorStateChange>> {
        let flow = self.door_flow_mut(door)?;
        let from = flow.state();
        flow.set_state(state);
        Ok((from != state).then_some(DoorStateChange { door, from, to: state }))
    }

    /// Command: clear the usage counted toward a door's max-usage cap.
    pub fn reset_door_usage(&mut self, door: NavLineId) -> GeometryResult<Option<DoorStateChange>> {
        let flow = self.door_flow_mut(door)?;
        let from = flow.state();
        flow.reset_usage();
        let to = flow.state();
        Ok((from != to).then_some(DoorStateChange { door, from, to }))
    }
}
