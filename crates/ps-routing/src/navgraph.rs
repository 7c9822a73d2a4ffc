//! Navigation graph over subrooms and doors.
//!
//! Vertices are subrooms plus one vertex for the outside of the building;
//! every door is an undirected edge between the vertices of its two sides.
//!
//! # Cost model
//!
//! All costs are in **millimetres** (`u64`) internally so the heap keys are
//! totally ordered.  The first leg costs `|position − door centre| × factor`,
//! each later leg `|previous door centre − door centre| × factor`, and the
//! leg into the destination subroom adds the distance to the destination
//! point.  Doors in state `Close` are skipped; temporarily closed doors stay
//! in the graph since they reopen on their own.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ps_core::{LineSegment, NavLineId, Point, SubRoomId};
use ps_geometry::{Building, DoorState, GeometryError, LineGeometry};
use tracing::debug;

use crate::router::{Destination, EdgeFactor, FactorTable, Router, Waypoint};
use crate::{RoutingError, RoutingResult};

/// How far past a door centre the waypoint is placed, so agents walk
/// through the door instead of stopping on it.
pub const DOOR_OVERSHOOT: f64 = 0.5;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchMode {
    /// Dijkstra over the whole graph.
    #[default]
    ShortestPath,
    /// Greedy: the cheapest door out of the current subroom, scored by the
    /// first leg plus the straight-line rest.
    CheapestLocalEdge,
}

#[derive(Copy, Clone, Debug)]
struct DoorEdge {
    door:    NavLineId,
    to:      usize,
    segment: LineSegment,
}

pub struct NavGraphRouter {
    mode:      SearchMode,
    /// Outgoing edges per vertex; index `subroom_count` is the outside.
    adjacency: Vec<Vec<DoorEdge>>,
    factors:   FactorTable,
}

#[inline]
fn to_mm(metres: f64) -> u64 {
    (metres * 1000.0).round() as u64
}

impl NavGraphRouter {
    pub fn new(building: &Building, mode: SearchMode) -> Self {
        let outside = building.subrooms().len();
        let mut adjacency = vec![Vec::new(); outside + 1];
        let vertex = |s: Option<SubRoomId>| s.map_or(outside, |s| s.index());
        for line in building.lines().iter().filter(|l| l.is_door()) {
            let [a, b] = line.sides();
            let (va, vb) = (vertex(a), vertex(b));
            if va == vb {
                continue;
            }
            let segment = *line.segment();
            adjacency[va].push(DoorEdge { door: line.id(), to: vb, segment });
            adjacency[vb].push(DoorEdge { door: line.id(), to: va, segment });
        }
        debug!(vertices = outside + 1, "navigation graph built");
        Self { mode, adjacency, factors: FactorTable::default() }
    }

    #[inline]
    fn outside(&self) -> usize {
        self.adjacency.len() - 1
    }

    pub fn factors(&self) -> &FactorTable {
        &self.factors
    }

    fn passable(building: &Building, door: NavLineId) -> bool {
        building.door_flow(door).is_ok_and(|f| f.state() != DoorState::Close)
    }

    fn leg_cost(&self, from: Point, edge: &DoorEdge) -> u64 {
        to_mm(from.distance(edge.segment.centre()) * self.factors.factor(edge.door))
    }

    /// Door sequence from `start` to `goal`, as edges.
    fn shortest_path(
        &self,
        building: &Building,
        position: Point,
        start:    usize,
        goal:     usize,
        target:   Point,
    ) -> Option<DoorEdge> {
        let n = self.adjacency.len();
        let mut dist = vec![u64::MAX; n];
        // (previous vertex, edge taken) per reached vertex.
        let mut prev: Vec<Option<(usize, DoorEdge)>> = vec![None; n];
        dist[start] = 0;

        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
        heap.push(Reverse((0, start)));

        while let Some(Reverse((cost, v))) = heap.pop() {
            if v == goal {
                break;
            }
            // Skip stale heap entries.
            if cost > dist[v] {
                continue;
            }
            let here = match prev[v] {
                Some((_, e)) => e.segment.centre(),
                None => position,
            };
            for edge in &self.adjacency[v] {
                if !Self::passable(building, edge.door) {
                    continue;
                }
                let mut new_cost = cost.saturating_add(self.leg_cost(here, edge));
                if edge.to == goal && goal != self.outside() {
                    new_cost = new_cost.saturating_add(to_mm(edge.segment.centre().distance(target)));
                }
                if new_cost < dist[edge.to] {
                    dist[edge.to] = new_cost;
                    prev[edge.to] = Some((v, *edge));
                    heap.push(Reverse((new_cost, edge.to)));
                }
            }
        }

        // Walk back to the first door out of `start`.
        let mut cur = goal;
        let mut first = None;
        while let Some((from, edge)) = prev[cur] {
            first = Some(edge);
            if from == start {
                break;
            }
            cur = from;
        }
        first
    }

    fn cheapest_local_edge(
        &self,
        building: &Building,
        position: Point,
        start:    usize,
        target:   Point,
    ) -> Option<DoorEdge> {
        self.adjacency[start]
            .iter()
            .filter(|e| Self::passable(building, e.door))
            .map(|e| (self.leg_cost(position, e) + to_mm(e.segment.centre().distance(target)), e))
            .min_by_key(|&(cost, e)| (cost, e.door))
            .map(|(_, e)| *e)
    }
}

/// A point just past the door, on the side away from `position`.
fn pass_point(building: &Building, edge: &DoorEdge, position: Point) -> Point {
    let centre = edge.segment.centre();
    let n = edge.segment.normal() * DOOR_OVERSHOOT;
    let side = edge.segment.side(position);
    if side > ps_core::EPS {
        centre - n
    } else if side < -ps_core::EPS {
        centre + n
    } else {
        // Standing on the door line: aim into the subroom beyond it.
        let beyond = building.subrooms().get(edge.to);
        match beyond {
            Some(s) if s.contains(centre + n) => centre + n,
            Some(_) => centre - n,
            None => centre + n,
        }
    }
}

impl Router for NavGraphRouter {
    fn compute_waypoint(
        &self,
        building:    &Building,
        position:    Point,
        subroom:     SubRoomId,
        destination: &Destination,
    ) -> RoutingResult<Waypoint> {
        let start = subroom.index();
        if start >= self.outside() {
            return Err(GeometryError::UnknownSubRoom(subroom).into());
        }
        let target = destination.point();
        let goal = building.find_subroom(target).map_or(self.outside(), |s| s.index());
        if goal == start {
            return Ok(Waypoint::direct(target));
        }
        let edge = match self.mode {
            SearchMode::ShortestPath => self.shortest_path(building, position, start, goal, target),
            SearchMode::CheapestLocalEdge => {
                self.cheapest_local_edge(building, position, start, target)
            }
        };
        match edge {
            Some(e) => Ok(Waypoint { target: pass_point(building, &e, position), via: Some(e.door) }),
            None => Err(RoutingError::NoPath { from: subroom, to: target }),
        }
    }

    fn update(&mut self, _building: &Building, now: f64) {
        let dropped = self.factors.expire(now);
        if dropped > 0 {
            debug!(dropped, now, "edge factors expired");
        }
    }

    fn apply_factor(&mut self, factor: EdgeFactor) {
        self.factors.apply(factor);
    }
}
