//! Per-exit distance maps (floor fields).
//!
//! # Algorithm
//!
//! 1. **Cells:** a cell is `FreeSpace` when its centre lies in a subroom or
//!    in the exit area, `Blocked` otherwise; walls (and doors closed by
//!    command) block every cell whose centre lies within `c/2` of them.
//!    Cells within `c/2` of an open door are cleared again, so narrow
//!    openings survive the wall bands on either side.
//! 2. **Wavefront:** Dijkstra from every exit cell (distance 0) over the
//!    8-neighbourhood, with step cost `c` and `c·√2`.  A diagonal step is
//!    only allowed when both adjacent orthogonal cells are free, so paths
//!    never cut wall corners.
//! 3. **Gradient:** each reached cell remembers the neighbour it was reached
//!    from, which is its best neighbour toward the exit.
//!
//! Queries walk the gradient [`LOOKAHEAD`] cells ahead and return that
//! cell's centre as the next waypoint.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Mutex, OnceLock};
use std::thread::JoinHandle;

use ps_core::{LineSegment, NavLineId, Point, StageId, SubRoomId};
use ps_geometry::{Building, DoorState, LineGeometry, Polygon};
use tracing::{debug, info};

use crate::router::{Destination, Map, Router, Waypoint};
use crate::{RoutingError, RoutingResult};

/// Cells walked along the gradient per query.
pub const LOOKAHEAD: usize = 3;

const NONE: u32 = u32::MAX;

/// Neighbour offsets: orthogonal first, then diagonal.
const NEIGHBOURS: [(i64, i64); 8] =
    [(-1, 0), (1, 0), (0, -1), (0, 1), (-1, -1), (-1, 1), (1, -1), (1, 1)];

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Cell {
    Blocked,
    /// Walkable but not reached by the wavefront.
    FreeSpace,
    /// Walking distance to the exit in metres.
    Distance(f64),
}

/// Everything a map build needs, detached from the building so it can move
/// to a worker thread.
#[derive(Clone, Debug)]
pub struct MapInput {
    pub walls:     Vec<LineSegment>,
    /// Passable lines; cells around them are cleared after walls are drawn.
    pub openings:  Vec<LineSegment>,
    pub areas:     Vec<Polygon>,
    pub exit:      Polygon,
    pub cell_size: f64,
}

impl MapInput {
    pub fn from_building(building: &Building, exit: &Polygon, cell_size: f64) -> Self {
        let mut walls: Vec<LineSegment> = building.walls().copied().collect();
        let mut openings = Vec::new();
        for line in building.lines() {
            if line.flow().is_some_and(|f| f.state() == DoorState::Close) {
                walls.push(*line.segment());
            } else {
                openings.push(*line.segment());
            }
        }
        Self {
            walls,
            openings,
            areas: building.subrooms().iter().map(|s| s.polygon.clone()).collect(),
            exit: exit.clone(),
            cell_size,
        }
    }
}

// ── DistanceMap ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct DistanceMap {
    width:     usize,
    height:    usize,
    cell_size: f64,
    /// Lower-left corner of cell `(0, 0)`.
    origin:    Point,
    cells:     Vec<Cell>,
    /// Best neighbour toward the exit, `NONE` for exit and unreached cells.
    next:      Vec<u32>,
    exit_target: Point,
}

#[inline]
fn to_mm(metres: f64) -> u64 {
    (metres * 1000.0).round() as u64
}

impl DistanceMap {
    pub fn build(input: &MapInput) -> Self {
        let c = input.cell_size;
        let (mut lo, mut hi) = input.exit.bounding_box();
        for area in &input.areas {
            let (a, b) = area.bounding_box();
            lo = Point::new(lo.x.min(a.x), lo.y.min(a.y));
            hi = Point::new(hi.x.max(b.x), hi.y.max(b.y));
        }
        let origin = lo - Point::new(c, c);
        let width = ((hi.x - origin.x) / c).ceil() as usize + 2;
        let height = ((hi.y - origin.y) / c).ceil() as usize + 2;

        let mut map = DistanceMap {
            width,
            height,
            cell_size: c,
            origin,
            cells: vec![Cell::Blocked; width * height],
            next: vec![NONE; width * height],
            exit_target: input.exit.centroid(),
        };

        let walkable =
            |centre: Point| input.exit.contains(centre) || input.areas.iter().any(|a| a.contains(centre));
        for y in 0..height {
            for x in 0..width {
                if walkable(map.grid_to_world(x, y)) {
                    map.cells[y * width + x] = Cell::FreeSpace;
                }
            }
        }
        for wall in &input.walls {
            for i in map.cells_near(wall) {
                map.cells[i] = Cell::Blocked;
            }
        }
        // Wall bands must not close the openings between them.
        for opening in &input.openings {
            for i in map.cells_near(opening) {
                if walkable(map.grid_to_world(i % width, i / width)) {
                    map.cells[i] = Cell::FreeSpace;
                }
            }
        }

        let mut exits: Vec<usize> = (0..width * height)
            .filter(|&i| {
                map.cells[i] == Cell::FreeSpace
                    && input.exit.contains(map.grid_to_world(i % width, i / width))
            })
            .collect();
        if let Some((x, y)) = map.world_to_grid(map.exit_target) {
            let i = map.get_index(x, y);
            if !exits.contains(&i) {
                exits.push(i);
            }
        }
        map.propagate(&exits);
        debug!(width, height, exits = exits.len(), "distance map built");
        map
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    fn get_index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn world_to_grid(&self, p: Point) -> Option<(usize, usize)> {
        let local = p - self.origin;
        if !(local.x >= 0.0 && local.y >= 0.0) {
            return None;
        }
        let (x, y) = ((local.x / self.cell_size) as usize, (local.y / self.cell_size) as usize);
        (x < self.width && y < self.height).then_some((x, y))
    }

    fn grid_to_world(&self, x: usize, y: usize) -> Point {
        self.origin
            + Point::new(
                (x as f64 + 0.5) * self.cell_size,
                (y as f64 + 0.5) * self.cell_size,
            )
    }

    fn offset(&self, i: usize, (dx, dy): (i64, i64)) -> Option<usize> {
        let x = (i % self.width) as i64 + dx;
        let y = (i / self.width) as i64 + dy;
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.get_index(x as usize, y as usize))
    }

    #[inline]
    fn is_blocked(&self, i: usize) -> bool {
        self.cells[i] == Cell::Blocked
    }

    /// Neighbour reachable from `i` by `d`, honouring the corner rule.
    fn step(&self, i: usize, d: (i64, i64)) -> Option<usize> {
        let n = self.offset(i, d)?;
        if self.is_blocked(n) {
            return None;
        }
        if d.0 != 0 && d.1 != 0 {
            let a = self.offset(i, (d.0, 0))?;
            let b = self.offset(i, (0, d.1))?;
            if self.is_blocked(a) || self.is_blocked(b) {
                return None;
            }
        }
        Some(n)
    }

    /// Cells whose centre lies within half a cell of `line`.
    fn cells_near(&self, line: &LineSegment) -> Vec<usize> {
        let c = self.cell_size;
        // Ties count, so a line on a cell boundary still covers a full band.
        let reach = 0.5 * c + 1e-9;
        let span = |a: f64, b: f64, o: f64| {
            (((a.min(b) - o) / c).floor() as i64 - 1, ((a.max(b) - o) / c).floor() as i64 + 1)
        };
        let (x0, x1) = span(line.p1.x, line.p2.x, self.origin.x);
        let (y0, y1) = span(line.p1.y, line.p2.y, self.origin.y);
        let mut near = Vec::new();
        for y in y0.max(0)..=y1.min(self.height as i64 - 1) {
            for x in x0.max(0)..=x1.min(self.width as i64 - 1) {
                let (x, y) = (x as usize, y as usize);
                if line.distance_to(self.grid_to_world(x, y)) <= reach {
                    near.push(self.get_index(x, y));
                }
            }
        }
        near
    }

    fn propagate(&mut self, exits: &[usize]) {
        let straight = to_mm(self.cell_size);
        let diagonal = to_mm(self.cell_size * std::f64::consts::SQRT_2);
        let mut dist = vec![u64::MAX; self.cells.len()];
        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
        for &e in exits {
            // The centroid cell may sit inside a wall band.
            self.cells[e] = Cell::FreeSpace;
            dist[e] = 0;
            heap.push(Reverse((0, e)));
        }
        while let Some(Reverse((cost, i))) = heap.pop() {
            // Skip stale heap entries.
            if cost > dist[i] {
                continue;
            }
            for d in NEIGHBOURS {
                let Some(n) = self.step(i, d) else {
                    continue;
                };
                let w = if d.0 != 0 && d.1 != 0 { diagonal } else { straight };
                let new_cost = cost + w;
                if new_cost < dist[n] {
                    dist[n] = new_cost;
                    self.next[n] = i as u32;
                    heap.push(Reverse((new_cost, n)));
                }
            }
        }
        for (i, &d) in dist.iter().enumerate() {
            if d != u64::MAX {
                self.cells[i] = Cell::Distance(d as f64 / 1000.0);
            }
        }
    }

    fn reached(&self, i: usize) -> Option<f64> {
        match self.cells[i] {
            Cell::Distance(d) => Some(d),
            _ => None,
        }
    }

    /// The cell under `p`; `None` outside the map.
    pub fn value_at(&self, p: Point) -> Option<Cell> {
        let (x, y) = self.world_to_grid(p)?;
        Some(self.cells[self.get_index(x, y)])
    }

    /// Unit direction from the cell under `p` toward its best neighbour.
    pub fn direction(&self, p: Point) -> Option<Point> {
        let (x, y) = self.world_to_grid(p)?;
        let i = self.get_index(x, y);
        let n = self.next[i];
        if n == NONE {
            return None;
        }
        let n = n as usize;
        let from = self.grid_to_world(x, y);
        Some((self.grid_to_world(n % self.width, n / self.width) - from).normalized())
    }

    /// Next waypoint for an agent at `p`.
    pub fn next_target(&self, p: Point) -> RoutingResult<Point> {
        let start = self.world_to_grid(p).and_then(|(x, y)| {
            let i = self.get_index(x, y);
            if self.reached(i).is_some() {
                return Some(i);
            }
            // Standing on a wall cell: continue from the best 4-neighbour.
            NEIGHBOURS[..4]
                .iter()
                .filter_map(|&d| self.offset(i, d))
                .filter_map(|n| self.reached(n).map(|v| (v, n)))
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, n)| n)
        });
        let Some(mut cur) = start else {
            return Err(RoutingError::Unreachable(p));
        };
        if self.next[cur] == NONE {
            return Ok(self.exit_target);
        }
        for _ in 0..LOOKAHEAD {
            match self.next[cur] {
                NONE => break,
                n => cur = n as usize,
            }
        }
        Ok(self.grid_to_world(cur % self.width, cur / self.width))
    }
}

// ── DistanceMapHandle ─────────────────────────────────────────────────────────

/// A distance map that may still be building on a worker thread.  The first
/// read joins the thread; later reads are lock-free.
pub struct DistanceMapHandle {
    stage: StageId,
    map:   OnceLock<DistanceMap>,
    job:   Mutex<Option<JoinHandle<DistanceMap>>>,
}

impl DistanceMapHandle {
    pub fn ready(stage: StageId, map: DistanceMap) -> Self {
        Self { stage, map: OnceLock::from(map), job: Mutex::new(None) }
    }

    pub fn spawn(stage: StageId, input: MapInput) -> Self {
        let job = std::thread::spawn(move || DistanceMap::build(&input));
        Self { stage, map: OnceLock::new(), job: Mutex::new(Some(job)) }
    }

    /// Block until the map is available.
    pub fn get(&self) -> RoutingResult<&DistanceMap> {
        if let Some(map) = self.map.get() {
            return Ok(map);
        }
        let mut job = self.job.lock().map_err(|_| RoutingError::BuildPanicked(self.stage))?;
        if let Some(handle) = job.take() {
            let map = handle.join().map_err(|_| RoutingError::BuildPanicked(self.stage))?;
            let _ = self.map.set(map);
        }
        self.map.get().ok_or(RoutingError::BuildPanicked(self.stage))
    }
}

// ── DistanceMapRouter ─────────────────────────────────────────────────────────

/// Routes agents heading for an exit stage along that exit's distance map.
/// Point destinations and unregistered stages are approached directly.
pub struct DistanceMapRouter {
    cell_size:  f64,
    background: bool,
    areas:      Vec<(StageId, Polygon)>,
    maps:       Map<StageId, DistanceMapHandle>,
    /// Doors closed by command when the maps were last built.
    closed:     Vec<NavLineId>,
}

fn closed_doors(building: &Building) -> Vec<NavLineId> {
    building
        .doors()
        .filter(|(_, f)| f.state() == DoorState::Close)
        .map(|(id, _)| id)
        .collect()
}

impl DistanceMapRouter {
    pub fn new(building: &Building, cell_size: f64, background: bool) -> RoutingResult<Self> {
        if !(cell_size > 0.0) {
            return Err(RoutingError::Config(format!(
                "distance-map cell size must be positive, got {cell_size}"
            )));
        }
        Ok(Self {
            cell_size,
            background,
            areas: Vec::new(),
            maps: Map::default(),
            closed: closed_doors(building),
        })
    }

    fn launch(&self, building: &Building, stage: StageId, area: &Polygon) -> DistanceMapHandle {
        let input = MapInput::from_building(building, area, self.cell_size);
        if self.background {
            DistanceMapHandle::spawn(stage, input)
        } else {
            DistanceMapHandle::ready(stage, DistanceMap::build(&input))
        }
    }

    /// The map of `stage`, blocking on a background build.
    pub fn map(&self, stage: StageId) -> Option<RoutingResult<&DistanceMap>> {
        self.maps.get(&stage).map(DistanceMapHandle::get)
    }
}

impl Router for DistanceMapRouter {
    fn compute_waypoint(
        &self,
        _building:   &Building,
        position:    Point,
        _subroom:    SubRoomId,
        destination: &Destination,
    ) -> RoutingResult<Waypoint> {
        match *destination {
            Destination::Stage { stage, fallback } => match self.maps.get(&stage) {
                Some(handle) => Ok(Waypoint::direct(handle.get()?.next_target(position)?)),
                None => Ok(Waypoint::direct(fallback)),
            },
            Destination::Point(p) => Ok(Waypoint::direct(p)),
        }
    }

    fn register_stage(
        &mut self,
        building: &Building,
        stage:    StageId,
        area:     &Polygon,
    ) -> RoutingResult<()> {
        let handle = self.launch(building, stage, area);
        self.maps.insert(stage, handle);
        self.areas.push((stage, area.clone()));
        Ok(())
    }

    /// Rebuild every map when the set of doors closed by command changed.
    fn update(&mut self, building: &Building, _now: f64) {
        let closed = closed_doors(building);
        if closed == self.closed {
            return;
        }
        info!(closed = closed.len(), maps = self.areas.len(), "door closure changed; rebuilding distance maps");
        self.closed = closed;
        for (stage, area) in &self.areas {
            let handle = self.launch(building, *stage, area);
            self.maps.insert(*stage, handle);
        }
    }
}
