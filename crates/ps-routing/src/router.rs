//! Routing trait, destinations, edge factors, and the router factory.
//!
//! # Pluggability
//!
//! `ps-sim` calls routing through the [`Router`] trait and never names a
//! concrete router.  [`build_router`] picks the implementation once, from a
//! [`RouterKind`], when the simulation is built.

use ps_core::{NavLineId, Point, StageId, SubRoomId};
use ps_geometry::{Building, Polygon};

use crate::distance_map::DistanceMapRouter;
use crate::navgraph::{NavGraphRouter, SearchMode};
use crate::RoutingResult;

#[cfg(feature = "fx-hash")]
pub(crate) type Map<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fx-hash"))]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;

// ── Destination / Waypoint ────────────────────────────────────────────────────

/// Where an agent ultimately wants to go.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Destination {
    /// A fixed point.
    Point(Point),
    /// An exit stage.  Routers that keep per-stage data use it; the others
    /// head for `fallback`, normally the exit area's centroid.
    Stage { stage: StageId, fallback: Point },
}

impl Destination {
    #[inline]
    pub fn point(&self) -> Point {
        match *self {
            Destination::Point(p) => p,
            Destination::Stage { fallback, .. } => fallback,
        }
    }
}

/// The next intermediate target of an agent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Waypoint {
    pub target: Point,
    /// The door this waypoint leads through, if any.
    pub via:    Option<NavLineId>,
}

impl Waypoint {
    pub fn direct(target: Point) -> Self {
        Self { target, via: None }
    }
}

// ── Edge factors ──────────────────────────────────────────────────────────────

/// A named multiplicative cost modifier on one door, e.g. "smoke" × 5.
/// A factor with `expires_at` is dropped by [`Router::update`] once the
/// simulated time reaches it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeFactor {
    pub door:       NavLineId,
    pub name:       String,
    pub factor:     f64,
    pub expires_at: Option<f64>,
}

impl EdgeFactor {
    pub fn new(door: NavLineId, name: impl Into<String>, factor: f64) -> Self {
        Self { door, name: name.into(), factor, expires_at: None }
    }

    pub fn until(mut self, time: f64) -> Self {
        self.expires_at = Some(time);
        self
    }
}

/// Active factors per door.  A factor with the same name replaces the
/// previous one on that door.
#[derive(Clone, Debug, Default)]
pub struct FactorTable {
    by_door: Map<NavLineId, Vec<EdgeFactor>>,
}

impl FactorTable {
    pub fn apply(&mut self, factor: EdgeFactor) {
        let list = self.by_door.entry(factor.door).or_default();
        list.retain(|f| f.name != factor.name);
        list.push(factor);
    }

    /// Drop factors whose expiry time is `<= now`.  Returns how many went.
    pub fn expire(&mut self, now: f64) -> usize {
        let mut dropped = 0;
        for list in self.by_door.values_mut() {
            let before = list.len();
            list.retain(|f| f.expires_at.is_none_or(|t| t > now));
            dropped += before - list.len();
        }
        self.by_door.retain(|_, l| !l.is_empty());
        dropped
    }

    /// Product of all active factors on `door` (1 when none).
    pub fn factor(&self, door: NavLineId) -> f64 {
        self.by_door
            .get(&door)
            .map_or(1.0, |l| l.iter().map(|f| f.factor).product())
    }

    pub fn len(&self) -> usize {
        self.by_door.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_door.is_empty()
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// # Thread safety
///
/// `compute_waypoint` takes `&self` and runs on Rayon workers during the
/// routing phase; everything that mutates (`register_stage`, `update`,
/// `apply_factor`) is called from the sequential part of the iteration.
pub trait Router: Send + Sync {
    /// Next waypoint for an agent at `position` in `subroom`.
    fn compute_waypoint(
        &self,
        building:    &Building,
        position:    Point,
        subroom:     SubRoomId,
        destination: &Destination,
    ) -> RoutingResult<Waypoint>;

    /// Called once for every exit stage added to the simulation.
    fn register_stage(
        &mut self,
        _building: &Building,
        _stage:    StageId,
        _area:     &Polygon,
    ) -> RoutingResult<()> {
        Ok(())
    }

    /// Called after door states changed and once per iteration with the
    /// current simulated time.
    fn update(&mut self, _building: &Building, _now: f64) {}

    fn apply_factor(&mut self, _factor: EdgeFactor) {}
}

// ── DirectRouter ──────────────────────────────────────────────────────────────

/// Straight line to the destination.  Suitable for single-subroom scenes.
pub struct DirectRouter;

impl Router for DirectRouter {
    fn compute_waypoint(
        &self,
        _building:   &Building,
        _position:   Point,
        _subroom:    SubRoomId,
        destination: &Destination,
    ) -> RoutingResult<Waypoint> {
        Ok(Waypoint::direct(destination.point()))
    }
}

// ── Factory ───────────────────────────────────────────────────────────────────

/// Default edge length of a distance-map cell (m).
pub const DEFAULT_MAP_CELL_SIZE: f64 = 0.5;

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouterKind {
    Direct,
    /// Per-exit distance maps; `background` builds them on worker threads.
    DistanceMap { cell_size: f64, background: bool },
    NavGraph { mode: SearchMode },
}

impl Default for RouterKind {
    fn default() -> Self {
        RouterKind::NavGraph { mode: SearchMode::ShortestPath }
    }
}

pub fn build_router(kind: RouterKind, building: &Building) -> RoutingResult<Box<dyn Router>> {
    Ok(match kind {
        RouterKind::Direct => Box::new(DirectRouter),
        RouterKind::DistanceMap { cell_size, background } => {
            Box::new(DistanceMapRouter::new(building, cell_size, background)?)
        }
        RouterKind::NavGraph { mode } => Box::new(NavGraphRouter::new(building, mode)),
    })
}
