//! Static R-tree over wall segments.
//!
//! Walls never move, so the tree is bulk-loaded once when the simulation is
//! built and only queried afterwards.

use ps_core::{LineSegment, Point};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct WallEntry {
    segment: LineSegment,
}

impl RTreeObject for WallEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let LineSegment { p1, p2 } = self.segment;
        AABB::from_corners([p1.x, p1.y], [p2.x, p2.y])
    }
}

impl PointDistance for WallEntry {
    /// Squared distance from `point` to the closest point of the segment.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let p = Point::new(point[0], point[1]);
        p.distance_sq(self.segment.shortest_point(p))
    }
}

// ── WallIndex ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct WallIndex {
    tree: RTree<WallEntry>,
}

impl WallIndex {
    pub fn new<I>(walls: I) -> Self
    where
        I: IntoIterator<Item = LineSegment>,
    {
        let entries = walls.into_iter().map(|segment| WallEntry { segment }).collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    pub fn empty() -> Self {
        Self { tree: RTree::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Walls with any point within `distance` of `p`.
    pub fn walls_within(&self, p: Point, distance: f64) -> impl Iterator<Item = &LineSegment> + '_ {
        self.tree
            .locate_within_distance([p.x, p.y], distance * distance)
            .map(|e| &e.segment)
    }

    /// The wall closest to `p` and its distance.
    pub fn nearest_wall(&self, p: Point) -> Option<(&LineSegment, f64)> {
        self.tree
            .nearest_neighbor(&[p.x, p.y])
            .map(|e| (&e.segment, e.segment.distance_to(p)))
    }

    /// `true` if `segment` touches any wall.  Used for line-of-sight tests
    /// between agents.
    pub fn blocks(&self, segment: &LineSegment) -> bool {
        let half = segment.length() * 0.5;
        self.walls_within(segment.centre(), half + 1e-9)
            .any(|w| w.intersects(segment))
    }
}
