//! Simple polygons and the wall-chaining routine that builds them.

use ps_core::{LineSegment, Point, EPS};

use crate::{GeometryError, GeometryResult};

/// Endpoint-matching tolerance used when chaining walls into an outline.
pub const CHAIN_TOLERANCE: f64 = 0.03;

// ── Polygon ───────────────────────────────────────────────────────────────────

/// A simple polygon given by its vertices in order (no repeated closing
/// vertex).  Either winding is accepted.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Build from vertices, dropping a repeated closing vertex.
    pub fn new(mut vertices: Vec<Point>) -> GeometryResult<Self> {
        if vertices.len() > 1 {
            let (first, last) = (vertices[0], vertices[vertices.len() - 1]);
            if first.distance(last) < EPS {
                vertices.pop();
            }
        }
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices(vertices.len()));
        }
        Ok(Self { vertices })
    }

    /// Axis-aligned rectangle with corners `min` and `max`.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self {
            vertices: vec![
                min,
                Point::new(max.x, min.y),
                max,
                Point::new(min.x, max.y),
            ],
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Boundary edges in vertex order, closing edge last.
    pub fn edges(&self) -> impl Iterator<Item = LineSegment> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| LineSegment::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area; positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f64 {
        self.edges().map(|e| e.p1.det(e.p2)).sum::<f64>() * 0.5
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn centroid(&self) -> Point {
        let a = self.signed_area();
        if a.abs() < EPS {
            let sum = self.vertices.iter().fold(Point::ZERO, |acc, &p| acc + p);
            return sum / self.vertices.len() as f64;
        }
        let mut c = Point::ZERO;
        for e in self.edges() {
            let cross = e.p1.det(e.p2);
            c += (e.p1 + e.p2) * cross;
        }
        c / (6.0 * a)
    }

    /// `(min, max)` corners of the bounding box.
    pub fn bounding_box(&self) -> (Point, Point) {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.vertices {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }

    /// Point-in-polygon test.  Points on the boundary count as inside.
    pub fn contains(&self, p: Point) -> bool {
        if self.edges().any(|e| e.contains_point(p, EPS)) {
            return true;
        }
        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;
        for i in 0..n {
            let (vi, vj) = (self.vertices[i], self.vertices[j]);
            if (vi.y > p.y) != (vj.y > p.y)
                && p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    pub fn is_convex(&self) -> bool {
        let n = self.vertices.len();
        let mut sign = 0.0_f64;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let c = self.vertices[(i + 2) % n];
            let turn = (b - a).det(c - b);
            if turn.abs() < EPS {
                continue;
            }
            if sign == 0.0 {
                sign = turn.signum();
            } else if turn.signum() != sign {
                return false;
            }
        }
        true
    }

    /// `true` if no two non-adjacent edges touch and adjacent edges only
    /// share their common vertex.
    pub fn is_simple(&self) -> bool {
        let edges: Vec<LineSegment> = self.edges().collect();
        let n = edges.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    if edges[i].overlaps(&edges[j]) {
                        return false;
                    }
                } else if edges[i].intersects(&edges[j]) {
                    return false;
                }
            }
        }
        true
    }
}

// ── Outline construction ──────────────────────────────────────────────────────

/// Chain `walls` and `nav_lines` into one closed outline.
///
/// Segments are matched endpoint-to-endpoint within [`CHAIN_TOLERANCE`], in
/// input order.  Fails if any two segments cross or overlap, if a segment is
/// left over, if the chain does not close, or if the result is not simple.
pub fn convert_lines_to_polygon(
    walls:     &[LineSegment],
    nav_lines: &[LineSegment],
) -> GeometryResult<Polygon> {
    let segments: Vec<LineSegment> = walls.iter().chain(nav_lines).copied().collect();
    if segments.len() < 3 {
        return Err(GeometryError::TooFewVertices(segments.len()));
    }

    for (i, a) in segments.iter().enumerate() {
        for b in &segments[i + 1..] {
            if a.overlaps(b) {
                return Err(GeometryError::OverlappingSegments { a: *a, b: *b });
            }
            if a.intersects(b) && !a.shares_endpoint(b, CHAIN_TOLERANCE) {
                return Err(GeometryError::CrossingSegments { a: *a, b: *b });
            }
        }
    }

    let mut used = vec![false; segments.len()];
    used[0] = true;
    let start = segments[0].p1;
    let mut outline = vec![start, segments[0].p2];
    let mut end = segments[0].p2;

    while end.distance(start) > CHAIN_TOLERANCE {
        let next = segments.iter().enumerate().find_map(|(i, s)| {
            if used[i] {
                None
            } else if s.p1.distance(end) <= CHAIN_TOLERANCE {
                Some((i, s.p2))
            } else if s.p2.distance(end) <= CHAIN_TOLERANCE {
                Some((i, s.p1))
            } else {
                None
            }
        });
        match next {
            Some((i, p)) => {
                used[i] = true;
                outline.push(p);
                end = p;
            }
            None => return Err(GeometryError::NotClosed { gap: end.distance(start) }),
        }
    }
    outline.pop();

    let unused = used.iter().filter(|u| !**u).count();
    if unused > 0 {
        return Err(GeometryError::UnusedSegments { count: unused });
    }

    let polygon = Polygon::new(outline)?;
    if !polygon.is_simple() {
        return Err(GeometryError::SelfIntersecting);
    }
    Ok(polygon)
}
