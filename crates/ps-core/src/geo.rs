//! Planar geometry primitives: `Point` and `LineSegment`.
//!
//! All coordinates are metres in a local Cartesian frame, stored as `f64`.
//! `Point` doubles as a 2-D vector (velocities, directions, forces).

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Numeric tolerance for degenerate-length and on-line tests.
pub const EPS: f64 = 1e-6;

// ── Point ─────────────────────────────────────────────────────────────────────

/// A 2-D point or vector.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn norm_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    #[inline]
    pub fn normalized(self) -> Point {
        let n = self.norm();
        if n < EPS { Point::ZERO } else { self / n }
    }

    #[inline]
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2-D cross product (determinant of the 2×2 matrix `[self other]`).
    #[inline]
    pub fn det(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Rotate by +90°.
    #[inline]
    pub fn rotate90(self) -> Point {
        Point::new(-self.y, self.x)
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        (self - other).norm()
    }

    #[inline]
    pub fn distance_sq(self, other: Point) -> f64 {
        (self - other).norm_sq()
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Linear interpolation: `self` at `t = 0`, `other` at `t = 1`.
    #[inline]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        self + (other - self) * t
    }

    /// Express `self` in the frame of an ellipse centred at `center` whose
    /// semi-axis `a` points along `(cos, sin)`.
    #[inline]
    pub fn to_local_frame(self, center: Point, cos: f64, sin: f64) -> Point {
        let d = self - center;
        Point::new(d.x * cos + d.y * sin, -d.x * sin + d.y * cos)
    }

    /// Inverse of [`to_local_frame`](Self::to_local_frame).
    #[inline]
    pub fn from_local_frame(self, center: Point, cos: f64, sin: f64) -> Point {
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos) + center
    }
}

impl Add for Point {
    type Output = Point;
    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    #[inline]
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    #[inline]
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    #[inline]
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;
    #[inline]
    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    #[inline]
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

// ── LineSegment ───────────────────────────────────────────────────────────────

/// A closed line segment `p1 → p2`.  Walls, doors, and agent steps are all
/// represented this way.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSegment {
    pub p1: Point,
    pub p2: Point,
}

impl LineSegment {
    #[inline]
    pub const fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.p1.distance(self.p2)
    }

    #[inline]
    pub fn centre(&self) -> Point {
        (self.p1 + self.p2) * 0.5
    }

    #[inline]
    pub fn direction(&self) -> Point {
        self.p2 - self.p1
    }

    /// Unit normal (the direction rotated by +90°).
    #[inline]
    pub fn normal(&self) -> Point {
        self.direction().rotate90().normalized()
    }

    /// Magnitude of the component of `v` perpendicular to the segment.
    #[inline]
    pub fn normal_component(&self, v: Point) -> f64 {
        v.dot(self.normal()).abs()
    }

    /// Same segment with endpoints swapped.
    #[inline]
    pub fn reversed(&self) -> LineSegment {
        LineSegment::new(self.p2, self.p1)
    }

    /// Closest point on the segment to `p`.
    pub fn shortest_point(&self, p: Point) -> Point {
        let d = self.direction();
        let len_sq = d.norm_sq();
        if len_sq < EPS * EPS {
            return self.p1;
        }
        let t = ((p - self.p1).dot(d) / len_sq).clamp(0.0, 1.0);
        self.p1 + d * t
    }

    /// Distance from `p` to the closest point on the segment.
    #[inline]
    pub fn distance_to(&self, p: Point) -> f64 {
        p.distance(self.shortest_point(p))
    }

    /// Signed side of `p`: positive on the left of `p1 → p2`, negative on the
    /// right, ~0 on the supporting line.
    #[inline]
    pub fn side(&self, p: Point) -> f64 {
        self.direction().det(p - self.p1)
    }

    /// `true` if `p` lies on the segment within `tol`.
    #[inline]
    pub fn contains_point(&self, p: Point, tol: f64) -> bool {
        self.distance_to(p) <= tol
    }

    /// `true` if either endpoint of `self` coincides with an endpoint of
    /// `other` within `tol`.
    pub fn shares_endpoint(&self, other: &LineSegment, tol: f64) -> bool {
        [self.p1, self.p2]
            .iter()
            .any(|a| a.distance(other.p1) <= tol || a.distance(other.p2) <= tol)
    }

    /// `true` if the two segments have at least one point in common
    /// (proper crossings, touching endpoints, and collinear overlap).
    pub fn intersects(&self, other: &LineSegment) -> bool {
        let d1 = other.side(self.p1);
        let d2 = other.side(self.p2);
        let d3 = self.side(other.p1);
        let d4 = self.side(other.p2);

        if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
            && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
        {
            return true;
        }

        other.contains_point(self.p1, EPS)
            || other.contains_point(self.p2, EPS)
            || self.contains_point(other.p1, EPS)
            || self.contains_point(other.p2, EPS)
    }

    /// `true` only for a proper crossing: each segment has its endpoints
    /// strictly on opposite sides of the other.  Touching does not count.
    pub fn crosses(&self, other: &LineSegment) -> bool {
        let d1 = other.side(self.p1);
        let d2 = other.side(self.p2);
        let d3 = self.side(other.p1);
        let d4 = self.side(other.p2);
        d1 * d2 < 0.0 && d3 * d4 < 0.0 && d1.abs() > EPS && d2.abs() > EPS
            && d3.abs() > EPS && d4.abs() > EPS
    }

    /// Intersection point of the supporting lines, restricted to both
    /// segments.  `None` for parallel segments or when the lines meet
    /// outside either segment.
    pub fn intersection_point(&self, other: &LineSegment) -> Option<Point> {
        let r = self.direction();
        let s = other.direction();
        let denom = r.det(s);
        if denom.abs() < EPS * EPS {
            return None;
        }
        let qp = other.p1 - self.p1;
        let t = qp.det(s) / denom;
        let u = qp.det(r) / denom;
        if (-EPS..=1.0 + EPS).contains(&t) && (-EPS..=1.0 + EPS).contains(&u) {
            Some(self.p1 + r * t)
        } else {
            None
        }
    }

    /// `true` if the segments are collinear and share a stretch of positive
    /// length.
    pub fn overlaps(&self, other: &LineSegment) -> bool {
        let d = self.direction();
        let len = d.norm();
        if len < EPS {
            return false;
        }
        if (other.side(self.p1) / other.length().max(EPS)).abs() > EPS
            || (other.side(self.p2) / other.length().max(EPS)).abs() > EPS
        {
            return false;
        }
        let u = d / len;
        let a = (other.p1 - self.p1).dot(u);
        let b = (other.p2 - self.p1).dot(u);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        hi.min(len) - lo.max(0.0) > EPS
    }
}

impl fmt::Display for LineSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} – {}]", self.p1, self.p2)
    }
}
