//! Velocity-dependent ellipses of the force-based model.

use ps_agent::EllipseShape;
use ps_core::{Point, EPS};

/// An agent's body at one instant: an ellipse centred on its position
/// whose `a` axis points along `(cos, sin)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ellipse {
    pub center: Point,
    pub cos:    f64,
    pub sin:    f64,
    pub a:      f64,
    pub b:      f64,
}

impl Ellipse {
    /// Ellipse of an agent at `center` facing `orientation` and walking at
    /// `speed` with desired speed `v0`.
    pub fn new(shape: &EllipseShape, center: Point, orientation: Point, speed: f64, v0: f64) -> Self {
        Self {
            center,
            cos: orientation.x,
            sin: orientation.y,
            a: shape.semi_axis_a(speed),
            b: shape.semi_axis_b(speed, v0),
        }
    }

    /// Boundary point on the ray from the centre towards `p`.
    ///
    /// Uses the parametric angle of `p` in the ellipse frame, which is exact
    /// on the axes and a close approximation elsewhere.  A `p` on the centre
    /// maps to the tip of the `a` axis.
    pub fn point_towards(&self, p: Point) -> Point {
        let local = p.to_local_frame(self.center, self.cos, self.sin);
        let r = local.norm();
        let on_ellipse = if r < EPS {
            Point::new(self.a, 0.0)
        } else {
            Point::new(self.a * local.x / r, self.b * local.y / r)
        };
        on_ellipse.from_local_frame(self.center, self.cos, self.sin)
    }

    /// Distance from the centre to [`point_towards`](Self::point_towards).
    #[inline]
    pub fn radius_towards(&self, p: Point) -> f64 {
        self.point_towards(p).distance(self.center)
    }

    /// Centre distance minus both radii along the connecting line.  Negative
    /// when the ellipses overlap.
    pub fn effective_distance(&self, other: &Ellipse) -> f64 {
        self.center.distance(other.center)
            - self.radius_towards(other.center)
            - other.radius_towards(self.center)
    }
}
