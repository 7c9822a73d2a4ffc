//! Bottleneck geometry: a waiting hall drained through a narrow corridor.

use ps_core::{GoalId, LineSegment, NavLineId, Point};
use ps_geometry::{Building, BuildingBuilder, DoorLimits, GeometryResult, Polygon};

pub const HALL_WIDTH:      f64 = 10.0;
pub const HALL_HEIGHT:     f64 = 8.0;
pub const CORRIDOR_LENGTH: f64 = 4.0;
pub const BOTTLENECK:      f64 = 1.0;

/// Handles into the bottleneck building.
pub struct Layout {
    pub entrance: NavLineId,
    pub exit:     NavLineId,
    /// Area just beyond the corridor exit.
    pub outside:  GoalId,
}

fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> LineSegment {
    LineSegment::new(Point::new(x1, y1), Point::new(x2, y2))
}

/// Build the hall and the corridor.  The corridor entrance is throttled to
/// `outflow_rate` persons per second when given.
pub fn build_bottleneck(outflow_rate: Option<f64>) -> GeometryResult<(Building, Layout)> {
    let (w, h, l) = (HALL_WIDTH, HALL_HEIGHT, CORRIDOR_LENGTH);
    let lo = (h - BOTTLENECK) / 2.0;
    let hi = lo + BOTTLENECK;

    let mut b = BuildingBuilder::new();
    let hall_room = b.add_room("hall");
    let hall = b.add_subroom(hall_room, "hall", vec![
        seg(0.0, 0.0, w, 0.0),
        seg(w, 0.0, w, lo),
        seg(w, hi, w, h),
        seg(w, h, 0.0, h),
        seg(0.0, h, 0.0, 0.0),
    ]);
    let corridor_room = b.add_room("corridor");
    let corridor = b.add_subroom(corridor_room, "corridor", vec![
        seg(w, lo, w + l, lo),
        seg(w + l, hi, w, hi),
    ]);

    let mut limits = DoorLimits::default();
    if let Some(rate) = outflow_rate {
        limits = limits.with_outflow_rate(rate);
    }
    let entrance = b.add_room_door("entrance", seg(w, lo, w, hi), hall, Some(corridor), limits);
    let exit = b.add_room_door("exit", seg(w + l, lo, w + l, hi), corridor, None, DoorLimits::default());
    let outside = b.add_goal("outside", Polygon::rectangle(Point::new(w + l, lo), Point::new(w + l + 1.0, hi)));

    Ok((b.build()?, Layout { entrance, exit, outside }))
}

/// Spawn positions on a 1 m grid, clear of the hall walls.
pub fn spawn_grid() -> Vec<Point> {
    let mut points = Vec::new();
    for ix in 1..(HALL_WIDTH as i32 - 1) {
        for iy in 1..(HALL_HEIGHT as i32) {
            points.push(Point::new(ix as f64, iy as f64));
        }
    }
    points
}
