//! Unit tests for ps-routing.

use ps_core::{LineSegment, NavLineId, Point, SubRoomId};
use ps_geometry::{Building, BuildingBuilder, DoorLimits, Polygon};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> LineSegment {
    LineSegment::new(p(x1, y1), p(x2, y2))
}

/// One room, two subrooms side by side (x ∈ [0,4] and [4,8]) joined by a
/// lower door (y ∈ [1.5,2.5]) and an upper door (y ∈ [3.0,3.8]); an exit
/// on the right at y ∈ [1.5,2.5].
struct TwoDoors {
    building: Building,
    left:     SubRoomId,
    right:    SubRoomId,
    lower:    NavLineId,
    upper:    NavLineId,
    exit:     NavLineId,
}

fn two_doors() -> TwoDoors {
    let mut b = BuildingBuilder::new();
    let r = b.add_room("hall");
    let left = b.add_subroom(r, "left", vec![
        seg(0.0, 0.0, 4.0, 0.0),
        seg(4.0, 0.0, 4.0, 1.5),
        seg(4.0, 2.5, 4.0, 3.0),
        seg(4.0, 3.8, 4.0, 4.0),
        seg(4.0, 4.0, 0.0, 4.0),
        seg(0.0, 4.0, 0.0, 0.0),
    ]);
    let right = b.add_subroom(r, "right", vec![
        seg(4.0, 0.0, 8.0, 0.0),
        seg(8.0, 0.0, 8.0, 1.5),
        seg(8.0, 2.5, 8.0, 4.0),
        seg(8.0, 4.0, 4.0, 4.0),
        seg(4.0, 4.0, 4.0, 3.8),
        seg(4.0, 3.0, 4.0, 2.5),
        seg(4.0, 1.5, 4.0, 0.0),
    ]);
    let lower = b.add_internal_door("lower", seg(4.0, 1.5, 4.0, 2.5), left, right, DoorLimits::default());
    let upper = b.add_internal_door("upper", seg(4.0, 3.0, 4.0, 3.8), left, right, DoorLimits::default());
    let exit = b.add_room_door("exit", seg(8.0, 1.5, 8.0, 2.5), right, None, DoorLimits::default());
    TwoDoors { building: b.build().unwrap(), left, right, lower, upper, exit }
}

/// Two rooms joined by a single door at x = 4, exit at x = 8.
fn corridor() -> (Building, SubRoomId, SubRoomId, NavLineId) {
    let mut b = BuildingBuilder::new();
    let ra = b.add_room("a");
    let rb = b.add_room("b");
    let left = b.add_subroom(ra, "left", vec![
        seg(0.0, 0.0, 4.0, 0.0),
        seg(4.0, 0.0, 4.0, 1.5),
        seg(4.0, 2.5, 4.0, 4.0),
        seg(4.0, 4.0, 0.0, 4.0),
        seg(0.0, 4.0, 0.0, 0.0),
    ]);
    let right = b.add_subroom(rb, "right", vec![
        seg(4.0, 0.0, 8.0, 0.0),
        seg(8.0, 0.0, 8.0, 1.5),
        seg(8.0, 2.5, 8.0, 4.0),
        seg(8.0, 4.0, 4.0, 4.0),
        seg(4.0, 4.0, 4.0, 2.5),
        seg(4.0, 1.5, 4.0, 0.0),
    ]);
    let door = b.add_room_door("a-b", seg(4.0, 1.5, 4.0, 2.5), left, Some(right), DoorLimits::default());
    b.add_room_door("exit", seg(8.0, 1.5, 8.0, 2.5), right, None, DoorLimits::default());
    (b.build().unwrap(), left, right, door)
}

fn exit_area() -> Polygon {
    Polygon::rectangle(p(8.0, 1.5), p(9.0, 2.5))
}

// ── Navigation graph ──────────────────────────────────────────────────────────

#[cfg(test)]
mod navgraph {
    use ps_core::StageId;
    use ps_geometry::DoorState;

    use super::*;
    use crate::{
        build_router, Destination, EdgeFactor, NavGraphRouter, Router, RouterKind, RoutingError,
        SearchMode, Waypoint,
    };

    const OUTSIDE: Destination = Destination::Point(Point { x: 9.0, y: 2.0 });

    #[test]
    fn same_subroom_goes_direct() {
        let t = two_doors();
        let router = NavGraphRouter::new(&t.building, SearchMode::ShortestPath);
        let wp = router
            .compute_waypoint(&t.building, p(1.0, 1.0), t.left, &Destination::Point(p(3.0, 3.0)))
            .unwrap();
        assert_eq!(wp, Waypoint::direct(p(3.0, 3.0)));
    }

    #[test]
    fn shortest_path_takes_the_cheaper_door() {
        let t = two_doors();
        let router = NavGraphRouter::new(&t.building, SearchMode::ShortestPath);
        // 2.0 + 4.24 through the upper door beats 2.44 + 4.0 through the lower.
        let wp = router.compute_waypoint(&t.building, p(2.0, 3.4), t.left, &OUTSIDE).unwrap();
        assert_eq!(wp.via, Some(t.upper));
        assert!(wp.target.distance(p(4.5, 3.4)) < 1e-9, "waypoint lies past the door");

        let wp = router.compute_waypoint(&t.building, p(6.0, 2.0), t.right, &OUTSIDE).unwrap();
        assert_eq!(wp.via, Some(t.exit));
        assert!(wp.target.x > 8.0);
    }

    #[test]
    fn factors_reroute_until_they_expire() {
        let t = two_doors();
        let mut router = NavGraphRouter::new(&t.building, SearchMode::ShortestPath);
        router.apply_factor(EdgeFactor::new(t.upper, "smoke", 2.0).until(10.0));
        let wp = router.compute_waypoint(&t.building, p(2.0, 3.4), t.left, &OUTSIDE).unwrap();
        assert_eq!(wp.via, Some(t.lower));

        router.update(&t.building, 9.99);
        assert_eq!(router.factors().len(), 1);
        router.update(&t.building, 10.0);
        assert!(router.factors().is_empty());
        let wp = router.compute_waypoint(&t.building, p(2.0, 3.4), t.left, &OUTSIDE).unwrap();
        assert_eq!(wp.via, Some(t.upper));
    }

    #[test]
    fn same_name_replaces_factor() {
        let t = two_doors();
        let mut router = NavGraphRouter::new(&t.building, SearchMode::ShortestPath);
        router.apply_factor(EdgeFactor::new(t.upper, "smoke", 2.0));
        router.apply_factor(EdgeFactor::new(t.upper, "smoke", 3.0));
        router.apply_factor(EdgeFactor::new(t.upper, "crowd", 2.0));
        assert!((router.factors().factor(t.upper) - 6.0).abs() < 1e-12);
        assert_eq!(router.factors().factor(t.lower), 1.0);
    }

    #[test]
    fn closed_doors_are_skipped() {
        let mut t = two_doors();
        t.building.set_door_state(t.upper, DoorState::Close).unwrap();
        let router = NavGraphRouter::new(&t.building, SearchMode::ShortestPath);
        let wp = router.compute_waypoint(&t.building, p(2.0, 3.4), t.left, &OUTSIDE).unwrap();
        assert_eq!(wp.via, Some(t.lower));

        t.building.set_door_state(t.lower, DoorState::Close).unwrap();
        let err = router.compute_waypoint(&t.building, p(2.0, 3.4), t.left, &OUTSIDE).unwrap_err();
        assert!(matches!(err, RoutingError::NoPath { .. }));
    }

    #[test]
    fn temporarily_closed_doors_stay_routable() {
        let mut t = two_doors();
        t.building.set_door_state(t.upper, DoorState::TempClose).unwrap();
        let router = NavGraphRouter::new(&t.building, SearchMode::ShortestPath);
        let wp = router.compute_waypoint(&t.building, p(2.0, 3.4), t.left, &OUTSIDE).unwrap();
        assert_eq!(wp.via, Some(t.upper));
    }

    #[test]
    fn cheapest_local_edge() {
        let t = two_doors();
        let router = NavGraphRouter::new(&t.building, SearchMode::CheapestLocalEdge);
        let wp = router.compute_waypoint(&t.building, p(2.0, 3.4), t.left, &OUTSIDE).unwrap();
        assert_eq!(wp.via, Some(t.upper));
        let wp = router.compute_waypoint(&t.building, p(2.0, 1.0), t.left, &OUTSIDE).unwrap();
        assert_eq!(wp.via, Some(t.lower));
    }

    #[test]
    fn stage_destinations_use_their_fallback() {
        let t = two_doors();
        let router = build_router(RouterKind::default(), &t.building).unwrap();
        let dest = Destination::Stage { stage: StageId(0), fallback: p(6.0, 2.0) };
        let wp = router.compute_waypoint(&t.building, p(2.0, 2.0), t.left, &dest).unwrap();
        assert_eq!(wp.via, Some(t.lower));
        let wp = router.compute_waypoint(&t.building, p(5.0, 2.0), t.right, &dest).unwrap();
        assert_eq!(wp, Waypoint::direct(p(6.0, 2.0)));
    }

    #[test]
    fn unknown_subroom_is_an_error() {
        let t = two_doors();
        let router = NavGraphRouter::new(&t.building, SearchMode::ShortestPath);
        let err = router.compute_waypoint(&t.building, p(2.0, 2.0), SubRoomId(99), &OUTSIDE);
        assert!(matches!(err, Err(RoutingError::Geometry(_))));
    }

    #[test]
    fn direct_router_ignores_geometry() {
        let t = two_doors();
        let router = build_router(RouterKind::Direct, &t.building).unwrap();
        let wp = router.compute_waypoint(&t.building, p(2.0, 2.0), t.right, &OUTSIDE).unwrap();
        assert_eq!(wp, Waypoint::direct(p(9.0, 2.0)));
    }
}

// ── Distance maps ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod distance_map {
    use ps_core::StageId;
    use ps_geometry::DoorState;

    use super::*;
    use crate::{
        build_router, Cell, Destination, DistanceMap, DistanceMapHandle, MapInput, Router,
        RouterKind, RoutingError, DEFAULT_MAP_CELL_SIZE,
    };

    fn closed_box() -> Building {
        let mut b = BuildingBuilder::new();
        let r = b.add_room("box");
        b.add_subroom(r, "box", vec![
            seg(0.0, 0.0, 10.0, 0.0),
            seg(10.0, 0.0, 10.0, 10.0),
            seg(10.0, 10.0, 0.0, 10.0),
            seg(0.0, 10.0, 0.0, 0.0),
        ]);
        b.build().unwrap()
    }

    fn distance(map: &DistanceMap, at: Point) -> f64 {
        match map.value_at(at) {
            Some(Cell::Distance(d)) => d,
            other => panic!("{at} not reached: {other:?}"),
        }
    }

    #[test]
    fn descends_monotonically_to_a_point_exit() {
        let building = closed_box();
        let exit = Polygon::rectangle(p(8.0, 8.0), p(8.4, 8.4));
        let map = DistanceMap::build(&MapInput::from_building(&building, &exit, 0.5));

        assert_eq!(map.value_at(exit.centroid()), Some(Cell::Distance(0.0)));

        for start in [p(1.0, 1.0), p(9.0, 1.0), p(1.0, 9.0), p(5.0, 5.0)] {
            let mut pos = start;
            let mut d = distance(&map, pos);
            let mut steps = 0;
            while d > 0.0 {
                let next = map.next_target(pos).unwrap();
                let nd = distance(&map, next);
                assert!(nd < d, "{pos} ({d}) -> {next} ({nd}) does not descend");
                pos = next;
                d = nd;
                steps += 1;
                assert!(steps < 100);
            }
        }
        assert!(distance(&map, p(1.0, 1.0)) > distance(&map, p(5.0, 5.0)));
    }

    #[test]
    fn walls_are_blocked_and_handled() {
        let building = closed_box();
        let exit = Polygon::rectangle(p(8.0, 8.0), p(8.4, 8.4));
        let map = DistanceMap::build(&MapInput::from_building(&building, &exit, 0.5));
        assert_eq!(map.value_at(p(0.1, 5.0)), Some(Cell::Blocked));
        // On a wall cell the walk continues from a reached neighbour.
        assert!(map.next_target(p(0.1, 5.0)).is_ok());
        assert!(matches!(map.next_target(p(50.0, 50.0)), Err(RoutingError::Unreachable(_))));
        assert!(map.direction(p(5.0, 5.0)).is_some_and(|d| d.x > 0.0 && d.y > 0.0));
    }

    #[test]
    fn routes_through_the_door_to_an_outside_exit() {
        let (building, _, _, _) = corridor();
        let map = DistanceMap::build(&MapInput::from_building(&building, &exit_area(), DEFAULT_MAP_CELL_SIZE));
        let far = distance(&map, p(1.0, 2.0));
        let near = distance(&map, p(6.0, 2.0));
        assert!(far > near && near > 0.0);
        // Straight-line distance to the exit is a lower bound.
        assert!(far >= p(1.0, 2.0).distance(p(8.0, 2.0)) - 1.0);
    }

    /// Two rooms joined by a door of width `hi - lo` at x = `x`.
    fn narrow_corridor(x: f64, lo: f64, hi: f64) -> (Building, NavLineId) {
        let mut b = BuildingBuilder::new();
        let ra = b.add_room("a");
        let rb = b.add_room("b");
        let left = b.add_subroom(ra, "left", vec![
            seg(0.0, 0.0, x, 0.0),
            seg(x, 0.0, x, lo),
            seg(x, hi, x, 4.0),
            seg(x, 4.0, 0.0, 4.0),
            seg(0.0, 4.0, 0.0, 0.0),
        ]);
        let right = b.add_subroom(rb, "right", vec![
            seg(x, 0.0, 8.0, 0.0),
            seg(8.0, 0.0, 8.0, 1.5),
            seg(8.0, 2.5, 8.0, 4.0),
            seg(8.0, 4.0, x, 4.0),
            seg(x, 4.0, x, hi),
            seg(x, lo, x, 0.0),
        ]);
        let door = b.add_room_door("a-b", seg(x, lo, x, hi), left, Some(right), DoorLimits::default());
        b.add_room_door("exit", seg(8.0, 1.5, 8.0, 2.5), right, None, DoorLimits::default());
        (b.build().unwrap(), door)
    }

    #[test]
    fn sub_metre_doors_stay_passable() {
        for (x, lo, hi) in [(4.0, 1.55, 2.45), (4.1, 1.55, 2.45), (3.9, 1.6, 2.4)] {
            let (building, _) = narrow_corridor(x, lo, hi);
            let map = DistanceMap::build(&MapInput::from_building(&building, &exit_area(), 0.5));

            let target = map.next_target(p(1.0, 2.0));
            assert!(target.is_ok(), "door at x={x} [{lo}, {hi}]: {target:?}");
            assert!(distance(&map, p(1.0, 2.0)) > distance(&map, p(6.0, 2.0)));

            // No walkable cell inside either room is cut off from the exit.
            for i in 0..16 {
                for j in 0..8 {
                    let at = p(0.25 + 0.5 * i as f64, 0.25 + 0.5 * j as f64);
                    assert_ne!(map.value_at(at), Some(Cell::FreeSpace), "{at} unreached");
                }
            }
        }
    }

    #[test]
    fn closed_narrow_door_blocks_the_map() {
        let (mut building, door) = narrow_corridor(4.0, 1.55, 2.45);
        building.set_door_state(door, DoorState::Close).unwrap();
        let map = DistanceMap::build(&MapInput::from_building(&building, &exit_area(), 0.5));
        assert!(matches!(map.next_target(p(1.0, 2.0)), Err(RoutingError::Unreachable(_))));
    }

    #[test]
    fn background_build_matches_foreground() {
        let (building, _, _, _) = corridor();
        let input = MapInput::from_building(&building, &exit_area(), 0.5);
        let direct = DistanceMap::build(&input);
        let handle = DistanceMapHandle::spawn(StageId(0), input);
        let built = handle.get().unwrap();
        assert_eq!(built.dimensions(), direct.dimensions());
        assert_eq!(built.value_at(p(1.0, 2.0)), direct.value_at(p(1.0, 2.0)));
        // Second read hits the cached map.
        assert!(handle.get().is_ok());
    }

    #[test]
    fn router_rebuilds_when_a_door_is_closed() {
        let (mut building, left, _, door) = corridor();
        let mut router = build_router(
            RouterKind::DistanceMap { cell_size: 0.5, background: true },
            &building,
        )
        .unwrap();
        router.register_stage(&building, StageId(0), &exit_area()).unwrap();
        let dest = Destination::Stage { stage: StageId(0), fallback: p(8.5, 2.0) };

        let wp = router.compute_waypoint(&building, p(1.0, 2.0), left, &dest).unwrap();
        assert!(wp.target.x > 1.0);

        building.set_door_state(door, DoorState::Close).unwrap();
        router.update(&building, 1.0);
        let err = router.compute_waypoint(&building, p(1.0, 2.0), left, &dest).unwrap_err();
        assert!(matches!(err, RoutingError::Unreachable(_)));

        building.set_door_state(door, DoorState::Open).unwrap();
        router.update(&building, 2.0);
        assert!(router.compute_waypoint(&building, p(1.0, 2.0), left, &dest).is_ok());
    }

    #[test]
    fn unregistered_destinations_go_direct() {
        let (building, left, _, _) = corridor();
        let router = build_router(
            RouterKind::DistanceMap { cell_size: 0.5, background: false },
            &building,
        )
        .unwrap();
        let dest = Destination::Stage { stage: StageId(3), fallback: p(8.5, 2.0) };
        let wp = router.compute_waypoint(&building, p(1.0, 2.0), left, &dest).unwrap();
        assert_eq!(wp.target, p(8.5, 2.0));
    }

    #[test]
    fn rejects_bad_cell_size() {
        let (building, _, _, _) = corridor();
        let kind = RouterKind::DistanceMap { cell_size: 0.0, background: false };
        assert!(matches!(build_router(kind, &building), Err(RoutingError::Config(_))));
    }
}
