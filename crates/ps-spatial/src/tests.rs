//! Unit tests for ps-spatial.

#[cfg(test)]
mod grid {
    use ps_core::{AgentId, Point};

    use crate::NeighborhoodSearch;

    fn agents() -> Vec<(AgentId, Point)> {
        vec![
            (AgentId(1), Point::new(0.5, 0.5)),
            (AgentId(2), Point::new(1.5, 0.5)),
            (AgentId(3), Point::new(3.0, 3.0)),
            (AgentId(4), Point::new(-2.0, -0.1)),
            (AgentId(5), Point::new(0.5, 0.5)),
        ]
    }

    fn ids(grid: &NeighborhoodSearch, pos: Point, r: f64) -> Vec<u64> {
        let mut v: Vec<u64> = grid.get_neighboring_agents(pos, r).map(|e| e.id.0).collect();
        v.sort();
        v
    }

    #[test]
    fn radius_query_is_exact() {
        let mut grid = NeighborhoodSearch::new(1.0);
        grid.update(agents());
        assert_eq!(ids(&grid, Point::new(0.5, 0.5), 1.0), vec![1, 2, 5]);
        assert_eq!(ids(&grid, Point::new(0.5, 0.5), 4.0), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn matches_brute_force_across_cell_sizes() {
        let pts = agents();
        for cell in [0.3, 1.0, 2.2, 10.0] {
            let mut grid = NeighborhoodSearch::new(cell);
            grid.update(pts.clone());
            for r in [0.0, 0.7, 1.0, 2.5] {
                let q = Point::new(0.4, 0.2);
                let mut expected: Vec<u64> = pts
                    .iter()
                    .filter(|(_, p)| p.distance(q) <= r)
                    .map(|(id, _)| id.0)
                    .collect();
                expected.sort();
                assert_eq!(ids(&grid, q, r), expected, "cell {cell}, r {r}");
            }
        }
    }

    #[test]
    fn zero_radius_inclusive_and_strict() {
        let mut grid = NeighborhoodSearch::new(2.0);
        grid.update(agents());
        let at = Point::new(0.5, 0.5);
        assert_eq!(ids(&grid, at, 0.0), vec![1, 5]);
        assert_eq!(grid.get_neighboring_agents_strict(at, 0.0).count(), 0);
    }

    #[test]
    fn boundary_distance_inclusive_only() {
        let mut grid = NeighborhoodSearch::new(1.0);
        grid.update(vec![(AgentId(1), Point::new(0.0, 0.0)), (AgentId(2), Point::new(1.0, 0.0))]);
        let origin = Point::new(0.0, 0.0);
        assert_eq!(grid.get_neighboring_agents(origin, 1.0).count(), 2);
        assert_eq!(grid.get_neighboring_agents_strict(origin, 1.0).count(), 1);
    }

    #[test]
    fn update_is_idempotent() {
        let mut grid = NeighborhoodSearch::new(1.0);
        grid.update(agents());
        let first: Vec<_> = grid.get_neighboring_agents(Point::ZERO, 5.0).collect();
        grid.update(agents());
        let second: Vec<_> = grid.get_neighboring_agents(Point::ZERO, 5.0).collect();
        assert_eq!(first, second);
        assert_eq!(grid.len(), 5);
    }

    #[test]
    fn rebuild_forgets_old_positions() {
        let mut grid = NeighborhoodSearch::new(1.0);
        grid.update(agents());
        grid.update(vec![(AgentId(9), Point::new(10.0, 10.0))]);
        assert_eq!(grid.get_neighboring_agents(Point::new(0.5, 0.5), 1.0).count(), 0);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn unbounded_radius_yields_nothing() {
        let mut grid = NeighborhoodSearch::new(1.0);
        grid.update(agents());
        let at = Point::new(0.5, 0.5);
        assert_eq!(grid.get_neighboring_agents(at, f64::INFINITY).count(), 0);
        assert_eq!(grid.get_neighboring_agents(at, f64::NAN).count(), 0);
        assert_eq!(grid.get_neighboring_agents_strict(at, -1.0).count(), 0);
    }

    #[test]
    fn negative_coordinates_bucket_with_floor() {
        let grid = NeighborhoodSearch::new(1.0);
        assert_eq!(grid.cell_of(Point::new(-0.1, 0.1)), (-1, 0));
    }
}

#[cfg(test)]
mod walls {
    use ps_core::{LineSegment, Point};

    use crate::WallIndex;

    fn box_walls() -> Vec<LineSegment> {
        let p = Point::new;
        vec![
            LineSegment::new(p(0.0, 0.0), p(10.0, 0.0)),
            LineSegment::new(p(10.0, 0.0), p(10.0, 10.0)),
            LineSegment::new(p(10.0, 10.0), p(0.0, 10.0)),
            LineSegment::new(p(0.0, 10.0), p(0.0, 0.0)),
            LineSegment::new(p(5.0, 2.0), p(5.0, 8.0)),
        ]
    }

    #[test]
    fn walls_within_distance() {
        let idx = WallIndex::new(box_walls());
        assert_eq!(idx.len(), 5);
        assert_eq!(idx.walls_within(Point::new(1.0, 5.0), 1.5).count(), 1);
        assert_eq!(idx.walls_within(Point::new(0.5, 0.5), 1.0).count(), 2);
        assert_eq!(idx.walls_within(Point::new(2.5, 5.0), 1.0).count(), 0);
    }

    #[test]
    fn nearest_wall() {
        let idx = WallIndex::new(box_walls());
        let (w, d) = idx.nearest_wall(Point::new(4.5, 5.0)).unwrap();
        assert_eq!(w.p1, Point::new(5.0, 2.0));
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn line_of_sight() {
        let idx = WallIndex::new(box_walls());
        let p = Point::new;
        assert!(idx.blocks(&LineSegment::new(p(4.0, 5.0), p(6.0, 5.0))));
        assert!(!idx.blocks(&LineSegment::new(p(4.0, 9.0), p(6.0, 9.0))));
        assert!(!WallIndex::empty().blocks(&LineSegment::new(p(0.0, 0.0), p(1.0, 1.0))));
    }
}
