//! Uniform-grid neighbourhood search.
//!
//! # Concurrency
//!
//! [`NeighborhoodSearch::update`] takes `&mut self` and queries take `&self`,
//! so a rebuild can never overlap a query: the driver rebuilds once at the
//! start of an iteration and then shares `&NeighborhoodSearch` across the
//! parallel phases.

use ps_core::{AgentId, Point};

#[cfg(feature = "fx-hash")]
type CellMap = rustc_hash::FxHashMap<(i64, i64), Vec<GridEntry>>;
#[cfg(not(feature = "fx-hash"))]
type CellMap = std::collections::HashMap<(i64, i64), Vec<GridEntry>>;

/// An agent reference stored in a grid cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridEntry {
    pub id:  AgentId,
    pub pos: Point,
}

/// Sparse grid of square cells keyed by `(floor(x / c), floor(y / c))`.
///
/// Empty cells are not stored, so the grid needs no bounds.
#[derive(Clone, Debug)]
pub struct NeighborhoodSearch {
    cell_size: f64,
    cells:     CellMap,
    len:       usize,
}

impl NeighborhoodSearch {
    pub fn new(cell_size: f64) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        Self { cell_size, cells: CellMap::default(), len: 0 }
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn cell_of(&self, p: Point) -> (i64, i64) {
        ((p.x / self.cell_size).floor() as i64, (p.y / self.cell_size).floor() as i64)
    }

    /// Discard the previous contents and bucket `items` afresh.
    ///
    /// Calling this twice with the same input yields the same grid.
    pub fn update<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (AgentId, Point)>,
    {
        self.cells.clear();
        self.len = 0;
        for (id, pos) in items {
            let key = self.cell_of(pos);
            self.cells.entry(key).or_default().push(GridEntry { id, pos });
            self.len += 1;
        }
    }

    /// Entries stored in one cell, in insertion order.
    pub fn cell(&self, key: (i64, i64)) -> &[GridEntry] {
        self.cells.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Agents with `distance <= radius`.  A zero radius yields agents exactly
    /// at `pos`; a negative or non-finite one yields nothing.
    pub fn get_neighboring_agents(&self, pos: Point, radius: f64) -> Neighbors<'_> {
        Neighbors::new(self, pos, radius, false)
    }

    /// Agents with `distance < radius`.  A zero radius yields nothing.
    pub fn get_neighboring_agents_strict(&self, pos: Point, radius: f64) -> Neighbors<'_> {
        Neighbors::new(self, pos, radius, true)
    }
}

// ── Lazy query ────────────────────────────────────────────────────────────────

/// Iterator over the agents within a radius.
///
/// Visits the `ceil(radius / cell_size)` ring of cells around the query
/// cell, one cell at a time.  Each stored agent is yielded at most once.
/// Single pass: the iterator cannot be restarted.
pub struct Neighbors<'a> {
    grid:      &'a NeighborhoodSearch,
    center:    Point,
    radius_sq: f64,
    strict:    bool,
    min:       (i64, i64),
    max:       (i64, i64),
    next_cell: (i64, i64),
    entries:   &'a [GridEntry],
    exhausted: bool,
}

impl<'a> Neighbors<'a> {
    fn new(grid: &'a NeighborhoodSearch, center: Point, radius: f64, strict: bool) -> Self {
        let (cx, cy) = grid.cell_of(center);
        let bounded = radius.is_finite() && radius >= 0.0;
        let ring = if bounded { (radius / grid.cell_size).ceil() as i64 } else { 0 };
        let min = (cx.saturating_sub(ring), cy.saturating_sub(ring));
        Self {
            grid,
            center,
            radius_sq: radius.max(0.0) * radius.max(0.0),
            strict,
            min,
            max: (cx.saturating_add(ring), cy.saturating_add(ring)),
            next_cell: min,
            entries: &[],
            exhausted: !bounded || grid.is_empty(),
        }
    }

    #[inline]
    fn accepts(&self, e: &GridEntry) -> bool {
        let d = e.pos.distance_sq(self.center);
        if self.strict { d < self.radius_sq } else { d <= self.radius_sq }
    }
}

impl Iterator for Neighbors<'_> {
    type Item = GridEntry;

    fn next(&mut self) -> Option<GridEntry> {
        loop {
            while let Some((first, rest)) = self.entries.split_first() {
                self.entries = rest;
                if self.accepts(first) {
                    return Some(*first);
                }
            }
            if self.exhausted {
                return None;
            }
            self.entries = self.grid.cell(self.next_cell);
            self.next_cell.1 += 1;
            if self.next_cell.1 > self.max.1 {
                self.next_cell.1 = self.min.1;
                self.next_cell.0 += 1;
                if self.next_cell.0 > self.max.0 {
                    self.exhausted = true;
                }
            }
        }
    }
}
