//! `DoorSchedule`: door state changes booked for a future time.
//!
//! Times are mapped to the first iteration starting at or after them, so a
//! change booked for `t` takes effect at the start of iteration
//! `ceil(t / dt)`.  Changes due at the same iteration apply in booking order.

use std::collections::BTreeMap;

use ps_core::{Iteration, NavLineId};
use ps_geometry::DoorState;

/// Slack when mapping a time onto the iteration grid, so `0.3 / 0.1` does
/// not round up to iteration 4.
const TIME_SLACK: f64 = 1e-9;

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoorEvent {
    /// Simulated time (s) the change was booked for.
    pub time:  f64,
    pub door:  NavLineId,
    pub state: DoorState,
}

#[derive(Default, Debug)]
pub struct DoorSchedule {
    inner: BTreeMap<Iteration, Vec<DoorEvent>>,
    total: usize,
}

impl DoorSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book `event` for the first iteration starting at or after its time.
    pub fn push(&mut self, event: DoorEvent, dt: f64) {
        let at = Iteration((event.time / dt - TIME_SLACK).ceil().max(0.0) as u64);
        self.inner.entry(at).or_default().push(event);
        self.total += 1;
    }

    /// Remove and return every event due at or before `now`, oldest first.
    pub fn drain_due(&mut self, now: Iteration) -> Vec<DoorEvent> {
        let later = self.inner.split_off(&(now + 1));
        let due: Vec<DoorEvent> = std::mem::replace(&mut self.inner, later).into_values().flatten().collect();
        self.total -= due.len();
        due
    }

    /// The earliest iteration with a booked event.
    pub fn next_due(&self) -> Option<Iteration> {
        self.inner.keys().next().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
