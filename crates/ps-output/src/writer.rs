//! The `OutputWriter` trait implemented by backend writers.

use crate::{DoorFlowRow, IterationSummaryRow, OutputResult};

/// Sink for simulation output.
///
/// Errors never reach the simulation: [`SimOutputObserver`] stores the first
/// one, retrieved with [`SimOutputObserver::take_error`].
///
/// [`SimOutputObserver`]: crate::SimOutputObserver
/// [`SimOutputObserver::take_error`]: crate::SimOutputObserver::take_error
pub trait OutputWriter {
    fn write_iteration_summary(&mut self, row: &IterationSummaryRow) -> OutputResult<()>;

    /// Write a batch of flow-curve points.
    fn write_door_flow(&mut self, rows: &[DoorFlowRow]) -> OutputResult<()>;

    /// Flush all underlying file handles.
    ///
    /// Idempotent; safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
