//! `SimOutputObserver<W>` bridges `SimObserver` to an `OutputWriter`.

use ps_core::Iteration;
use ps_geometry::Building;
use ps_sim::{IterationReport, SimObserver, SimStats};
use tracing::{debug, warn};

use crate::row::{DoorFlowRow, IterationSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that writes iteration summaries and, when the run ends,
/// every door's flow curve to an [`OutputWriter`].
///
/// Errors from the writer are stored internally because `SimObserver` methods
/// have no return value.  After `sim.run()` returns, check for errors with
/// [`take_error`][Self::take_error].
pub struct SimOutputObserver<W: OutputWriter> {
    writer:           W,
    summary_interval: u64,
    last_error:       Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    /// Summarise every iteration.
    pub fn new(writer: W) -> Self {
        Self { writer, summary_interval: 1, last_error: None }
    }

    /// Summarise only iterations that are multiples of `n`, starting with
    /// iteration 0 (`0` = never).
    pub fn summary_interval(mut self, n: u64) -> Self {
        self.summary_interval = n;
        self
    }

    /// Take the stored write error (if any) after `sim.run()` returns.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            warn!(error = %e, "output write failed");
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }

    fn summarised(&self, iteration: Iteration) -> bool {
        iteration.is_multiple_of(self.summary_interval)
    }
}

/// Flow-curve rows of every door, ordered by door then time.
pub fn door_flow_rows(building: &Building) -> Vec<DoorFlowRow> {
    building
        .doors()
        .flat_map(|(id, flow)| {
            let caption = building.line(id).map_or("", |l| l.caption());
            flow.flow_curve().iter().map(move |s| DoorFlowRow::new(id, caption, s))
        })
        .collect()
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_iteration_end(&mut self, report: &IterationReport<'_>) {
        if !self.summarised(report.iteration) {
            return;
        }
        let row = IterationSummaryRow::new(report.iteration, report.time, report.agent_count, report.stats);
        let result = self.writer.write_iteration_summary(&row);
        self.store_err(result);
    }

    fn on_sim_end(&mut self, final_iteration: Iteration, _stats: &SimStats, building: &Building) {
        let rows = door_flow_rows(building);
        debug!(%final_iteration, rows = rows.len(), "writing door flow curves");
        let result = self.writer.write_door_flow(&rows);
        self.store_err(result);
        let result = self.writer.finish();
        self.store_err(result);
    }
}
