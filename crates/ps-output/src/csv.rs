//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `iteration_summaries.csv`
//! - `door_flow.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{DoorFlowRow, IterationSummaryRow, OutputResult};

pub const SUMMARY_HEADER: [&str; 8] = [
    "iteration",
    "time",
    "agents",
    "added",
    "left_building",
    "reached_goal",
    "lost",
    "door_crossings",
];

pub const DOOR_FLOW_HEADER: [&str; 4] = ["door", "caption", "time", "usage"];

/// Writes simulation output to two CSV files.
pub struct CsvWriter {
    summaries: Writer<File>,
    door_flow: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create (or truncate) the two CSV files in `dir`, creating `dir` if
    /// needed, and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut summaries = Writer::from_path(dir.join("iteration_summaries.csv"))?;
        summaries.write_record(SUMMARY_HEADER)?;

        let mut door_flow = Writer::from_path(dir.join("door_flow.csv"))?;
        door_flow.write_record(DOOR_FLOW_HEADER)?;

        Ok(Self { summaries, door_flow, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_iteration_summary(&mut self, row: &IterationSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.iteration.to_string(),
            format!("{:.3}", row.time),
            row.agents.to_string(),
            row.added.to_string(),
            row.left_building.to_string(),
            row.reached_goal.to_string(),
            row.lost.to_string(),
            row.door_crossings.to_string(),
        ])?;
        Ok(())
    }

    fn write_door_flow(&mut self, rows: &[DoorFlowRow]) -> OutputResult<()> {
        for row in rows {
            self.door_flow.write_record(&[
                row.door.to_string(),
                row.caption.clone(),
                format!("{:.3}", row.time),
                row.usage.to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.summaries.flush()?;
        self.door_flow.flush()?;
        Ok(())
    }
}
