//! `ps-output`: CSV export for the `pedsim` simulator.
//!
//! | File                       | Written                             | One row per               |
//! |----------------------------|-------------------------------------|---------------------------|
//! | `iteration_summaries.csv`  | every `summary_interval` iterations | iteration                 |
//! | `door_flow.csv`            | once, when the run ends             | passage through a door    |
//!
//! The backend implements [`OutputWriter`] and is driven by
//! [`SimOutputObserver`], which implements `ps_sim::SimObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ps_output::{CsvWriter, SimOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = SimOutputObserver::new(writer);
//! sim.run(&mut obs)?;
//! if let Some(e) = obs.take_error() {
//!     eprintln!("output error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::{door_flow_rows, SimOutputObserver};
pub use row::{DoorFlowRow, IterationSummaryRow};
pub use writer::OutputWriter;
