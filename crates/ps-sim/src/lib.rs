//! `ps-sim`: iteration driver for the `pedsim` simulator.
//!
//! # Iteration pipeline
//!
//! ```text
//! every iteration:
//!   ⓪ Sources    : booked door changes apply; due sources place agents
//!                   (constraint violations are pooled and retried at the
//!                   next emission).
//!   ① Grid       : rebuild the neighbourhood grid.
//!   ② Stages     : waiting sets / queues register arrivals; completed
//!                   non-exit stages advance along the journey.
//!   ③ Routing    : Router::compute_waypoint per agent (parallel).
//!   ④ Model      : OperationalModel::compute_update per agent (parallel)
//!                   against one immutable snapshot, then commit.
//!   ⑤ Relocate   : new subroom / left the building / lost.
//!   ⑥ Doors      : count passages, regulate flow, refresh the router.
//!   ⑦ Exits      : remove agents inside their exit stage.
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                      |
//! |------------|-------------------------------------------------------------|
//! | `parallel` | Runs routing and the operational model on a Rayon pool, sized by `SimConfig::num_threads`. |
//! | `fx-hash`  | FxHash in the neighbourhood grid and routing tables.         |
//! | `serde`    | Serde derives on events, stats, and all configuration types. |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ps_core::SimConfig;
//! use ps_sim::{NoopObserver, SimBuilder};
//!
//! let mut sim = SimBuilder::new(SimConfig::default(), building)
//!     .journeys(journeys)
//!     .build()?;
//! sim.add_agent(AgentSpec::new(p, journey, exit))?;
//! sim.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod error;
pub mod event;
pub mod observer;
pub mod schedule;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use error::{SimError, SimResult};
pub use event::{CrossingDirection, RemovalCause, SimEvent, SimStats};
pub use observer::{EventLog, IterationReport, NoopObserver, SimObserver};
pub use schedule::{DoorEvent, DoorSchedule};
pub use sim::Sim;
