//! `ps-core`: foundational types for the `pedsim` pedestrian simulator.
//!
//! This crate is a dependency of every other `ps-*` crate.  It has no `ps-*`
//! dependencies and minimal external ones (only `rand` and `thiserror`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `RoomId`, `SubRoomId`, `NavLineId`, `StageId`, … |
//! | [`geo`]         | `Point`, `LineSegment`                                     |
//! | [`time`]        | `Iteration`, `SimClock`                                    |
//! | [`config`]      | `SimConfig`, `LostAgentPolicy`                             |
//! | [`rng`]         | `AgentRng` (per-agent), `SimRng` (global)                  |
//! | [`error`]       | `PsError`, `PsResult`                                      |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{LostAgentPolicy, SimConfig};
pub use error::{PsError, PsResult};
pub use geo::{LineSegment, Point, EPS};
pub use ids::{AgentId, GoalId, JourneyId, NavLineId, RoomId, SourceId, StageId, SubRoomId};
pub use rng::{AgentRng, SimRng};
pub use time::{Iteration, SimClock};
