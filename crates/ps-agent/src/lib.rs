//! `ps-agent`: agent state and storage for the `pedsim` simulator.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                       |
//! |-------------|----------------------------------------------------------------|
//! | [`params`]  | `AgentParams`, `EllipseShape`, `SpeedProfile`, `SpeedClass`    |
//! | [`agent`]   | `Agent`, `ModelState`, `AgentSnapshot`, `AgentSpec`            |
//! | [`store`]   | `AgentStore`: dense storage keyed by never-reused `AgentId`s  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                 |
//! |---------|--------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on the data types.   |

pub mod agent;
pub mod params;
pub mod store;


pub use agent::{Agent, AgentSnapshot, AgentSpec, ModelState};
pub use params::{AgentParams, EllipseShape, SpeedClass, SpeedProfile};
pub use store::AgentStore;
