//! `ps-journey`: where agents are going, and where new agents come from.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                          |
//! |-------------|-------------------------------------------------------------------|
//! | [`stage`]   | `StageSpec`, `Stage`, `NotifiableWaitingSet`, `NotifiableQueue`   |
//! | [`journey`] | `Transition`, `JourneyDesc`, `Journey`, `JourneyRegistry`         |
//! | [`source`]  | `SourceSpec`, `AgentSource`                                       |
//! | [`error`]   | `JourneyError`, `JourneyResult<T>`                                |
//!
//! # Stage lifecycle
//!
//! ```text
//! registry.enter(stage)              agent starts targeting the stage
//! stage.update(grid, on_stage)       waiting sets / queues register arrivals
//! stage.is_completed(agent, pos)     checked once per iteration
//! registry.advance(agent, j, stage)  leave + enter the stage chosen by the transition
//! ```
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                  |
//! |---------|---------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on the descriptions.  |

pub mod error;
pub mod journey;
pub mod source;
pub mod stage;


pub use error::{JourneyError, JourneyResult};
pub use journey::{Journey, JourneyDesc, JourneyRegistry, Transition};
pub use source::{AgentSource, SourceSpec};
pub use stage::{
    NotifiableQueue, NotifiableWaitingSet, SLOT_CAPTURE_RADIUS, Stage, StageKind, StageSpec,
    WaitingSetState,
};
