//! `ps-model`: operational models for the `pedsim` simulator.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                         |
//! |----------------|------------------------------------------------------------------|
//! | [`context`]    | `ModelContext<'a>`: immutable per-iteration snapshot            |
//! | [`model`]      | `OperationalModel` trait, `ModelUpdate`, `ModelConfig` factory   |
//! | [`gcfm`]       | Generalized centrifugal force model (ellipses, force-based)      |
//! | [`cfsm`]       | Collision-free speed model (discs, velocity-based)               |
//! | [`integrator`] | `ForceModel` trait, `Integrator` (Euler, velocity Verlet, leapfrog) |
//! | [`ellipse`]    | Velocity-dependent ellipse geometry                              |
//! | [`speed`]      | Desired speed by walking surface, with smoothing                 |
//! | [`error`]      | `ModelError`, `ConstraintViolation`, `ModelResult<T>`            |
//!
//! # Design notes
//!
//! The operational phase in `ps-sim` is two-phase:
//!
//! 1. **Compute** (parallel): `compute_update` for every agent against the
//!    same [`ModelContext`].  Nothing is written.
//! 2. **Commit** (sequential): each [`ModelUpdate`] is applied to its agent.
//!
//! Models therefore only need to be `Send + Sync`, and results do not depend
//! on the order in which agents are evaluated.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                      |
//! |---------|-------------------------------------------------------------|
//! | `serde` | Serde derives on `ModelConfig` and the parameter structs.   |

pub mod cfsm;
pub mod context;
pub mod ellipse;
pub mod error;
pub mod gcfm;
pub mod integrator;
pub mod model;
pub mod speed;


pub use cfsm::{CfsmParams, CollisionFreeSpeedModel};
pub use context::ModelContext;
pub use ellipse::Ellipse;
pub use error::{ConstraintViolation, ModelError, ModelResult};
pub use gcfm::{GcfmParams, GeneralizedCentrifugalForceModel};
pub use integrator::{Drive, ForceModel, Integrator, Kinematics};
pub use model::{ModelConfig, ModelUpdate, OperationalModel, ORIENTATION_SPEED_THRESHOLD};
