//! `ps-routing`: how agents get from where they are to where they are going.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                        |
//! |------------------|-----------------------------------------------------------------|
//! | [`router`]       | `Router` trait, `Destination`, `Waypoint`, `EdgeFactor`, `RouterKind`, `build_router`, `DirectRouter` |
//! | [`navgraph`]     | `NavGraphRouter`: Dijkstra / greedy over subrooms and doors    |
//! | [`distance_map`] | `DistanceMap`, `DistanceMapHandle`, `DistanceMapRouter`         |
//! | [`error`]        | `RoutingError`, `RoutingResult<T>`                              |
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                  |
//! |-----------|---------------------------------------------------------|
//! | `fx-hash` | FxHash for per-stage and per-door tables.               |
//! | `serde`   | Serde derives on `RouterKind`, `SearchMode`, `EdgeFactor`. |

pub mod distance_map;
pub mod error;
pub mod navgraph;
pub mod router;

#[cfg(test)]
mod tests;

pub use distance_map::{Cell, DistanceMap, DistanceMapHandle, DistanceMapRouter, MapInput, LOOKAHEAD};
pub use error::{RoutingError, RoutingResult};
pub use navgraph::{NavGraphRouter, SearchMode, DOOR_OVERSHOOT};
pub use router::{
    build_router, Destination, DirectRouter, EdgeFactor, FactorTable, Router, RouterKind,
    Waypoint, DEFAULT_MAP_CELL_SIZE,
};
