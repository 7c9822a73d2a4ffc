//! `ps-spatial`: spatial indices for the `pedsim` simulator.
//!
//! | Module    | Contents                                                          |
//! |-----------|-------------------------------------------------------------------|
//! | [`grid`]  | `NeighborhoodSearch`: uniform grid over agent positions, rebuilt |
//! |           | every iteration, with lazy radius queries                         |
//! | [`walls`] | `WallIndex`: static R-tree over wall segments                    |
//!
//! # Cargo features
//!
//! | Feature   | Effect                                        |
//! |-----------|-----------------------------------------------|
//! | `fx-hash` | FxHash instead of SipHash for grid cell keys. |

pub mod grid;
pub mod walls;

#[cfg(test)]
mod tests;

pub use grid::{GridEntry, NeighborhoodSearch, Neighbors};
pub use walls::WallIndex;
