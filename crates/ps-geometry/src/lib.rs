//! `ps-geometry`: the building model of the `pedsim` simulator.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                        |
//! |--------------|-----------------------------------------------------------------|
//! | [`polygon`]  | `Polygon`, `convert_lines_to_polygon` outline construction      |
//! | [`room`]     | `Room`, `SubRoom`, `SubRoomKind`, `Goal`                        |
//! | [`navline`]  | `NavigableLine` (internal door, room door, measurement line)    |
//! | [`door`]     | `DoorState`, `DoorLimits`, `DoorFlow`: flow regulation         |
//! | [`building`] | `Building` arenas, relocation, closest-door and door commands   |
//! | [`builder`]  | `BuildingBuilder`: validates outlines at load time             |
//! | [`error`]    | `GeometryError`, `GeometryResult<T>`                            |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                          |
//! |---------|-------------------------------------------------|
//! | `serde` | Serde derives on the plain data types.          |

pub mod builder;
pub mod building;
pub mod door;
pub mod error;
pub mod navline;
pub mod polygon;
pub mod room;


pub use builder::BuildingBuilder;
pub use building::{Building, DoorStateChange};
pub use door::{DoorFlow, DoorLimits, DoorState, FlowSample};
pub use error::{GeometryError, GeometryResult};
pub use navline::{DoorSide, InternalDoor, LineGeometry, MeasurementLine, NavigableLine, RoomDoor};
pub use polygon::{convert_lines_to_polygon, Polygon, CHAIN_TOLERANCE};
pub use room::{Goal, Room, SubRoom, SubRoomKind};
