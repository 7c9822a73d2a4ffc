//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  Geometry and journey IDs are dense
//! arena indices (`id.index()` addresses the owning `Vec`).  `AgentId` is
//! different: it is issued monotonically by the agent store and never reused,
//! so it is a key, not an index.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Stable agent identifier.  Issued monotonically starting at 1.
    pub struct AgentId(u64);
}

typed_id! {
    /// Index of a room in the building arena.
    pub struct RoomId(u32);
}

typed_id! {
    /// Index of a subroom in the building arena (global, not per room).
    pub struct SubRoomId(u32);
}

typed_id! {
    /// Index of a navigable line (door or measurement line).
    pub struct NavLineId(u32);
}

typed_id! {
    /// Index of a goal polygon.
    pub struct GoalId(u32);
}

typed_id! {
    /// Index of a journey stage.
    pub struct StageId(u32);
}

typed_id! {
    /// Index of a journey.
    pub struct JourneyId(u32);
}

typed_id! {
    /// Index of an agent source.
    pub struct SourceId(u32);
}
