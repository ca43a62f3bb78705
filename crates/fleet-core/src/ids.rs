//! Strongly typed identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  Ordering matters: selection
//! strategies break ties on the lowest `RobotId`, and the task queue falls
//! back to `TaskId` order when two tasks share a priority and creation time.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty) => $prefix:literal;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(pub $inner);

        impl $name {
            /// The next identifier in sequence.
            #[inline]
            pub fn next(self) -> $name {
                $name(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(n: $inner) -> $name {
                $name(n)
            }
        }
    };
}

typed_id! {
    /// Identifier of a robot in the fleet.
    pub struct RobotId(u32) => "R";
}

typed_id! {
    /// Identifier of a task.  Allocated monotonically by the dispatch engine,
    /// so a larger id was always created later.
    pub struct TaskId(u64) => "T";
}

typed_id! {
    /// Identifier of a dining-room table.
    pub struct TableId(u32) => "table-";
}

typed_id! {
    /// Identifier of a simulated event.  Doubles as the insertion sequence
    /// number inside the event scheduler.
    pub struct EventId(u64) => "E";
}

typed_id! {
    /// Identifier of an alert raised by the dispatcher.
    pub struct AlertId(u64) => "A";
}
