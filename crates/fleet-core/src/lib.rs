//! `fleet-core`: foundational types for the restaurant fleet dispatcher.
//!
//! This crate is a dependency of every other `fleet-*` crate.  It has no
//! `fleet-*` dependencies and few external ones (`chrono`, `rand`,
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                 |
//! |-----------------|----------------------------------------------------------|
//! | [`ids`]         | `RobotId`, `TaskId`, `TableId`, `EventId`, `AlertId`     |
//! | [`geo`]         | `Position`, Euclidean distance                           |
//! | [`time`]        | `Timestamp`, `Clock`, `SystemClock`, `ManualClock`       |
//! | [`rng`]         | `SimRng` (seeded, stream-splittable)                     |
//! | [`error`]       | `CoreError`, `CoreResult`                                |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::Position;
pub use ids::{AlertId, EventId, RobotId, TableId, TaskId};
pub use rng::SimRng;
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
