//! `fleet-sim`: long-run, time-accelerated restaurant simulation.
//!
//! A simulation replays synthetic guest traffic through a private
//! [`fleet_dispatch::DispatchEngine`], using the same assignment, failover
//! and escalation code as the live fleet, and aggregates the outcome with
//! [`fleet_report::ReportBuilder`].
//!
//! # Crate layout
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`config`]    | `SimulationConfig`, `EventPatterns`, `RobotBehavior`       |
//! | [`clock`]     | `SimulationClock` (real → simulated time, pause/resume)    |
//! | [`event`]     | `SimulatedEvent`, `EventKind`                              |
//! | [`scheduler`] | `EventScheduler` (time-ordered, stable ties)               |
//! | [`generator`] | `GuestArrivalGenerator` (seeded traffic)                   |
//! | [`floor`]     | `FloorPlan` (table positions)                              |
//! | [`observer`]  | `SimObserver` hooks                                        |
//! | [`run`]       | `SimulationRun`: the deterministic loop                    |
//! | [`engine`]    | `SimulationEngine`: session lifecycle on a thread          |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! // Headless, as fast as possible:
//! let report = SimulationRun::new(config)?.run_to_end(&mut NoopObserver);
//!
//! // Paced by the acceleration factor, controllable from another thread:
//! let mut engine = SimulationEngine::new();
//! let started = engine.start_simulation(config)?;
//! let progress = engine.get_progress()?;
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod floor;
pub mod generator;
pub mod observer;
pub mod run;
pub mod scheduler;


pub use clock::SimulationClock;
pub use config::{
    ArrivalSampling, EventPatterns, RobotBehavior, ScheduleHorizon, SimulationConfig, MAX_END_YEAR,
};
pub use engine::{SimulationEngine, SimulationProgress, SimulationState, StartedSimulation};
pub use error::{SimError, SimResult};
pub use event::{EventKind, SimulatedEvent};
pub use floor::FloorPlan;
pub use generator::GuestArrivalGenerator;
pub use observer::{NoopObserver, SimObserver};
pub use run::{RunProgress, SimulationRun};
pub use scheduler::EventScheduler;
