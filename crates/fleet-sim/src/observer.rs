//! Observer hooks for a simulation run.

use fleet_dispatch::CycleReport;
use fleet_report::SimulationReport;

use crate::{RunProgress, SimulatedEvent};

/// Callbacks invoked by [`SimulationRun`](crate::SimulationRun) as it
/// advances.  Every method has a no-op default, so implementors override
/// only what they need.
pub trait SimObserver {
    /// After a guest event has been processed.
    fn on_event(&mut self, _event: &SimulatedEvent) {}

    /// After each dispatch cycle.
    fn on_cycle(&mut self, _cycle: &CycleReport) {}

    /// When simulated time crosses into day `day + 1`.
    fn on_day_end(&mut self, _day: u32, _progress: &RunProgress) {}

    /// Once, with the frozen report.
    fn on_finish(&mut self, _report: &SimulationReport) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
