//! Periodic production dispatch cycle on a background thread.
//!
//! The loop thread shares the engine through [`SharedDispatchEngine`] and
//! waits on a crossbeam receiver between cycles, so a control message wakes
//! it immediately while a timeout triggers the regular cycle.  Each cycle
//! takes the engine lock once and runs
//! [`DispatchEngine::run_cycle`] against a single `now` from the clock.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use fleet_core::Clock;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{CycleReport, DispatchEngine, DispatchResult};

/// The engine as shared between the dispatch loop and request handlers.
pub type SharedDispatchEngine = Arc<Mutex<DispatchEngine>>;

enum LoopMsg {
    /// Run a cycle now and send the report back.
    RunNow(Sender<CycleReport>),
    Shutdown,
}

/// Handle to the running dispatch loop.  Dropping it stops the thread.
pub struct DispatchLoop {
    tx:     Sender<LoopMsg>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchLoop {
    /// Spawn the loop thread.  The interval is re-read from the engine's
    /// config before every wait, so config updates take effect on the next
    /// cycle.
    pub fn spawn(engine: SharedDispatchEngine, clock: Arc<dyn Clock>) -> DispatchResult<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = std::thread::Builder::new()
            .name("dispatch-loop".into())
            .spawn(move || run_loop(engine, clock, rx))?;
        Ok(Self { tx, handle: Some(handle) })
    }

    /// Run one cycle immediately and wait for its report.  Returns `None` if
    /// the loop has already stopped.
    pub fn run_now(&self) -> Option<CycleReport> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.tx.send(LoopMsg::RunNow(reply_tx)).ok()?;
        reply_rx.recv().ok()
    }

    /// Stop the loop and wait for the thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.tx.send(LoopMsg::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DispatchLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(engine: SharedDispatchEngine, clock: Arc<dyn Clock>, rx: Receiver<LoopMsg>) {
    info!("dispatch loop started");
    loop {
        let interval = Duration::from_secs(engine.lock().get_config().assignment_interval_seconds);
        let reply = match rx.recv_timeout(interval) {
            Ok(LoopMsg::RunNow(reply)) => Some(reply),
            Err(RecvTimeoutError::Timeout) => None,
            Ok(LoopMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        };

        let now = clock.now();
        let report = engine.lock().run_cycle(now);
        debug!(
            escalated = report.escalated.len(),
            released = report.releases().count(),
            assigned = report.assignment.as_ref().map_or(0, |a| a.assigned),
            "dispatch cycle"
        );
        if let Some(reply) = reply {
            let _ = reply.send(report);
        }
    }
    info!("dispatch loop stopped");
}
