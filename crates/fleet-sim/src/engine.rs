//! `SimulationEngine`: one simulation session on a background thread.
//!
//! # Threading model
//!
//! ```text
//!   caller thread                        "simulation" thread
//!   ─────────────                        ───────────────────
//!   start_simulation ── spawn ─────────► loop {
//!                                          advance run to clock time
//!   get_progress ◄── Arc<Mutex<Shared>> ── publish progress
//!   pause / resume / stop ── ControlMsg ─► recv_timeout(wait)
//!                                        }
//! ```
//!
//! The engine owns the lifecycle state.  A control call checks and changes
//! the state under the shared lock, then sends a message that only wakes
//! the loop.  The loop reads the state under the same lock before each
//! step and moves the clock to match, so messages arriving out of order
//! cannot desynchronise the two.  A pause records its real instant and the
//! clock freezes at that reading, not when the loop notices.  Completion is
//! written by the loop, and only over `Running` or `Paused`, so a stop
//! racing with the last step leaves the session `Cancelled`.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use fleet_core::Timestamp;
use fleet_report::SimulationReport;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::{RunProgress, SimError, SimObserver, SimResult, SimulationClock, SimulationConfig, SimulationRun};

/// Longest real-time sleep between two steps of the loop.
const MAX_TICK: Duration = Duration::from_millis(20);

/// Most simulated time processed per loop iteration, so control messages
/// are seen promptly at high acceleration.
const MAX_BATCH_MINUTES: i64 = 60;

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    NotStarted,
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl SimulationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SimulationState::Completed | SimulationState::Cancelled)
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimulationState::NotStarted => "not_started",
            SimulationState::Running => "running",
            SimulationState::Paused => "paused",
            SimulationState::Completed => "completed",
            SimulationState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationProgress {
    pub simulation_id:          String,
    pub state:                  SimulationState,
    pub current_simulated_time: Timestamp,
    pub progress_percent:       f64,
    pub events_processed:       u64,
    pub total_events_scheduled: u64,
    pub guests_processed:       u64,
    pub tasks_created:          u64,
    pub tasks_completed:        u64,
    pub current_success_rate:   f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StartedSimulation {
    pub simulation_id:          String,
    pub estimated_total_events: u64,
}

// ── Session internals ─────────────────────────────────────────────────────────

#[derive(Debug)]
enum ControlMsg {
    Pause,
    Resume,
    Stop,
}

struct Shared {
    state:     SimulationState,
    progress:  RunProgress,
    report:    Option<SimulationReport>,
    /// Real instant of the pending pause, cleared on resume and stop.
    paused_at: Option<Instant>,
}

struct Session {
    id:      String,
    shared:  Arc<Mutex<Shared>>,
    control: Sender<ControlMsg>,
    handle:  Option<JoinHandle<()>>,
}

impl Session {
    fn state(&self) -> SimulationState {
        self.shared.lock().state
    }

    /// Check and change the state atomically, then notify the loop.
    fn transition(
        &self,
        allowed: &[SimulationState],
        to:      SimulationState,
        msg:     ControlMsg,
    ) -> SimResult<()> {
        {
            let mut shared = self.shared.lock();
            if !allowed.contains(&shared.state) {
                return Err(SimError::Conflict(format!(
                    "simulation {} is {}, cannot move to {to}",
                    self.id, shared.state
                )));
            }
            shared.state = to;
            shared.paused_at = (to == SimulationState::Paused).then(Instant::now);
            if to == SimulationState::Cancelled {
                shared.report = None;
            }
        }
        // The loop may already have exited.
        let _ = self.control.send(msg);
        info!(simulation = %self.id, state = %to, "simulation state changed");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.control.send(ControlMsg::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ── SimulationEngine ──────────────────────────────────────────────────────────

/// Owns at most one simulation session.  Starting a new session replaces a
/// finished one and discards its report.
#[derive(Default)]
pub struct SimulationEngine {
    started: u64,
    session: Option<Session>,
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// `NotStarted` before the first session.
    pub fn state(&self) -> SimulationState {
        self.session.as_ref().map_or(SimulationState::NotStarted, Session::state)
    }

    pub fn start_simulation(&mut self, config: SimulationConfig) -> SimResult<StartedSimulation> {
        if let Some(session) = &self.session {
            let state = session.state();
            if !state.is_terminal() {
                return Err(SimError::Conflict(format!(
                    "simulation {} is already {state}",
                    session.id
                )));
            }
        }
        let run = SimulationRun::new(config)?;
        // Join the finished session before starting the next one.
        self.session = None;

        self.started += 1;
        let id = format!("sim-{}", self.started);
        let progress = run.progress();
        let estimated_total_events = progress.total_events_scheduled;

        let shared = Arc::new(Mutex::new(Shared {
            state: SimulationState::Running,
            progress,
            report: None,
            paused_at: None,
        }));
        let (control, rx) = crossbeam_channel::unbounded();

        let handle = {
            let shared = Arc::clone(&shared);
            let id = id.clone();
            thread::Builder::new()
                .name("simulation".into())
                .spawn(move || session_loop(id, run, rx, shared))?
        };

        info!(simulation = %id, estimated_total_events, "simulation started");
        self.session = Some(Session { id: id.clone(), shared, control, handle: Some(handle) });
        Ok(StartedSimulation { simulation_id: id, estimated_total_events })
    }

    pub fn get_progress(&self) -> SimResult<SimulationProgress> {
        let session = self.session()?;
        let shared = session.shared.lock();
        let p = &shared.progress;
        Ok(SimulationProgress {
            simulation_id:          session.id.clone(),
            state:                  shared.state,
            current_simulated_time: p.current_time,
            progress_percent:       p.progress_percent,
            events_processed:       p.events_processed,
            total_events_scheduled: p.total_events_scheduled,
            guests_processed:       p.guests_processed,
            tasks_created:          p.tasks_created,
            tasks_completed:        p.tasks_completed,
            current_success_rate:   p.success_rate,
        })
    }

    pub fn pause_simulation(&self) -> SimResult<()> {
        self.controlled()?
            .transition(&[SimulationState::Running], SimulationState::Paused, ControlMsg::Pause)
    }

    pub fn resume_simulation(&self) -> SimResult<()> {
        self.controlled()?
            .transition(&[SimulationState::Paused], SimulationState::Running, ControlMsg::Resume)
    }

    /// Terminal.  Events not yet reached are discarded with the session's
    /// report.
    pub fn stop_simulation(&self) -> SimResult<()> {
        self.controlled()?.transition(
            &[SimulationState::Running, SimulationState::Paused],
            SimulationState::Cancelled,
            ControlMsg::Stop,
        )
    }

    /// The frozen report, only once the session has completed.
    pub fn get_report(&self) -> Option<SimulationReport> {
        let shared = self.session.as_ref()?.shared.lock();
        match shared.state {
            SimulationState::Completed => shared.report.clone(),
            _ => None,
        }
    }

    /// Block until the session thread exits and return the final state.
    pub fn wait(&mut self) -> SimResult<SimulationState> {
        let Some(session) = self.session.as_mut() else {
            return Err(SimError::NotFound("no simulation has been started".into()));
        };
        if let Some(handle) = session.handle.take() {
            handle
                .join()
                .map_err(|_| SimError::Io(std::io::Error::other("simulation thread panicked")))?;
        }
        Ok(session.state())
    }

    fn session(&self) -> SimResult<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| SimError::NotFound("no simulation has been started".into()))
    }

    /// A control command with no session is a state conflict: the engine
    /// is `NotStarted`.
    fn controlled(&self) -> SimResult<&Session> {
        self.session.as_ref().ok_or_else(|| {
            SimError::Conflict(format!("simulation is {}", SimulationState::NotStarted))
        })
    }
}

// ── Session loop ──────────────────────────────────────────────────────────────

/// Logs one line per simulated day.
struct DayLogger<'a> {
    simulation: &'a str,
}

impl SimObserver for DayLogger<'_> {
    fn on_day_end(&mut self, day: u32, progress: &RunProgress) {
        info!(
            simulation = %self.simulation,
            day,
            guests = progress.guests_processed,
            tasks_completed = progress.tasks_completed,
            tasks_failed = progress.tasks_failed,
            success_rate = progress.success_rate,
            "simulated day finished"
        );
    }

    fn on_finish(&mut self, report: &SimulationReport) {
        let s = &report.summary;
        info!(
            simulation = %self.simulation,
            events = s.events_processed,
            guests = s.total_guests,
            tasks_completed = s.tasks_completed,
            tasks_failed = s.tasks_failed,
            success_rate = s.success_rate,
            "simulation completed"
        );
    }
}

fn session_loop(id: String, mut run: SimulationRun, rx: Receiver<ControlMsg>, shared: Arc<Mutex<Shared>>) {
    let mut clock = SimulationClock::new(run.now(), run.config().acceleration_factor, Instant::now())
        .with_limit(run.end());
    let mut observer = DayLogger { simulation: &id };
    let max_batch = chrono::Duration::minutes(MAX_BATCH_MINUTES);

    loop {
        let clock_now = {
            let shared = shared.lock();
            match sync_clock(&mut clock, shared.state, shared.paused_at, Instant::now()) {
                Some(now) => now,
                None => {
                    debug!(simulation = %id, "simulation loop stopped");
                    return;
                }
            }
        };
        let target = clock_now.min(run.now() + max_batch);
        run.advance_to(target, &mut observer);
        shared.lock().progress = run.progress();

        if run.is_finished() {
            let report = run.complete(&mut observer);
            let mut shared = shared.lock();
            if matches!(shared.state, SimulationState::Running | SimulationState::Paused) {
                shared.state = SimulationState::Completed;
                shared.report = Some(report);
            }
            return;
        }

        // Paused and caught up: sleep until a control message arrives.
        // Behind the clock: keep going.  Otherwise sleep until the next step.
        let msg = if clock.is_paused() && run.now() >= clock_now {
            debug!(simulation = %id, at = %clock_now, "simulation paused");
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            let wait = if run.now() < clock_now {
                Duration::ZERO
            } else {
                clock.real_wait_for(run.next_step_time() - run.now()).min(MAX_TICK)
            };
            rx.recv_timeout(wait)
        };

        // Messages only wake the loop; the shared state decides what the
        // clock does.  `Stop` without a state change comes from `Drop`.
        if matches!(msg, Ok(ControlMsg::Stop) | Err(RecvTimeoutError::Disconnected)) {
            clock.stop(Instant::now());
            debug!(simulation = %id, "simulation loop stopped");
            return;
        }
    }
}

/// Bring the clock in line with the session state and read it at `real`.
///
/// A pause freezes the clock at the instant the pause was requested, not
/// the instant the loop noticed it.  Returns `None` once the session is
/// cancelled.
pub(crate) fn sync_clock(
    clock:     &mut SimulationClock,
    state:     SimulationState,
    paused_at: Option<Instant>,
    real:      Instant,
) -> Option<Timestamp> {
    match state {
        SimulationState::Cancelled => {
            clock.stop(real);
            return None;
        }
        SimulationState::Paused if clock.is_running() => {
            let _ = clock.pause(paused_at.map_or(real, |at| at.min(real)));
        }
        SimulationState::Running if clock.is_paused() => {
            let _ = clock.resume(real);
        }
        _ => {}
    }
    Some(clock.now_at(real))
}
