//! `SimulationRun`: the deterministic core of a simulation.
//!
//! A run owns a private [`DispatchEngine`] and drives it from simulated
//! time only.  Nothing here reads a wall clock: [`SimulationRun::advance_to`]
//! processes every step due up to a target instant, and the session thread
//! in [`crate::engine`] decides how fast that target moves.
//!
//! # Step order
//!
//! At one simulated instant the run applies, in order:
//!
//! 1. robot actions due (task finished, charging finished),
//! 2. guest events due, in insertion order,
//! 3. the dispatch cycle, if one is due.
//!
//! Every step goes through the engine's public API, so assignment, failover
//! and escalation follow the production code path.

use std::collections::BTreeSet;

use chrono::Duration;
use fleet_core::time::{day_index, secs_f64};
use fleet_core::{Position, RobotId, SimRng, TableId, TaskId, Timestamp};
use fleet_dispatch::{
    Alert, Assignment, CycleReport, DispatchEngine, DispatchEngineBuilder, MemoryAlertSink, Robot,
    TaskPriority, TaskRequest, TaskStatus, TaskType, MAX_DURATION_SECS,
};
use fleet_report::{ReportBuilder, SimulationReport};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ScheduleHorizon;
use crate::event::RobotAction;
use crate::{
    EventKind, EventScheduler, FloorPlan, GuestArrivalGenerator, SimError, SimObserver, SimResult,
    SimulatedEvent, SimulationConfig,
};

/// RNG stream for robot behaviour, far above any hour index.
const BEHAVIOUR_STREAM: u64 = 1 << 40;
/// Service times vary ±50 % around the configured mean.
const SERVICE_JITTER: f64 = 0.5;
/// Terminal tasks older than this are dropped from the engine's queue.
const PRUNE_EVERY_HOURS: i64 = 1;

/// Running figures of a run, cheap to copy out of the session thread.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunProgress {
    pub current_time:           Timestamp,
    pub progress_percent:       f64,
    pub events_processed:       u64,
    pub total_events_scheduled: u64,
    pub guests_processed:       u64,
    pub tasks_created:          u64,
    pub tasks_completed:        u64,
    pub tasks_failed:           u64,
    pub success_rate:           f64,
}

pub struct SimulationRun {
    config:    SimulationConfig,
    engine:    DispatchEngine,
    alerts:    MemoryAlertSink,
    events:    EventScheduler<SimulatedEvent>,
    actions:   EventScheduler<RobotAction>,
    generator: GuestArrivalGenerator,
    report:    ReportBuilder,
    floor:     FloorPlan,
    rng:       SimRng,

    /// In-progress tasks with a finish action scheduled.
    moving:  BTreeSet<TaskId>,
    /// In-progress tasks whose robot stalled; left for failover.
    stalled: BTreeSet<TaskId>,

    now:          Timestamp,
    next_cycle:   Timestamp,
    next_prune:   Timestamp,
    total_events: u64,
    current_day:  u32,
}

impl SimulationRun {
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;

        let start = config.simulated_start_time;
        let floor = FloorPlan::grid(config.table_count);
        let robots: Vec<Robot> = (1..=config.robot_count)
            .map(|i| Robot::new(RobotId(i), format!("sim-robot-{i}"), floor.robot_home(i - 1), start))
            .collect();

        let mut report = ReportBuilder::new(start, config.simulated_end_time);
        for robot in &robots {
            report.register_robot(robot.id);
        }

        let alerts = MemoryAlertSink::new();
        let engine = DispatchEngineBuilder::new()
            .config(config.dispatch.clone())
            .failover(config.failover.clone())
            .robots(robots)
            .alert_sink(alerts.clone())
            .build()?;

        let generator = GuestArrivalGenerator::new(&config);
        let total_events = generator.estimate_total_events();

        let mut run = Self {
            rng: SimRng::stream(config.random_seed, BEHAVIOUR_STREAM),
            engine,
            alerts,
            events: EventScheduler::new(),
            actions: EventScheduler::new(),
            generator,
            report,
            floor,
            moving: BTreeSet::new(),
            stalled: BTreeSet::new(),
            now: start,
            next_cycle: start,
            next_prune: start + Duration::hours(PRUNE_EVERY_HOURS),
            total_events,
            current_day: 0,
            config,
        };
        if run.config.schedule_horizon == ScheduleHorizon::Eager {
            let end = run.config.simulated_end_time;
            run.fill_until(end);
        }
        Ok(run)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn end(&self) -> Timestamp {
        self.config.simulated_end_time
    }

    pub fn is_finished(&self) -> bool {
        self.now >= self.end()
    }

    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.alerts()
    }

    /// Events waiting in the scheduler.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn progress(&self) -> RunProgress {
        let span = (self.end() - self.config.simulated_start_time).num_milliseconds() as f64;
        let done = (self.now - self.config.simulated_start_time).num_milliseconds() as f64;
        RunProgress {
            current_time:           self.now,
            progress_percent:       (done * 100.0 / span).clamp(0.0, 100.0),
            events_processed:       self.report.events_processed(),
            total_events_scheduled: self.total_events,
            guests_processed:       self.report.guests(),
            tasks_created:          self.report.tasks_created(),
            tasks_completed:        self.report.tasks_completed(),
            tasks_failed:           self.report.tasks_failed(),
            success_rate:           self.report.success_rate(),
        }
    }

    /// Add an event by hand.  It counts towards the scheduled total.
    pub fn schedule_event(&mut self, event: SimulatedEvent) {
        self.events.schedule(event.scheduled_at, event);
        self.total_events += 1;
    }

    /// Time of the next step, guest event, robot action or dispatch cycle.
    pub fn next_step_time(&self) -> Timestamp {
        [self.actions.next_time(), self.events.next_time()]
            .into_iter()
            .flatten()
            .fold(self.next_cycle, std::cmp::min)
    }

    // ── Driving ───────────────────────────────────────────────────────────

    /// Process every step due at or before `target` (capped at the end of
    /// the run) and move the run's clock there.  Returns the number of guest
    /// events processed.
    pub fn advance_to(&mut self, target: Timestamp, observer: &mut dyn SimObserver) -> u64 {
        let target = target.min(self.end());
        let before = self.report.events_processed();

        loop {
            let t = self.next_step_time();
            // Everything due at `t` must be scheduled before `t` is processed.
            if !self.generator.is_exhausted() && self.generator.generated_until() <= t {
                self.fill_until(t + Duration::days(1));
                continue;
            }
            if t > target || t >= self.end() {
                break;
            }
            self.step(t, observer);
        }

        if target > self.now {
            self.enter(target, observer);
        }
        self.report.events_processed() - before
    }

    /// Run to the end without pacing and freeze the report.
    pub fn run_to_end(&mut self, observer: &mut dyn SimObserver) -> SimulationReport {
        let end = self.end();
        self.advance_to(end, observer);
        self.complete(observer)
    }

    /// Close the last day and freeze the report.
    pub fn complete(&mut self, observer: &mut dyn SimObserver) -> SimulationReport {
        let progress = self.progress();
        observer.on_day_end(self.current_day, &progress);
        let report = self.report.finish();
        observer.on_finish(&report);
        report
    }

    /// The report as it stands; callable at any point.
    pub fn finish(&self) -> SimulationReport {
        self.report.finish()
    }

    fn fill_until(&mut self, until: Timestamp) {
        let events = &mut self.events;
        let added = self
            .generator
            .fill_until(until, |e| events.schedule(e.scheduled_at, e));
        debug!(added, until = %until, "scheduled guest events");
    }

    /// Move to `t`, announcing each simulated day left behind.
    fn enter(&mut self, t: Timestamp, observer: &mut dyn SimObserver) {
        self.now = t;
        // The end instant belongs to the last day, closed by `complete`.
        let last = self.end() - Duration::milliseconds(1);
        let day = day_index(self.config.simulated_start_time, t.min(last));
        while self.current_day < day {
            let progress = self.progress();
            observer.on_day_end(self.current_day, &progress);
            self.current_day += 1;
        }
    }

    fn step(&mut self, t: Timestamp, observer: &mut dyn SimObserver) {
        self.enter(t, observer);

        for (at, action) in self.actions.pop_due(t) {
            self.apply_action(action, at);
        }

        for (at, event) in self.events.pop_due(t) {
            match self.process_event(&event, at) {
                Ok(()) => self.report.record_event(),
                Err(e) => {
                    warn!(event = %event.id, kind = event.kind.name(), error = %e, "event processing failed");
                    self.report.record_event_error();
                }
            }
            observer.on_event(&event);
        }

        if self.next_cycle <= t {
            let cycle = self.dispatch_cycle(t);
            observer.on_cycle(&cycle);
            self.next_cycle = t + self.config.cycle_interval();
        }
    }

    // ── Guest events ──────────────────────────────────────────────────────

    fn process_event(&mut self, event: &SimulatedEvent, at: Timestamp) -> SimResult<()> {
        let table = event.kind.table();
        let position = self.floor.position(table).map_err(|e| SimError::EventProcessing {
            event:  event.id,
            reason: e.to_string(),
        })?;

        match event.kind {
            EventKind::GuestArrived { party_size, .. } => {
                self.report.guest_arrived(at, party_size);
                self.create_task(TaskType::Escort, TaskPriority::Normal, table, position, at);
            }
            EventKind::FoodReady { .. } => {
                self.create_task(TaskType::Deliver, TaskPriority::Normal, table, position, at);
            }
            EventKind::GuestNeedsHelp { .. } => {
                self.create_task(TaskType::Service, TaskPriority::High, table, position, at);
            }
            EventKind::GuestLeft { party_size, .. } => {
                self.report.guest_left(party_size);
                self.create_task(TaskType::Cleaning, TaskPriority::Low, table, position, at);
            }
        }
        Ok(())
    }

    fn create_task(
        &mut self,
        kind:     TaskType,
        priority: TaskPriority,
        table:    TableId,
        position: Position,
        at:       Timestamp,
    ) {
        let request = TaskRequest::new(kind).priority(priority).table(table, position);
        self.engine.create_task(request, at);
        self.report.task_created(at);
    }

    // ── Dispatch cycle ────────────────────────────────────────────────────

    fn dispatch_cycle(&mut self, t: Timestamp) -> CycleReport {
        // Simulated robots are always connected, and moving ones are making
        // progress.  Stalled robots fall silent on their task only.
        let robots: Vec<RobotId> = self.engine.robots().iter().map(|r| r.id).collect();
        for robot in robots {
            if let Err(e) = self.engine.record_heartbeat(robot, t) {
                warn!(robot = %robot, error = %e, "heartbeat rejected");
            }
        }
        for &task in &self.moving {
            if let Err(e) = self.engine.report_progress(task, t) {
                debug!(task = %task, error = %e, "progress report rejected");
            }
        }

        let cycle = self.engine.run_cycle(t);

        for release in cycle.releases() {
            self.moving.remove(&release.task);
            self.stalled.remove(&release.task);
            if release.failed() {
                self.report.task_failed(t, Some(release.robot));
            } else {
                self.report.task_requeued();
            }
        }
        if let Some(summary) = &cycle.assignment {
            for assignment in &summary.assignments {
                self.begin_task(assignment, t);
            }
        }

        self.report.sample_robots(t, self.engine.robots().iter());

        if t >= self.next_prune {
            let every = Duration::hours(PRUNE_EVERY_HOURS);
            self.engine.prune_finished(t - every);
            self.next_prune = t + every;
        }
        cycle
    }

    /// Start an assigned task and decide how the robot will fare.
    fn begin_task(&mut self, assignment: &Assignment, t: Timestamp) {
        let Assignment { task, robot, .. } = *assignment;
        if let Err(e) = self.engine.start_task(task, t) {
            warn!(task = %task, robot = %robot, error = %e, "could not start task");
            return;
        }

        let from = self.engine.get_robot(robot).map(|r| r.position).unwrap_or_default();
        let to = self.engine.get_task(task).and_then(|t| t.target).unwrap_or(from);
        let travel = from.distance_to(to) as f64 / self.config.robots.robot_speed_mps;
        let service = self.rng.jitter(self.config.robots.service_time_secs, SERVICE_JITTER);
        let stalls = self.rng.gen_bool(self.config.robots.blockage_probability);

        if stalls {
            debug!(task = %task, robot = %robot, "robot stalled");
            self.stalled.insert(task);
            return;
        }
        self.moving.insert(task);
        // A slow robot on a large floor is capped like every other delay.
        let done_at = t + secs_f64((travel + service).clamp(1.0, MAX_DURATION_SECS as f64));
        self.actions.schedule(done_at, RobotAction::FinishTask { task, robot });
    }

    // ── Robot actions ─────────────────────────────────────────────────────

    fn apply_action(&mut self, action: RobotAction, at: Timestamp) {
        match action {
            RobotAction::FinishTask { task, robot } => self.finish_task(task, robot, at),
            RobotAction::FinishCharging { robot } => {
                if let Err(e) = self.engine.finish_charging(robot, 100.0) {
                    warn!(robot = %robot, error = %e, "could not finish charging");
                }
            }
        }
    }

    fn finish_task(&mut self, task: TaskId, robot: RobotId, at: Timestamp) {
        // Released by failover since the action was scheduled.
        if !self.moving.remove(&task) {
            return;
        }
        let target = match self.engine.get_task(task) {
            Some(t) if t.status == TaskStatus::InProgress && t.robot_id == Some(robot) => t.target,
            _ => return,
        };
        if let Some(position) = target {
            if let Err(e) = self.engine.update_position(robot, position, at) {
                warn!(robot = %robot, error = %e, "position update rejected");
            }
        }

        let (kind, duration) = match self.engine.complete_task(task, at) {
            Ok(done) => (done.task_type, done.service_duration().unwrap_or_else(Duration::zero)),
            Err(e) => {
                warn!(task = %task, robot = %robot, error = %e, "could not complete task");
                return;
            }
        };
        self.report.task_completed(at, robot, kind, duration);
        self.drain_battery(robot, at);
    }

    fn drain_battery(&mut self, robot: RobotId, at: Timestamp) {
        let behaviour = &self.config.robots;
        let Some(level) = self.engine.get_robot(robot).map(|r| r.battery_level as f64) else {
            return;
        };
        let level = (level - behaviour.battery_drain_per_task).max(0.0);
        let charge_below = behaviour.charge_threshold;
        let charge_for = secs_f64(behaviour.charge_duration_minutes * 60.0);

        if let Err(e) = self.engine.update_battery(robot, level as f32) {
            warn!(robot = %robot, error = %e, "battery update rejected");
            return;
        }
        if level < charge_below && self.engine.begin_charging(robot).is_ok() {
            debug!(robot = %robot, battery = level, "robot charging");
            self.actions.schedule(at + charge_for, RobotAction::FinishCharging { robot });
        }
    }
}
