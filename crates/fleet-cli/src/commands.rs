//! Subcommand implementations.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use fleet_core::time::elapsed_dhm;
use fleet_core::{Clock, ManualClock, RobotId, SystemClock, TableId, TaskId};
use fleet_dispatch::{
    ChannelBroadcaster, DispatchEngineBuilder, DispatchLoop, Robot, SharedDispatchEngine,
    TaskPriority, TaskRequest, TaskStatus, TaskType, TracingAlertSink,
};
use fleet_report::{CsvReportWriter, JsonReportWriter, ReportWriter, SimulationReport};
use fleet_sim::{FloorPlan, RunProgress, SimObserver, SimulationConfig, SimulationEngine, SimulationRun};
use parking_lot::Mutex;
use tracing::info;

use crate::cli::{DemoArgs, ReportFormat, SimulateArgs};
use crate::config::FleetConfig;

// ── Constants ─────────────────────────────────────────────────────────────────

const PROGRESS_POLL: Duration = Duration::from_millis(500);
const STATUS_CHANNEL_CAPACITY: usize = 1_024;

// ── simulate ──────────────────────────────────────────────────────────────────

/// The configured simulation with command-line overrides applied.
pub fn simulation_config(base: SimulationConfig, args: &SimulateArgs) -> SimulationConfig {
    let mut config = base;
    if let Some(days) = args.days {
        config.simulated_end_time = config.simulated_start_time + chrono::Duration::days(days as i64);
    }
    if let Some(seed) = args.seed {
        config.random_seed = seed;
    }
    if let Some(robots) = args.robots {
        config.robot_count = robots;
    }
    config
}

pub fn simulate(config: FleetConfig, args: &SimulateArgs) -> Result<()> {
    let sim = simulation_config(config.simulation, args);
    sim.validate()?;

    let started = Instant::now();
    let report = if args.paced { run_paced(sim)? } else { run_headless(sim)? };
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "simulation finished");

    write_report(&report, &args.output, args.format)?;
    println!("{}", serde_json::to_string_pretty(&report.summary)?);
    Ok(())
}

/// Logs a line per simulated day of a headless run.
struct DayProgress;

impl SimObserver for DayProgress {
    fn on_day_end(&mut self, day: u32, progress: &RunProgress) {
        info!(
            day,
            percent = format!("{:.1}", progress.progress_percent),
            events = progress.events_processed,
            guests = progress.guests_processed,
            success_rate = format!("{:.2}", progress.success_rate),
            "day simulated"
        );
    }
}

fn run_headless(config: SimulationConfig) -> Result<SimulationReport> {
    let mut run = SimulationRun::new(config)?;
    info!(events = run.progress().total_events_scheduled, "running simulation headless");
    Ok(run.run_to_end(&mut DayProgress))
}

fn run_paced(config: SimulationConfig) -> Result<SimulationReport> {
    let start = config.simulated_start_time;
    let mut engine = SimulationEngine::new();
    let started = engine.start_simulation(config)?;
    info!(
        simulation = %started.simulation_id,
        events = started.estimated_total_events,
        "running paced simulation"
    );

    loop {
        thread::sleep(PROGRESS_POLL);
        let progress = engine.get_progress()?;
        let (days, hours, minutes) = elapsed_dhm(start, progress.current_simulated_time);
        info!(
            simulated = %progress.current_simulated_time,
            elapsed = format!("{days}d {hours:02}h {minutes:02}m"),
            percent = format!("{:.1}", progress.progress_percent),
            events = progress.events_processed,
            "progress"
        );
        if progress.state.is_terminal() {
            break;
        }
    }
    engine.wait()?;
    engine.get_report().context("simulation ended without a report")
}

pub fn write_report(report: &SimulationReport, dir: &Path, format: ReportFormat) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut writer: Box<dyn ReportWriter> = match format {
        ReportFormat::Csv => Box::new(CsvReportWriter::new(dir)?),
        ReportFormat::Json => Box::new(JsonReportWriter::new(dir)?),
        #[cfg(feature = "sqlite")]
        ReportFormat::Sqlite => Box::new(fleet_report::SqliteReportWriter::new(dir)?),
    };
    writer.write_report(report)?;
    writer.finish()?;
    info!(dir = %dir.display(), ?format, "report written");
    Ok(())
}

// ── check-config ──────────────────────────────────────────────────────────────

pub fn check_config(config: &FleetConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    info!("configuration is valid");
    Ok(())
}

// ── dispatch-demo ─────────────────────────────────────────────────────────────

const DEMO_TASKS: [(TaskType, TaskPriority); 4] = [
    (TaskType::Deliver, TaskPriority::Normal),
    (TaskType::Escort, TaskPriority::Normal),
    (TaskType::Service, TaskPriority::High),
    (TaskType::Cleaning, TaskPriority::Low),
];

/// Feed demo tasks through the live dispatch loop on a manual clock.  Each
/// cycle starts what was assigned and completes what was in progress.
pub fn dispatch_demo(config: FleetConfig, args: &DemoArgs) -> Result<Vec<TaskId>> {
    let clock = ManualClock::new(SystemClock.now());
    let floor = FloorPlan::grid(args.tasks.max(1));
    let robots = (1..=args.robots).map(|i| {
        Robot::new(RobotId(i), format!("demo-{i}"), floor.robot_home(i - 1), clock.now())
            .with_battery(100.0 - 5.0 * i as f32)
    });

    let (broadcaster, changes) = ChannelBroadcaster::bounded(STATUS_CHANNEL_CAPACITY);
    let engine = DispatchEngineBuilder::new()
        .config(config.dispatch)
        .failover(config.failover)
        .robots(robots)
        .alert_sink(TracingAlertSink)
        .broadcaster(broadcaster)
        .build()?;
    let interval = engine.get_config().assignment_interval();
    let shared: SharedDispatchEngine = Arc::new(Mutex::new(engine));

    let mut created = Vec::new();
    {
        let mut engine = shared.lock();
        for i in 0..args.tasks {
            let (kind, priority) = DEMO_TASKS[i as usize % DEMO_TASKS.len()];
            let table = TableId(i + 1);
            let request = TaskRequest::new(kind).priority(priority).table(table, floor.position(table)?);
            created.push(engine.create_task(request, clock.now()));
        }
    }

    let dispatch = DispatchLoop::spawn(Arc::clone(&shared), Arc::new(clock.clone()))?;
    for _ in 0..args.cycles {
        clock.advance(interval);
        {
            let mut engine = shared.lock();
            let now = clock.now();
            let robots: Vec<RobotId> = engine.list_robots().iter().map(|r| r.id).collect();
            for robot in robots {
                engine.record_heartbeat(robot, now)?;
            }
            let in_progress: Vec<TaskId> =
                engine.list_tasks(Some(TaskStatus::InProgress)).iter().map(|t| t.id).collect();
            for task in in_progress {
                engine.complete_task(task, now)?;
            }
            let assigned: Vec<TaskId> =
                engine.list_tasks(Some(TaskStatus::Assigned)).iter().map(|t| t.id).collect();
            for task in assigned {
                engine.start_task(task, now)?;
            }
        }
        let Some(report) = dispatch.run_now() else { break };
        println!("{}", serde_json::to_string(&report)?);
    }
    dispatch.shutdown();

    let engine = shared.lock();
    let completed: Vec<TaskId> = created
        .iter()
        .copied()
        .filter(|id| engine.get_task(*id).is_some_and(|t| t.status == TaskStatus::Completed))
        .collect();
    info!(
        created = created.len(),
        completed = completed.len(),
        status_changes = changes.try_iter().count(),
        "dispatch demo finished"
    );
    Ok(completed)
}
