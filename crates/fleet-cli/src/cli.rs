//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "fleet", version, about = "Restaurant robot fleet dispatcher and simulator")]
pub struct Cli {
    /// YAML configuration file (defaults to ./fleet.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation and write its report
    Simulate(SimulateArgs),
    /// Load, validate and print the effective configuration
    CheckConfig,
    /// Drive the background dispatch loop over a handful of demo tasks
    DispatchDemo(DemoArgs),
}

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    /// Override the simulated horizon, in days from the configured start
    #[arg(long)]
    pub days: Option<u32>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the number of robots
    #[arg(long)]
    pub robots: Option<u32>,

    /// Pace the run with the acceleration factor instead of running flat out
    #[arg(long)]
    pub paced: bool,

    /// Directory for report files
    #[arg(short, long, default_value = "report")]
    pub output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = ReportFormat::Csv)]
    pub format: ReportFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

#[derive(clap::Args, Debug)]
pub struct DemoArgs {
    #[arg(long, default_value_t = 3)]
    pub robots: u32,

    #[arg(long, default_value_t = 6)]
    pub tasks: u32,

    /// Dispatch cycles to run
    #[arg(long, default_value_t = 8)]
    pub cycles: u32,
}
