//! `fleet`: command-line front end for the restaurant fleet dispatcher.
//!
//! ```text
//! fleet simulate --days 30 --format json -o out/
//! fleet check-config -c fleet.yaml
//! fleet dispatch-demo --robots 3 --tasks 6
//! ```

mod cli;
mod commands;
mod config;
mod logging;


use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use config::FleetConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log);

    let config = FleetConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Simulate(args) => commands::simulate(config, &args),
        Command::CheckConfig => commands::check_config(&config),
        Command::DispatchDemo(args) => commands::dispatch_demo(config, &args).map(|_| ()),
    }
}
