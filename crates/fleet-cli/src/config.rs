//! Layered configuration for the `fleet` binary.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults,
//! 2. the YAML file given with `--config` (or `fleet.yaml` if present),
//! 3. `FLEET_*` environment variables, `__` separating nested keys
//!    (`FLEET_SIMULATION__ROBOT_COUNT=8`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use fleet_dispatch::{DispatchConfig, FailoverConfig};
use fleet_sim::SimulationConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "fleet.yaml";
pub const ENV_PREFIX: &str = "FLEET_";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Live dispatch policy.
    pub dispatch:   DispatchConfig,
    pub failover:   FailoverConfig,
    pub simulation: SimulationConfig,
}

impl FleetConfig {
    /// Load and validate.  An explicit `path` must exist; without one,
    /// `fleet.yaml` in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) if !p.exists() => bail!("config file {} not found", p.display()),
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };

        let mut figment = Figment::from(Serialized::defaults(FleetConfig::default()));
        if let Some(file) = &file {
            figment = figment.merge(Yaml::file(file));
        }
        let config: FleetConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("could not read configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.dispatch.validate().context("dispatch")?;
        self.failover.validate().context("failover")?;
        self.simulation.validate().context("simulation")?;
        Ok(())
    }
}
