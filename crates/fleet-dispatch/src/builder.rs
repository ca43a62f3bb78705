//! Fluent builder for constructing a [`DispatchEngine`].

use fleet_core::{AlertId, TaskId};
use rustc_hash::FxHashMap;

use crate::{
    AlertSink, ConfigStore, DispatchConfig, DispatchEngine, DispatchResult, FailoverConfig,
    MemoryConfigStore, NoopBroadcaster, Robot, RobotRegistry, StatusBroadcaster, TaskQueue,
    TracingAlertSink,
};

/// Fluent builder for [`DispatchEngine`].
///
/// # Optional inputs (all have defaults)
///
/// | Method               | Default                                           |
/// |----------------------|---------------------------------------------------|
/// | `.config(c)`         | loaded from the config store, else `Default`      |
/// | `.failover(f)`       | `FailoverConfig::default()`                       |
/// | `.robots(v)`         | empty fleet                                       |
/// | `.alert_sink(s)`     | `TracingAlertSink`                                |
/// | `.broadcaster(b)`    | `NoopBroadcaster`                                 |
/// | `.config_store(s)`   | fresh `MemoryConfigStore`                         |
///
/// An explicit `.config(c)` wins over the store's contents and is written
/// back to it.
///
/// # Example
///
/// ```rust,ignore
/// let alerts = MemoryAlertSink::new();
/// let mut engine = DispatchEngineBuilder::new()
///     .config(DispatchConfig { algorithm: Algorithm::RoundRobin, ..Default::default() })
///     .robots(fleet)
///     .alert_sink(alerts.clone())
///     .build()?;
/// engine.run_cycle(clock.now());
/// ```
pub struct DispatchEngineBuilder {
    config:       Option<DispatchConfig>,
    failover:     FailoverConfig,
    robots:       Vec<Robot>,
    alerts:       Box<dyn AlertSink>,
    broadcaster:  Box<dyn StatusBroadcaster>,
    config_store: Box<dyn ConfigStore>,
}

impl Default for DispatchEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchEngineBuilder {
    pub fn new() -> Self {
        Self {
            config:       None,
            failover:     FailoverConfig::default(),
            robots:       Vec::new(),
            alerts:       Box::new(TracingAlertSink),
            broadcaster:  Box::new(NoopBroadcaster),
            config_store: Box::new(MemoryConfigStore::new()),
        }
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn failover(mut self, failover: FailoverConfig) -> Self {
        self.failover = failover;
        self
    }

    pub fn robots(mut self, robots: impl IntoIterator<Item = Robot>) -> Self {
        self.robots.extend(robots);
        self
    }

    pub fn alert_sink(mut self, sink: impl AlertSink + 'static) -> Self {
        self.alerts = Box::new(sink);
        self
    }

    pub fn broadcaster(mut self, broadcaster: impl StatusBroadcaster + 'static) -> Self {
        self.broadcaster = Box::new(broadcaster);
        self
    }

    pub fn config_store(mut self, store: impl ConfigStore + 'static) -> Self {
        self.config_store = Box::new(store);
        self
    }

    /// Validate both configs, register the fleet, and return the engine.
    pub fn build(mut self) -> DispatchResult<DispatchEngine> {
        let config = match self.config {
            Some(c) => {
                c.validate()?;
                self.config_store.save(&c.to_pairs())?;
                c
            }
            None => DispatchConfig::from_pairs(&self.config_store.load()?)?,
        };
        self.failover.validate()?;

        let mut robots = RobotRegistry::new();
        for robot in self.robots {
            robots.register(robot)?;
        }

        Ok(DispatchEngine {
            config,
            failover:      self.failover,
            queue:         TaskQueue::new(),
            robots,
            alerts:        self.alerts,
            broadcaster:   self.broadcaster,
            config_store:  self.config_store,
            last_assigned: FxHashMap::default(),
            assign_seq:    0,
            next_task:     TaskId(1),
            next_alert:    AlertId(1),
            alerts_raised: 0,
        })
    }
}
