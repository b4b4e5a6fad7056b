//! Configuration for the production coordinator, matching the
//! `monitoring` section of the platform's top-level config (§6).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How often the health-poll loop runs.
    pub monitoring_interval: Duration,
    /// How often the heartbeat/uptime loop runs.
    pub heartbeat_interval: Duration,
    /// Budget for a single component's `health_check` call; a slower
    /// response degrades that component to `Unavailable`.
    pub health_check_timeout: Duration,
    /// Budget for a single `initialize`/`start`/`stop` step.
    pub lifecycle_step_timeout: Duration,
    /// Bounded wait for `Stop(emergency = true)`.
    pub emergency_stop_timeout: Duration,
    /// Count of critical components at or above which `overall_state`
    /// becomes `Error`.
    pub critical_failure_threshold: u32,
    /// Whether `Running`/`Degraded` transitions to `EmergencyStop` when
    /// at least two components are critical.
    pub emergency_stop_on_critical_failure: bool,
    /// Interval between state/metrics snapshot persistence, independent
    /// of the per-transition flush.
    pub metrics_persistence_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            monitoring_interval: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(5),
            health_check_timeout: Duration::from_secs(30),
            lifecycle_step_timeout: Duration::from_secs(30),
            emergency_stop_timeout: Duration::from_secs(5),
            critical_failure_threshold: 2,
            emergency_stop_on_critical_failure: true,
            metrics_persistence_interval: Duration::from_secs(60),
        }
    }
}
