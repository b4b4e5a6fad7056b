//! Configuration for the auto-recovery engine, matching the `recovery`
//! section of the platform's top-level config (§6).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// How often the detection loop runs the probe set.
    pub monitoring_interval: Duration,
    /// Maximum number of recovery actions executing at once.
    pub max_concurrent_recoveries: usize,
    /// Bounded history of persisted recovery attempts.
    pub recovery_history_size: usize,
    /// Bounded history of persisted `SystemHealth` snapshots.
    pub health_history_size: usize,
    /// Memory usage threshold (percent of total) above which
    /// `HighMemoryUsage` is raised.
    pub memory_critical_threshold_pct: f64,
    /// CPU usage threshold (percent) above which `HighCPUUsage` is raised.
    pub cpu_critical_threshold_pct: f64,
    /// Disk usage threshold (percent of volume) above which `DiskFull`
    /// is raised.
    pub disk_critical_threshold_pct: f64,
    /// Margin level (percent) below which `LowMarginLevel` is raised.
    pub margin_critical_threshold: f64,
    /// Age of the most recent market data tick, in minutes, above which
    /// `MarketDataStale` is raised.
    pub market_data_stale_threshold_min: i64,
    /// Age of the last processed trading-engine event, in minutes, above
    /// which `TradingEngineStuck` is raised. Design Note §9(a): the
    /// source left this probe undefined; "last event age" is the chosen
    /// implementation.
    pub engine_stuck_threshold_min: i64,
    /// Address probed with a TCP connect to determine internet reachability.
    pub network_probe_address: String,
    /// Per-action worker timeout budget.
    pub action_timeout: Duration,
    /// Size of the worker pool executing recovery actions concurrently.
    pub worker_pool_size: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            monitoring_interval: Duration::from_secs(10),
            max_concurrent_recoveries: 2,
            recovery_history_size: 500,
            health_history_size: 1000,
            memory_critical_threshold_pct: 90.0,
            cpu_critical_threshold_pct: 90.0,
            disk_critical_threshold_pct: 95.0,
            margin_critical_threshold: 100.0,
            market_data_stale_threshold_min: 5,
            engine_stuck_threshold_min: 2,
            network_probe_address: "1.1.1.1:443".to_string(),
            action_timeout: Duration::from_secs(30),
            worker_pool_size: 3,
        }
    }
}
