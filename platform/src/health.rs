//! Facade-level collaborators for `confluence-recovery`'s probe traits:
//! a real OS resource sampler, a broker no-op ping, and a small cache
//! that turns the broker's account/tick state into the synchronous
//! `TradingHealthSample` the trading-health probes read.
//!
//! None of this lives in `confluence-recovery` itself — that crate only
//! defines the `ResourceSampler`/`BrokerPing`/`TradingHealthSampler`
//! seams (Design Note §9(c)) and leaves "how do we actually read CPU
//! usage" to whoever assembles the process.

use async_trait::async_trait;
use confluence_broker::BrokerAdapter;
use confluence_recovery::{BrokerPing, ResourceSample, ResourceSampler, TradingHealthSample, TradingHealthSampler};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{DiskExt, System, SystemExt};

/// Samples CPU/memory usage via `sysinfo`. Refreshed on every call; the
/// recovery engine only polls this at `monitoring_interval` (default
/// 10s), so a fresh refresh per call is cheap enough.
pub struct SysinfoResourceSampler {
    system: Mutex<System>,
}

impl SysinfoResourceSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu();
        Self { system: Mutex::new(system) }
    }
}

impl Default for SysinfoResourceSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for SysinfoResourceSampler {
    fn sample(&self) -> ResourceSample {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.refresh_cpu();
        system.refresh_disks_list();
        system.refresh_disks();

        let memory_used_pct = if system.total_memory() > 0 {
            system.used_memory() as f64 / system.total_memory() as f64 * 100.0
        } else {
            0.0
        };
        let cpu_used_pct = system.global_cpu_info().cpu_usage() as f64;

        // Largest disk by total space stands in for the primary volume —
        // this sampler has no view of which mount point the persistence
        // store actually lives on.
        let disk_used_pct = system
            .disks()
            .iter()
            .max_by_key(|disk| disk.total_space())
            .map(|disk| {
                let total = disk.total_space();
                if total == 0 {
                    0.0
                } else {
                    let used = total.saturating_sub(disk.available_space());
                    used as f64 / total as f64 * 100.0
                }
            })
            .unwrap_or(0.0);

        ResourceSample { memory_used_pct, cpu_used_pct, disk_used_pct }
    }
}

/// Lets the three resource probes (memory/CPU/disk) share one `sysinfo`
/// handle instead of each refreshing its own.
impl ResourceSampler for Arc<SysinfoResourceSampler> {
    fn sample(&self) -> ResourceSample {
        (**self).sample()
    }
}

/// The "supplied no-op broker operation" (§4.2) — a cheap connectivity
/// check without side effects.
pub struct BrokerPingAdapter {
    broker: Arc<dyn BrokerAdapter>,
}

impl BrokerPingAdapter {
    pub fn new(broker: Arc<dyn BrokerAdapter>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl BrokerPing for BrokerPingAdapter {
    async fn ping(&self) -> bool {
        self.broker.is_connected().await
    }
}

/// Bridges the integrator's async broker polling to the synchronous
/// `TradingHealthSampler` seam the margin/market-data-stale/engine-stuck
/// probes read. A background task refreshes this cache on its own
/// interval; `sample()` is a lock-free-ish read of the last snapshot.
///
/// `last_engine_event_age` is derived from this cache's own refresh
/// clock rather than a dedicated "last pipeline tick" signal — an Open
/// Question resolution (the integrator doesn't expose one), recorded in
/// DESIGN.md.
pub struct TradingHealthCache {
    broker: Arc<dyn BrokerAdapter>,
    margin_level_pct: Mutex<Option<f64>>,
    last_refresh: Mutex<Option<Instant>>,
    last_tick_seen: Mutex<Option<Instant>>,
}

impl TradingHealthCache {
    pub fn new(broker: Arc<dyn BrokerAdapter>) -> Arc<Self> {
        Arc::new(Self {
            broker,
            margin_level_pct: Mutex::new(None),
            last_refresh: Mutex::new(None),
            last_tick_seen: Mutex::new(None),
        })
    }

    /// Spawns the cache's own refresh loop, cancellation-aware like every
    /// other periodic loop in this workspace (Design Note §9 "never
    /// unbounded sleeps").
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration, shutdown: tokio_util::sync::CancellationToken) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => this.refresh().await,
                    _ = shutdown.cancelled() => {
                        tracing::info!("trading health cache refresh loop shutting down");
                        break;
                    }
                }
            }
        });
    }

    async fn refresh(&self) {
        let now = Instant::now();
        match self.broker.account_info().await {
            Ok(account) => {
                *self.margin_level_pct.lock() = Some(account.margin_level_or(f64::MAX));
                *self.last_tick_seen.lock() = Some(now);
            }
            Err(error) => {
                tracing::debug!(%error, "trading health refresh could not read account info");
            }
        }
        *self.last_refresh.lock() = Some(now);
    }
}

impl TradingHealthSampler for TradingHealthCache {
    fn sample(&self) -> TradingHealthSample {
        let now = Instant::now();
        TradingHealthSample {
            margin_level_pct: *self.margin_level_pct.lock(),
            market_data_age: self.last_tick_seen.lock().map(|t| now.saturating_duration_since(t)),
            last_engine_event_age: self.last_refresh.lock().map(|t| now.saturating_duration_since(t)),
        }
    }
}

/// Lets the probes (which own their sampler by value) share one cache
/// instance instead of each needing their own refresh loop.
impl TradingHealthSampler for Arc<TradingHealthCache> {
    fn sample(&self) -> TradingHealthSample {
        (**self).sample()
    }
}
