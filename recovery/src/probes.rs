//! Health probes run by the detection loop every `monitoring_interval`
//! (§4.2). Each probe returns a [`ProbeResult`]; `Bad` adds the kind to
//! `SystemHealth.active_failures`, `Unknown` adds nothing (Design Note
//! §9(c): absence of a dependency is explicitly not conflated with
//! health).

use crate::failure::{FailureKind, ProbeResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// A single health check the detection loop polls.
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> ProbeResult;
}

/// System resource readings supplied by the caller (the coordinator's
/// own process, or an OS-level sampler). Kept as a plain struct rather
/// than reading `/proc` directly so the probe is testable and the
/// sampling mechanism stays an implementation detail of the integrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSample {
    pub memory_used_pct: f64,
    pub cpu_used_pct: f64,
    pub disk_used_pct: f64,
}

pub trait ResourceSampler: Send + Sync {
    fn sample(&self) -> ResourceSample;
}

/// Probes memory/CPU/disk usage against configured thresholds.
pub struct ResourceProbe<S> {
    sampler: S,
    memory_threshold: f64,
    cpu_threshold: f64,
    disk_threshold: f64,
    kind: ResourceKind,
}

#[derive(Clone, Copy)]
pub enum ResourceKind {
    Memory,
    Cpu,
    Disk,
}

impl<S: ResourceSampler> ResourceProbe<S> {
    pub fn new(sampler: S, memory_threshold: f64, cpu_threshold: f64, disk_threshold: f64, kind: ResourceKind) -> Self {
        Self {
            sampler,
            memory_threshold,
            cpu_threshold,
            disk_threshold,
            kind,
        }
    }
}

#[async_trait]
impl<S: ResourceSampler> Probe for ResourceProbe<S> {
    fn name(&self) -> &str {
        match self.kind {
            ResourceKind::Memory => "resource:memory",
            ResourceKind::Cpu => "resource:cpu",
            ResourceKind::Disk => "resource:disk",
        }
    }

    async fn check(&self) -> ProbeResult {
        let sample = self.sampler.sample();
        match self.kind {
            ResourceKind::Memory if sample.memory_used_pct >= self.memory_threshold => {
                ProbeResult::Bad(FailureKind::HighMemoryUsage)
            }
            ResourceKind::Cpu if sample.cpu_used_pct >= self.cpu_threshold => {
                ProbeResult::Bad(FailureKind::HighCPUUsage)
            }
            ResourceKind::Disk if sample.disk_used_pct >= self.disk_threshold => {
                ProbeResult::Bad(FailureKind::DiskFull)
            }
            _ => ProbeResult::Healthy,
        }
    }
}

/// Probes internet reachability via a TCP connect to a known address.
pub struct NetworkProbe {
    address: String,
    connect_timeout: Duration,
}

impl NetworkProbe {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl Probe for NetworkProbe {
    fn name(&self) -> &str {
        "network"
    }

    async fn check(&self) -> ProbeResult {
        match timeout(self.connect_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => ProbeResult::Healthy,
            _ => ProbeResult::Bad(FailureKind::InternetDisconnected),
        }
    }
}

/// A supplied no-op broker operation, invoked to confirm connectivity
/// without side effects (§4.2 "invoke a supplied no-op operation").
#[async_trait]
pub trait BrokerPing: Send + Sync {
    async fn ping(&self) -> bool;
}

pub struct BrokerProbe<P> {
    ping: P,
}

impl<P: BrokerPing> BrokerProbe<P> {
    pub fn new(ping: P) -> Self {
        Self { ping }
    }
}

#[async_trait]
impl<P: BrokerPing> Probe for BrokerProbe<P> {
    fn name(&self) -> &str {
        "broker"
    }

    async fn check(&self) -> ProbeResult {
        if self.ping.ping().await {
            ProbeResult::Healthy
        } else {
            ProbeResult::Bad(FailureKind::BrokerConnectionLost)
        }
    }
}

/// Trading-health readings supplied by the integrator: margin level and
/// the age of the most recent market data tick / engine event.
#[derive(Debug, Clone, Copy)]
pub struct TradingHealthSample {
    /// Account margin level, percent. `None` when no broker session is
    /// open — absence, not a breach (Design Note §9(c)).
    pub margin_level_pct: Option<f64>,
    pub market_data_age: Option<Duration>,
    pub last_engine_event_age: Option<Duration>,
}

pub trait TradingHealthSampler: Send + Sync {
    fn sample(&self) -> TradingHealthSample;
}

pub struct MarginProbe<S> {
    sampler: S,
    critical_threshold_pct: f64,
}

impl<S: TradingHealthSampler> MarginProbe<S> {
    pub fn new(sampler: S, critical_threshold_pct: f64) -> Self {
        Self { sampler, critical_threshold_pct }
    }
}

#[async_trait]
impl<S: TradingHealthSampler> Probe for MarginProbe<S> {
    fn name(&self) -> &str {
        "trading:margin"
    }

    async fn check(&self) -> ProbeResult {
        match self.sampler.sample().margin_level_pct {
            None => ProbeResult::Unknown,
            Some(level) if level <= self.critical_threshold_pct => {
                ProbeResult::Bad(FailureKind::LowMarginLevel)
            }
            Some(_) => ProbeResult::Healthy,
        }
    }
}

pub struct MarketDataStaleProbe<S> {
    sampler: S,
    stale_threshold: Duration,
}

impl<S: TradingHealthSampler> MarketDataStaleProbe<S> {
    pub fn new(sampler: S, stale_threshold: Duration) -> Self {
        Self { sampler, stale_threshold }
    }
}

#[async_trait]
impl<S: TradingHealthSampler> Probe for MarketDataStaleProbe<S> {
    fn name(&self) -> &str {
        "trading:market_data_stale"
    }

    async fn check(&self) -> ProbeResult {
        match self.sampler.sample().market_data_age {
            None => ProbeResult::Unknown,
            Some(age) if age >= self.stale_threshold => ProbeResult::Bad(FailureKind::MarketDataStale),
            Some(_) => ProbeResult::Healthy,
        }
    }
}

/// "Trading engine stuck" probe (Design Note §9(a) open question,
/// resolved here): the engine is stuck iff the age of the last
/// processed engine event exceeds `engine_stuck_threshold`.
pub struct EngineStuckProbe<S> {
    sampler: S,
    stuck_threshold: Duration,
}

impl<S: TradingHealthSampler> EngineStuckProbe<S> {
    pub fn new(sampler: S, stuck_threshold: Duration) -> Self {
        Self { sampler, stuck_threshold }
    }
}

#[async_trait]
impl<S: TradingHealthSampler> Probe for EngineStuckProbe<S> {
    fn name(&self) -> &str {
        "trading:engine_stuck"
    }

    async fn check(&self) -> ProbeResult {
        match self.sampler.sample().last_engine_event_age {
            None => ProbeResult::Unknown,
            Some(age) if age >= self.stuck_threshold => ProbeResult::Bad(FailureKind::TradingEngineStuck),
            Some(_) => ProbeResult::Healthy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSampler(ResourceSample);
    impl ResourceSampler for FixedSampler {
        fn sample(&self) -> ResourceSample {
            self.0
        }
    }

    struct FixedTradingSampler(TradingHealthSample);
    impl TradingHealthSampler for FixedTradingSampler {
        fn sample(&self) -> TradingHealthSample {
            self.0
        }
    }

    #[tokio::test]
    async fn memory_probe_flags_over_threshold() {
        let probe = ResourceProbe::new(
            FixedSampler(ResourceSample { memory_used_pct: 95.0, ..Default::default() }),
            90.0,
            90.0,
            90.0,
            ResourceKind::Memory,
        );
        assert_eq!(probe.check().await, ProbeResult::Bad(FailureKind::HighMemoryUsage));
    }

    #[tokio::test]
    async fn margin_probe_is_unknown_when_no_session_open() {
        let probe = MarginProbe::new(
            FixedTradingSampler(TradingHealthSample {
                margin_level_pct: None,
                market_data_age: None,
                last_engine_event_age: None,
            }),
            100.0,
        );
        assert_eq!(probe.check().await, ProbeResult::Unknown);
    }

    #[tokio::test]
    async fn market_data_stale_probe_flags_old_ticks() {
        let probe = MarketDataStaleProbe::new(
            FixedTradingSampler(TradingHealthSample {
                margin_level_pct: Some(500.0),
                market_data_age: Some(Duration::from_secs(600)),
                last_engine_event_age: None,
            }),
            Duration::from_secs(300),
        );
        assert_eq!(probe.check().await, ProbeResult::Bad(FailureKind::MarketDataStale));
    }
}
