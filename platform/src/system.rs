//! Builds and runs the full Confluence platform: constructs the
//! persistence layer, the production coordinator, the auto-recovery
//! engine, the analytics pipeline, and the integrator; registers every
//! component with the coordinator; and drives them to completion.

use crate::config::ConfluenceConfig;
use crate::health::{BrokerPingAdapter, SysinfoResourceSampler, TradingHealthCache};
use confluence_analytics::{AnalyticsEventBus, BusConfig, ConfluenceEngine, PatternLearningSystem, SignalSynthesizer, StructureEngineConfig};
use confluence_broker::{BrokerAdapter, ExecutionAdapter};
use confluence_coordinator::ProductionCoordinator;
use confluence_core::ConfluenceError;
use confluence_integrator::ConfluenceIntegrator;
use confluence_pattern::NeutralPatternScorer;
use confluence_persistence::PersistenceStore;
use confluence_recovery::{
    action::default_actions, ActionRegistry, BrokerProbe, EngineStuckProbe, MarginProbe, MarketDataStaleProbe,
    NetworkProbe, Probe, RecoveryEngine, ResourceKind, ResourceProbe,
};
use confluence_risk::{DefaultRiskGate, RiskGate};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The assembled platform: every subsystem wired together and ready to
/// `run`.
pub struct ConfluenceSystem {
    pub coordinator: Arc<ProductionCoordinator>,
    pub recovery: Arc<RecoveryEngine>,
    pub persistence: Arc<PersistenceStore>,
    pub bus: Arc<AnalyticsEventBus>,
    pub integrator: Arc<ConfluenceIntegrator>,
    config: ConfluenceConfig,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for ConfluenceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluenceSystem").field("status", &self.coordinator.status()).finish()
    }
}

impl ConfluenceSystem {
    /// Constructs every subsystem from `config`, registers the
    /// integrator (and, implicitly, the rest of the pipeline it owns)
    /// with the coordinator, and returns the assembled system. Does not
    /// start anything — call [`ConfluenceSystem::run`] for that.
    pub fn build(
        config: ConfluenceConfig,
        broker: Arc<dyn BrokerAdapter>,
        execution: Arc<dyn ExecutionAdapter>,
    ) -> Result<Arc<Self>, ConfluenceError> {
        let persistence = Arc::new(
            PersistenceStore::new(config.persistence.clone()).map_err(|error| ConfluenceError::Fatal(error.to_string()))?,
        );

        let coordinator = ProductionCoordinator::new(config.monitoring.clone(), Some(persistence.clone()));

        let probes: Vec<Arc<dyn Probe>> = {
            let trading_health = TradingHealthCache::new(broker.clone());
            trading_health.spawn_refresh(config.monitoring.monitoring_interval, CancellationToken::new());
            let resource_sampler = Arc::new(SysinfoResourceSampler::new());
            vec![
                Arc::new(ResourceProbe::new(
                    resource_sampler.clone(),
                    config.recovery.memory_critical_threshold_pct,
                    config.recovery.cpu_critical_threshold_pct,
                    config.recovery.disk_critical_threshold_pct,
                    ResourceKind::Memory,
                )) as Arc<dyn Probe>,
                Arc::new(ResourceProbe::new(
                    resource_sampler.clone(),
                    config.recovery.memory_critical_threshold_pct,
                    config.recovery.cpu_critical_threshold_pct,
                    config.recovery.disk_critical_threshold_pct,
                    ResourceKind::Cpu,
                )) as Arc<dyn Probe>,
                Arc::new(ResourceProbe::new(
                    resource_sampler,
                    config.recovery.memory_critical_threshold_pct,
                    config.recovery.cpu_critical_threshold_pct,
                    config.recovery.disk_critical_threshold_pct,
                    ResourceKind::Disk,
                )) as Arc<dyn Probe>,
                Arc::new(NetworkProbe::new(config.recovery.network_probe_address.clone(), Duration::from_secs(5))) as Arc<dyn Probe>,
                Arc::new(BrokerProbe::new(BrokerPingAdapter::new(broker.clone()))) as Arc<dyn Probe>,
                Arc::new(MarginProbe::new(trading_health.clone(), config.recovery.margin_critical_threshold)) as Arc<dyn Probe>,
                Arc::new(MarketDataStaleProbe::new(
                    trading_health.clone(),
                    Duration::from_secs(60 * config.recovery.market_data_stale_threshold_min.max(0) as u64),
                )) as Arc<dyn Probe>,
                Arc::new(EngineStuckProbe::new(
                    trading_health,
                    Duration::from_secs(60 * config.recovery.engine_stuck_threshold_min.max(0) as u64),
                )) as Arc<dyn Probe>,
            ]
        };

        let mut registry = ActionRegistry::new();
        for action in default_actions() {
            registry.register(action);
        }

        let recovery = Arc::new(RecoveryEngine::new(config.recovery.clone(), registry, probes, Some(persistence.clone())));

        let bus = AnalyticsEventBus::new(BusConfig {
            capacity: config.analytics.event_bus_capacity,
            batch_size: config.analytics.event_batch_size,
            batch_interval: config.analytics.event_batch_interval,
            priority_bypass_threshold: config.analytics.event_priority_bypass_threshold,
            refresh_interval: config.analytics.rolling_window_refresh_interval,
            retention: config.analytics.rolling_window_retention,
        });

        let confluence_engine = ConfluenceEngine::new(config.analytics.confluence_cache_ttl, Arc::new(NeutralPatternScorer));
        let structure_engine = confluence_analytics::MarketStructureEngine::new(StructureEngineConfig {
            swing_point_k: config.analytics.swing_point_k,
            trend_lookback_swings: config.analytics.trend_lookback_swings,
            trend_dominance_multiple: config.analytics.trend_dominance_multiple,
            sr_cluster_band_pct: config.analytics.sr_cluster_band_pct,
            sr_min_touches: config.analytics.sr_min_touches,
            sr_levels_per_side: config.analytics.sr_levels_per_side,
        });
        let signal_synth = SignalSynthesizer::new(config.analytics.signal_threshold);
        let learning = Arc::new(PatternLearningSystem::new(
            config.analytics.insight_generation_interval,
            config.analytics.min_samples_for_confidence,
            Some(persistence.clone()),
        ));
        let risk_gate: Arc<dyn RiskGate + Send + Sync> = Arc::new(DefaultRiskGate::new(config.risk));

        let integrator = ConfluenceIntegrator::new(
            broker,
            execution,
            confluence_engine,
            structure_engine,
            signal_synth,
            learning,
            risk_gate,
            bus.clone(),
            Some(recovery.clone()),
            config.integrator.clone(),
        );

        coordinator
            .register("integrator", integrator.clone(), 10)
            .map_err(|error| ConfluenceError::InvariantViolation(error.to_string()))?;

        Ok(Arc::new(Self {
            coordinator,
            recovery,
            persistence,
            bus,
            integrator,
            config,
            shutdown: CancellationToken::new(),
        }))
    }

    /// Starts the coordinator (which starts every registered component),
    /// the recovery engine's detection loop, the persistence worker
    /// pool, and the analytics event bus consumer — every long-running
    /// loop described in §5, each cancellation-aware over this system's
    /// shared token.
    pub async fn run(self: &Arc<Self>) -> Result<(), ConfluenceError> {
        self.coordinator.start().await?;

        tokio::spawn({
            let recovery = self.recovery.clone();
            let shutdown = self.shutdown.clone();
            async move { recovery.run(shutdown).await }
        });

        for handle in confluence_persistence::spawn_background_workers(
            self.persistence.clone(),
            self.config.persistence.backup_interval,
            self.config.persistence.cleanup_interval,
            self.shutdown.clone(),
        ) {
            drop(handle);
        }

        tokio::spawn({
            let bus = self.bus.clone();
            let shutdown = self.shutdown.clone();
            async move { bus.run(shutdown).await }
        });

        Ok(())
    }

    /// Graceful (or, if `emergency`, bounded) shutdown: cancels every
    /// loop started by `run` and stops the coordinator (which stops
    /// every registered component in reverse-priority order, §4.1).
    pub async fn shutdown(&self, emergency: bool) -> Result<(), ConfluenceError> {
        self.shutdown.cancel();
        self.coordinator.stop(emergency).await
    }
}
