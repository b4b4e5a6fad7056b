//! `ConfluenceIntegrator` (§4 L4, §9): wires a broker's market data
//! through the analytics pipeline, applies the risk gate, and routes
//! approved signals to execution. Registers with
//! `confluence-coordinator` like any other component.

use crate::config::IntegratorConfig;
use async_trait::async_trait;
use confluence_analytics::{
    AnalyticsComponent, AnalyticsEvent, AnalyticsEventBus, AnalyticsEventKind, ConfluenceEngine,
    MarketBias, MarketContext, MarketPhase, MarketStructureEngine, PatternLearningSystem,
    PrimarySignal, SignalSynthesizer, StructureAnalysis, SwingPointsSummary, TrendDirection,
};
use confluence_broker::{BrokerAdapter, CandleRequest, ExecutionAdapter, OrderRequest};
use confluence_core::{mint_id, Component, ComponentHealth, ComponentState, ConfluenceError};
use confluence_instrument::{CandleWindow, Killzone, Symbol};
use confluence_pattern::PatternKind;
use confluence_recovery::{FailureKind, RecoveryEngine};
use confluence_risk::{OpenPosition, PortfolioSnapshot, RiskGate, TradingSignal};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

/// Per-symbol equity bookkeeping the gate needs. Deliberately coarse: a
/// full ledger (separate daily/weekly/monthly realized-loss accounting)
/// is out of scope here, so all three loss-cap figures are derived from
/// the single observed drawdown since this component started (Design
/// Note: an Open Question decision, recorded in the ledger).
#[derive(Debug, Default)]
struct EquityTracker {
    peak_equity: f64,
    session_start_equity: Option<f64>,
}

impl EquityTracker {
    fn observe(&mut self, equity: f64) -> (f64, f64) {
        let start = *self.session_start_equity.get_or_insert(equity);
        self.peak_equity = self.peak_equity.max(equity);
        let drawdown = (start - equity).max(0.0);
        (self.peak_equity, drawdown)
    }
}

/// Wires a [`BrokerAdapter`] into the analytics pipeline and risk gate.
pub struct ConfluenceIntegrator {
    broker: Arc<dyn BrokerAdapter>,
    execution: Arc<dyn ExecutionAdapter>,
    confluence_engine: ConfluenceEngine,
    structure_engine: MarketStructureEngine,
    signal_synth: SignalSynthesizer,
    learning: Arc<PatternLearningSystem>,
    risk_gate: Arc<dyn RiskGate + Send + Sync>,
    bus: Arc<AnalyticsEventBus>,
    recovery: Option<Arc<RecoveryEngine>>,
    config: IntegratorConfig,
    equity: RwLock<EquityTracker>,
    trading_enabled: AtomicBool,
    signals_emitted: AtomicU64,
    signals_approved: AtomicU64,
    shutdown: CancellationToken,
    loop_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    self_weak: Weak<Self>,
}

impl std::fmt::Debug for ConfluenceIntegrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluenceIntegrator")
            .field("symbols", &self.config.symbols.len())
            .field("signals_emitted", &self.signals_emitted.load(Ordering::Relaxed))
            .field("signals_approved", &self.signals_approved.load(Ordering::Relaxed))
            .finish()
    }
}

impl ConfluenceIntegrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        broker: Arc<dyn BrokerAdapter>,
        execution: Arc<dyn ExecutionAdapter>,
        confluence_engine: ConfluenceEngine,
        structure_engine: MarketStructureEngine,
        signal_synth: SignalSynthesizer,
        learning: Arc<PatternLearningSystem>,
        risk_gate: Arc<dyn RiskGate + Send + Sync>,
        bus: Arc<AnalyticsEventBus>,
        recovery: Option<Arc<RecoveryEngine>>,
        config: IntegratorConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            broker,
            execution,
            confluence_engine,
            structure_engine,
            signal_synth,
            learning,
            risk_gate,
            bus,
            recovery,
            config,
            equity: RwLock::new(EquityTracker::default()),
            trading_enabled: AtomicBool::new(true),
            signals_emitted: AtomicU64::new(0),
            signals_approved: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            loop_handle: Mutex::new(None),
            self_weak: weak.clone(),
        })
    }

    /// Feeds a broker disconnect into the recovery engine (§4.2
    /// `FailureKind::BrokerConnectionLost`).
    pub async fn on_disconnect(&self) {
        tracing::warn!("broker disconnected");
        if let Some(recovery) = &self.recovery {
            recovery.dispatch(&[FailureKind::BrokerConnectionLost]).await;
        }
    }

    /// Publishes a `TradingDisabled` system event to the bus and stops
    /// emitting new signals until `resume_trading` is called.
    pub fn on_trading_disabled(&self) {
        self.trading_enabled.store(false, Ordering::SeqCst);
        tracing::warn!("trading disabled");
        self.bus.publish(AnalyticsEvent {
            id: mint_id("event"),
            kind: AnalyticsEventKind::SystemStatus,
            timestamp: chrono::Utc::now(),
            symbol: Symbol::new(""),
            timeframe: self.config.timeframe,
            component: AnalyticsComponent::Integrator,
            priority: AnalyticsEvent::PRIORITY_BYPASS_THRESHOLD,
            payload: serde_json::json!({ "status": "trading_disabled" }),
            tags: std::iter::once("trading_disabled".to_string()).collect(),
        });
    }

    pub fn resume_trading(&self) {
        self.trading_enabled.store(true, Ordering::SeqCst);
    }

    async fn run_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll_once().await,
                _ = self.shutdown.cancelled() => {
                    tracing::info!("integrator poll loop shutting down");
                    break;
                }
            }
        }
    }

    async fn poll_once(&self) {
        for symbol in self.config.symbols.clone() {
            if let Err(error) = self.poll_symbol(&symbol).await {
                tracing::warn!(%symbol, %error, "integrator poll failed for symbol");
            }
        }
    }

    async fn poll_symbol(&self, symbol: &Symbol) -> Result<(), ConfluenceError> {
        let candles = self
            .broker
            .candles(symbol, CandleRequest::new(self.config.timeframe, self.config.candle_count))
            .await?;

        if candles.is_empty() {
            return Ok(());
        }

        let window = CandleWindow::new(symbol.clone(), self.config.timeframe, candles);
        let current_price = window.last_close().unwrap_or(0.0);

        let confluence = self.confluence_engine.analyze(&window);
        self.publish_stage(symbol, AnalyticsEventKind::ConfluenceUpdated, AnalyticsComponent::Confluence, &confluence);

        let structure = self.structure_engine.analyze(&window);
        self.publish_stage(symbol, AnalyticsEventKind::StructureChange, AnalyticsComponent::Structure, &structure);

        let dominant_kind = confluence
            .pattern_confluences
            .first()
            .copied()
            .unwrap_or(PatternKind::FairValueGap);
        let learning_confidence = self.learning.get_confidence(dominant_kind);

        let setup = self
            .signal_synth
            .synthesize(&confluence, &structure, learning_confidence, current_price);
        self.publish_stage(symbol, AnalyticsEventKind::SignalGenerated, AnalyticsComponent::Signal, &setup);

        self.learning
            .record_detection(
                dominant_kind,
                symbol.clone(),
                self.config.timeframe,
                confluence.overall_strength,
                confluence.overall_strength,
                market_context(&structure),
            )
            .await;

        if !matches!(setup.primary_signal, PrimarySignal::Buy | PrimarySignal::Sell) {
            return Ok(());
        }
        if !self.trading_enabled.load(Ordering::SeqCst) {
            tracing::debug!(%symbol, "trading disabled, dropping signal");
            return Ok(());
        }

        self.signals_emitted.fetch_add(1, Ordering::Relaxed);

        let action = match setup.primary_signal {
            PrimarySignal::Buy => confluence_risk::Action::Buy,
            PrimarySignal::Sell => confluence_risk::Action::Sell,
            _ => unreachable!("gated above"),
        };
        let gate_confidence =
            ((confluence.overall_strength + structure.phase_confidence + learning_confidence) / 300.0).clamp(0.0, 1.0);

        let signal = TradingSignal {
            id: mint_id("signal"),
            symbol: symbol.clone(),
            action,
            entry: setup.entry,
            stop_loss: setup.sl,
            take_profit: setup.tp,
            confidence: gate_confidence,
            pattern_kind: dominant_kind,
            session: Killzone::classify(chrono::Utc::now()),
            timestamp: chrono::Utc::now(),
        };

        let portfolio = self.build_portfolio_snapshot().await?;
        let decision = self.risk_gate.evaluate(&signal, &portfolio);
        self.publish_stage(symbol, AnalyticsEventKind::SignalGenerated, AnalyticsComponent::Risk, &decision);

        if !decision.approved {
            tracing::info!(%symbol, reason = ?decision.reason, "signal rejected by risk gate");
            return Ok(());
        }
        self.signals_approved.fetch_add(1, Ordering::Relaxed);

        let order = OrderRequest::new(
            signal.symbol.clone(),
            side_from_action(signal.action),
            decision.max_safe_volume,
            Some(signal.entry),
            Some(signal.stop_loss),
            Some(signal.take_profit),
            format!("confluence:{:?}", signal.pattern_kind),
        );
        let result = self
            .execution
            .execute_order(order)
            .await
            .map_err(|error| ConfluenceError::CriticalTrading(error.to_string()))?;

        if !result.success {
            tracing::warn!(%symbol, error = ?result.error, "order execution failed");
        }

        Ok(())
    }

    fn publish_stage<T: serde::Serialize>(
        &self,
        symbol: &Symbol,
        kind: AnalyticsEventKind,
        component: AnalyticsComponent,
        payload: &T,
    ) {
        let payload = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
        self.bus.publish(AnalyticsEvent {
            id: mint_id("event"),
            kind,
            timestamp: chrono::Utc::now(),
            symbol: symbol.clone(),
            timeframe: self.config.timeframe,
            component,
            priority: 0,
            payload,
            tags: std::collections::HashSet::new(),
        });
    }

    async fn build_portfolio_snapshot(&self) -> Result<PortfolioSnapshot, ConfluenceError> {
        let account = self.broker.account_info().await?;
        let positions = self.broker.open_positions().await?;

        let (peak_equity, drawdown) = self.equity.write().observe(account.equity);

        Ok(PortfolioSnapshot {
            equity: account.equity,
            peak_equity,
            open_positions: positions
                .into_iter()
                .map(|position| OpenPosition {
                    symbol: position.symbol,
                    side: position.side,
                    volume: position.volume,
                })
                .collect(),
            daily_loss: drawdown,
            weekly_loss: drawdown,
            monthly_loss: drawdown,
        })
    }
}

fn side_from_action(action: confluence_risk::Action) -> confluence_instrument::Side {
    match action {
        confluence_risk::Action::Buy => confluence_instrument::Side::Buy,
        confluence_risk::Action::Sell => confluence_instrument::Side::Sell,
    }
}

/// Maps the structure engine's trend read onto the learning system's
/// coarser `MarketPhase` vocabulary; not a spec-mandated conversion,
/// just what this component needs to build a `MarketContext`.
fn market_context(structure: &StructureAnalysis) -> MarketContext {
    let phase = match structure.trend_direction {
        TrendDirection::Bullish | TrendDirection::Bearish => MarketPhase::Trending,
        TrendDirection::Sideways => MarketPhase::Ranging,
        TrendDirection::Transitioning => MarketPhase::Reversal,
    };
    let bias = match structure.trend_direction {
        TrendDirection::Bullish => MarketBias::Bullish,
        TrendDirection::Bearish => MarketBias::Bearish,
        _ => MarketBias::Neutral,
    };

    MarketContext {
        bias,
        phase,
        timeframe_biases: std::collections::HashMap::new(),
        swing_points: SwingPointsSummary {
            highs: Vec::new(),
            lows: Vec::new(),
            last_high: None,
            last_low: None,
        },
        killzone: Killzone::classify(chrono::Utc::now()),
        session_stats: std::collections::HashMap::new(),
    }
}

#[async_trait]
impl Component for ConfluenceIntegrator {
    fn name(&self) -> &str {
        "integrator"
    }

    async fn initialize(&self) -> Result<bool, ConfluenceError> {
        self.broker
            .connect()
            .await
            .map_err(|error| ConfluenceError::Fatal(error.to_string()))?;
        Ok(true)
    }

    async fn start(&self) -> Result<bool, ConfluenceError> {
        let this = self
            .self_weak
            .upgrade()
            .expect("integrator is always held behind its own Arc");
        let handle = tokio::spawn(async move { this.run_loop().await });
        *self.loop_handle.lock() = Some(handle);
        Ok(true)
    }

    async fn stop(&self, _emergency: bool) -> Result<bool, ConfluenceError> {
        self.shutdown.cancel();
        if let Some(handle) = self.loop_handle.lock().take() {
            handle.abort();
        }
        let _ = self.broker.disconnect().await;
        Ok(true)
    }

    async fn health_check(&self) -> ComponentHealth {
        let mut health = ComponentHealth::new(self.name(), chrono::Utc::now());
        health.state = if self.broker.is_connected().await {
            ComponentState::Running
        } else {
            ComponentState::Degraded
        };
        health
            .metrics
            .insert("signals_emitted".to_string(), self.signals_emitted.load(Ordering::Relaxed) as f64);
        health
            .metrics
            .insert("signals_approved".to_string(), self.signals_approved.load(Ordering::Relaxed) as f64);
        health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_analytics::{AnalyticsEventBus, BusConfig};
    use confluence_broker::mock::MockBrokerAdapter;
    use confluence_instrument::Candle;
    use confluence_pattern::NeutralPatternScorer;
    use confluence_risk::{DefaultRiskGate, RiskConfig};
    use std::time::Duration as StdDuration;

    fn bus_config() -> BusConfig {
        BusConfig {
            capacity: 16,
            batch_size: 8,
            batch_interval: StdDuration::from_millis(10),
            priority_bypass_threshold: 8,
            refresh_interval: StdDuration::from_secs(5),
            retention: StdDuration::from_secs(3600),
        }
    }

    fn trending_candles(n: usize) -> Vec<Candle> {
        let start = chrono::Utc::now();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.5;
                Candle {
                    time: start + chrono::Duration::minutes(i as i64 * 15),
                    open: close - 0.3,
                    high: close + 0.4,
                    low: close - 0.5,
                    close,
                    volume: Some(1000.0),
                }
            })
            .collect()
    }

    fn build_integrator(symbol: Symbol) -> (Arc<ConfluenceIntegrator>, Arc<MockBrokerAdapter>) {
        let broker = Arc::new(MockBrokerAdapter::default());
        broker.seed_candles(symbol.clone(), trending_candles(60));

        let confluence_engine =
            ConfluenceEngine::new(StdDuration::from_secs(300), Arc::new(NeutralPatternScorer));
        let structure_engine = MarketStructureEngine::new(confluence_analytics::StructureEngineConfig {
            swing_point_k: 2,
            trend_lookback_swings: 6,
            trend_dominance_multiple: 1.5,
            sr_cluster_band_pct: 0.001,
            sr_min_touches: 2,
            sr_levels_per_side: 5,
        });
        let signal_synth = SignalSynthesizer::new(0.0);
        let learning = Arc::new(PatternLearningSystem::new(100, 20, None));
        let risk_gate: Arc<dyn RiskGate + Send + Sync> =
            Arc::new(DefaultRiskGate::new(RiskConfig::default()));
        let bus = AnalyticsEventBus::new(bus_config());

        let config = IntegratorConfig {
            symbols: vec![symbol],
            timeframe: confluence_instrument::Timeframe::M15,
            candle_count: 60,
            poll_interval: StdDuration::from_secs(30),
        };

        let integrator = ConfluenceIntegrator::new(
            broker.clone(),
            broker.clone(),
            confluence_engine,
            structure_engine,
            signal_synth,
            learning,
            risk_gate,
            bus,
            None,
            config,
        );
        (integrator, broker)
    }

    #[tokio::test]
    async fn poll_symbol_runs_the_full_pipeline_once_connected() {
        let symbol = Symbol::new("EURUSD");
        let (integrator, broker) = build_integrator(symbol.clone());
        broker.connect().await.unwrap();
        assert!(integrator.poll_symbol(&symbol).await.is_ok());
    }

    #[tokio::test]
    async fn poll_symbol_surfaces_a_disconnected_broker_as_transient() {
        let symbol = Symbol::new("EURUSD");
        let (integrator, _broker) = build_integrator(symbol.clone());
        let error = integrator.poll_symbol(&symbol).await.unwrap_err();
        assert!(matches!(error, ConfluenceError::Transient(_)));
    }

    #[tokio::test]
    async fn poll_symbol_is_a_noop_with_no_seeded_candles() {
        let symbol = Symbol::new("GBPUSD");
        let (integrator, _broker) = build_integrator(Symbol::new("EURUSD"));
        assert!(integrator.poll_symbol(&symbol).await.is_ok());
    }

    #[tokio::test]
    async fn on_trading_disabled_blocks_further_signal_emission() {
        let symbol = Symbol::new("EURUSD");
        let (integrator, _broker) = build_integrator(symbol.clone());
        integrator.on_trading_disabled();
        integrator.poll_symbol(&symbol).await.unwrap();
        assert_eq!(integrator.signals_emitted.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn health_check_reports_degraded_before_connect() {
        let symbol = Symbol::new("EURUSD");
        let (integrator, _broker) = build_integrator(symbol);
        let health = integrator.health_check().await;
        assert_eq!(health.state, ComponentState::Degraded);
    }

    #[tokio::test]
    async fn initialize_connects_the_broker() {
        let symbol = Symbol::new("EURUSD");
        let (integrator, broker) = build_integrator(symbol);
        assert!(integrator.initialize().await.unwrap());
        assert!(broker.is_connected().await);
    }
}
