//! Configuration for the analytics pipeline, matching the `analytics`
//! section of the platform's top-level config (§6).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// How long a `ConfluenceAnalysis` stays valid in the per-(symbol,
    /// timeframe) cache before a fresh scoring pass is required.
    pub confluence_cache_ttl: Duration,
    /// Neighbour count `k` for swing-point detection (§4.4.2 step 1).
    pub swing_point_k: usize,
    /// Recent swing count compared for trend classification (§4.4.2 step 3).
    pub trend_lookback_swings: usize,
    /// Dominance multiple at which trend classification calls Bullish or
    /// Bearish instead of Sideways (§4.4.2 step 3).
    pub trend_dominance_multiple: f64,
    /// Relative band (e.g. `0.001` = 0.1%) within which two swing prices are
    /// clustered into one support/resistance level (§4.4.2 step 5).
    pub sr_cluster_band_pct: f64,
    /// Touches required before a price cluster becomes a tracked S/R level.
    pub sr_min_touches: u32,
    /// Retained levels per side after clustering.
    pub sr_levels_per_side: usize,
    /// Minimum `overall_strength`/`phase_confidence`/learning-confidence for
    /// the signal synthesizer to emit Buy/Sell instead of Wait (§4.4.3).
    pub signal_threshold: f64,
    /// Records processed between `LearningInsight` emission passes (§4.4.4).
    pub insight_generation_interval: u64,
    /// Sample floor below which a pattern kind uses the neutral default
    /// prediction instead of its rolling performance (§4.4.4).
    pub min_samples_for_confidence: u64,
    /// Bounded event-bus channel capacity (§4.4.5).
    pub event_bus_capacity: usize,
    /// Max events drained from the bus per consumer tick.
    pub event_batch_size: usize,
    /// Consumer batch-drain tick interval.
    pub event_batch_interval: Duration,
    /// Priority at or above which a publish bypasses the batched queue.
    pub event_priority_bypass_threshold: u8,
    /// Refresh tick for pruning rolling windows (active patterns/signals)
    /// to the last hour.
    pub rolling_window_refresh_interval: Duration,
    /// Retention horizon for rolling windows.
    pub rolling_window_retention: Duration,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            confluence_cache_ttl: Duration::from_secs(5 * 60),
            swing_point_k: 2,
            trend_lookback_swings: 6,
            trend_dominance_multiple: 1.5,
            sr_cluster_band_pct: 0.001,
            sr_min_touches: 2,
            sr_levels_per_side: 5,
            signal_threshold: 65.0,
            insight_generation_interval: 100,
            min_samples_for_confidence: 20,
            event_bus_capacity: 1000,
            event_batch_size: 50,
            event_batch_interval: Duration::from_secs(1),
            event_priority_bypass_threshold: 8,
            rolling_window_refresh_interval: Duration::from_secs(5),
            rolling_window_retention: Duration::from_secs(60 * 60),
        }
    }
}
