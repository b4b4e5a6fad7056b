//! Confluence engine: scores a candle window for ICT pattern alignment
//! (§4.4.1).

use crate::types::{ConfluenceAnalysis, MarketBias};
use confluence_core::mint_id;
use confluence_instrument::{Candle, CandleWindow};
use confluence_pattern::{PatternKind, PatternScorer};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    analysis: ConfluenceAnalysis,
    cached_at: Instant,
}

/// Point-in-time snapshot of the engine's running session stats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStats {
    pub total_analyses: u64,
    pub avg_analysis_time: Duration,
}

/// Scores candle windows for pattern confluences, caching short-lived
/// results per `(symbol, timeframe)` (§4.4.1).
pub struct ConfluenceEngine {
    cache_ttl: Duration,
    scorer: Arc<dyn PatternScorer>,
    cache: DashMap<(confluence_instrument::Symbol, confluence_instrument::Timeframe), CacheEntry>,
    total_analyses: AtomicU64,
    total_duration_nanos: AtomicU64,
}

impl std::fmt::Debug for ConfluenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluenceEngine")
            .field("cache_ttl", &self.cache_ttl)
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}

impl ConfluenceEngine {
    pub fn new(cache_ttl: Duration, scorer: Arc<dyn PatternScorer>) -> Self {
        Self {
            cache_ttl,
            scorer,
            cache: DashMap::new(),
            total_analyses: AtomicU64::new(0),
            total_duration_nanos: AtomicU64::new(0),
        }
    }

    /// Scores `window`, returning a cached analysis when one is still
    /// within the TTL for this `(symbol, timeframe)`.
    pub fn analyze(&self, window: &CandleWindow) -> ConfluenceAnalysis {
        let key = (window.symbol.clone(), window.timeframe);

        if let Some(entry) = self.cache.get(&key) {
            if entry.cached_at.elapsed() < self.cache_ttl {
                return entry.analysis.clone();
            }
        }

        let started = Instant::now();
        let confluences = self.scorer.score(&window.candles);
        let overall_strength = confluences.overall_strength();
        let pattern_confluences: Vec<PatternKind> =
            confluences.confluences.iter().map(|c| c.kind).collect();

        let analysis = ConfluenceAnalysis {
            id: mint_id("confluence"),
            symbol: window.symbol.clone(),
            timeframe: window.timeframe,
            overall_strength,
            pattern_confluences,
            market_bias: infer_bias(&window.candles),
            timestamp: chrono::Utc::now(),
        };

        self.record_session_stats(started.elapsed());
        self.cache.insert(
            key,
            CacheEntry {
                analysis: analysis.clone(),
                cached_at: Instant::now(),
            },
        );
        analysis
    }

    fn record_session_stats(&self, elapsed: Duration) {
        self.total_analyses.fetch_add(1, Ordering::Relaxed);
        self.total_duration_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn session_stats(&self) -> SessionStats {
        let total_analyses = self.total_analyses.load(Ordering::Relaxed);
        let avg_analysis_time = if total_analyses == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed) / total_analyses)
        };
        SessionStats {
            total_analyses,
            avg_analysis_time,
        }
    }
}

/// First-vs-last close comparison over the window as a coarse bias read;
/// the pattern scorer's own alignment drives `overall_strength` separately.
fn infer_bias(candles: &[Candle]) -> MarketBias {
    match (candles.first(), candles.last()) {
        (Some(first), Some(last)) if last.close > first.close => MarketBias::Bullish,
        (Some(first), Some(last)) if last.close < first.close => MarketBias::Bearish,
        _ => MarketBias::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use confluence_instrument::{Symbol, Timeframe};
    use confluence_pattern::NeutralPatternScorer;

    fn candle(close: f64) -> Candle {
        Candle {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: None,
        }
    }

    #[test]
    fn caches_analysis_within_ttl() {
        let engine = ConfluenceEngine::new(Duration::from_secs(300), Arc::new(NeutralPatternScorer));
        let window = CandleWindow::new(
            Symbol::new("EURUSD"),
            Timeframe::M5,
            vec![candle(1.0), candle(1.1)],
        );

        let first = engine.analyze(&window);
        let second = engine.analyze(&window);
        assert_eq!(first.id, second.id);
        assert_eq!(engine.session_stats().total_analyses, 1);
    }

    #[test]
    fn recomputes_after_ttl_expiry() {
        let engine = ConfluenceEngine::new(Duration::from_nanos(1), Arc::new(NeutralPatternScorer));
        let window = CandleWindow::new(
            Symbol::new("EURUSD"),
            Timeframe::M5,
            vec![candle(1.0), candle(1.1)],
        );

        let first = engine.analyze(&window);
        std::thread::sleep(Duration::from_millis(2));
        let second = engine.analyze(&window);
        assert_ne!(first.id, second.id);
        assert_eq!(engine.session_stats().total_analyses, 2);
    }

    #[test]
    fn infers_bullish_bias_from_rising_closes() {
        let candles = vec![candle(1.0), candle(1.5), candle(2.0)];
        assert_eq!(infer_bias(&candles), MarketBias::Bullish);
    }
}
