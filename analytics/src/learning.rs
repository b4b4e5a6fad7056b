//! Pattern learning system: snapshots predictions at detection time and
//! finalizes them write-once when the real outcome arrives, rolling the
//! result into a per-pattern-kind performance aggregate (§4.4.4).

use crate::metric::{ProfitFactor, WinRate};
use crate::types::{
    AnalyticsComponent, AnalyticsEvent, AnalyticsEventKind, MarketContext, Outcome,
    PatternLearningRecord, PatternPerformance,
};
use confluence_core::{mint_id, ConfluenceError, Record, RecordCategory};
use confluence_instrument::{Symbol, Timeframe};
use confluence_pattern::PatternKind;
use confluence_persistence::PersistenceStore;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The default prediction used for pattern kinds below the sample floor.
const NEUTRAL_CONFIDENCE: f64 = 50.0;

pub struct PatternLearningSystem {
    records: DashMap<String, PatternLearningRecord>,
    performance: DashMap<PatternKind, PatternPerformance>,
    persistence: Option<Arc<PersistenceStore>>,
    processed: AtomicU64,
    insight_generation_interval: u64,
    min_samples_for_confidence: u64,
    pending_insights: Mutex<Vec<AnalyticsEvent>>,
}

impl std::fmt::Debug for PatternLearningSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternLearningSystem")
            .field("records", &self.records.len())
            .field("performance", &self.performance.len())
            .finish()
    }
}

impl PatternLearningSystem {
    pub fn new(
        insight_generation_interval: u64,
        min_samples_for_confidence: u64,
        persistence: Option<Arc<PersistenceStore>>,
    ) -> Self {
        Self {
            records: DashMap::new(),
            performance: DashMap::new(),
            persistence,
            processed: AtomicU64::new(0),
            insight_generation_interval,
            min_samples_for_confidence,
            pending_insights: Mutex::new(Vec::new()),
        }
    }

    /// Snapshots a prediction for `pattern_kind` and returns its record id.
    /// The predicted outcome/confidence come from that pattern's rolling
    /// performance, or the neutral default below the sample floor.
    pub async fn record_detection(
        &self,
        pattern_kind: PatternKind,
        symbol: Symbol,
        timeframe: Timeframe,
        strength: f64,
        confluence_score: f64,
        context: MarketContext,
    ) -> String {
        let predicted_confidence = self.get_confidence(pattern_kind);
        let predicted_outcome = self
            .performance
            .get(&pattern_kind)
            .filter(|perf| perf.occurrences >= self.min_samples_for_confidence)
            .and_then(|perf| perf.win_rate)
            .map(|win_rate| {
                if win_rate >= 0.5 {
                    Outcome::Win
                } else {
                    Outcome::Loss
                }
            })
            .unwrap_or(Outcome::BreakEven);

        let id = mint_id("pattern");
        let record = PatternLearningRecord {
            id: id.clone(),
            pattern_kind,
            symbol,
            timeframe,
            detected_at: chrono::Utc::now(),
            strength,
            confluence_score,
            market_context: context,
            predicted_outcome,
            predicted_confidence,
            actual_outcome: None,
            actual_profit_r: None,
            outcome_at: None,
        };
        self.records.insert(id.clone(), record);
        self.tick_insight_counter();
        id
    }

    /// Finalizes `record_id` with its realized outcome and rolls it into
    /// that pattern's performance. Write-once: a second call on the same
    /// record returns `ConfluenceError::InvariantViolation`.
    pub async fn update_outcome(
        &self,
        record_id: &str,
        actual_outcome: Outcome,
        actual_profit_r: f64,
    ) -> Result<(), ConfluenceError> {
        let pattern_kind = {
            let mut entry = self.records.get_mut(record_id).ok_or_else(|| {
                ConfluenceError::InvariantViolation(format!("unknown pattern record {record_id}"))
            })?;
            if entry.actual_outcome.is_some() {
                return Err(ConfluenceError::InvariantViolation(format!(
                    "outcome already recorded for {record_id}"
                )));
            }
            entry.actual_outcome = Some(actual_outcome);
            entry.actual_profit_r = Some(actual_profit_r);
            entry.outcome_at = Some(chrono::Utc::now());
            entry.pattern_kind
        };

        self.roll_performance(pattern_kind, actual_outcome, actual_profit_r);

        if let Some(persistence) = &self.persistence {
            if let Some(record) = self.records.get(record_id) {
                let payload = serde_json::to_value(record.value())
                    .map_err(|error| ConfluenceError::InvariantViolation(error.to_string()))?;
                let stored = Record::new(record_id, RecordCategory::PATTERNS, chrono::Utc::now(), payload);
                persistence
                    .store(stored)
                    .await
                    .map_err(|error| ConfluenceError::Transient(error.to_string()))?;
            }
        }

        Ok(())
    }

    /// Confidence for `pattern_kind`, 0-100. Returns the neutral default
    /// below the sample floor (§4.4.4 "sample floor").
    pub fn get_confidence(&self, pattern_kind: PatternKind) -> f64 {
        match self.performance.get(&pattern_kind) {
            Some(perf) if perf.occurrences >= self.min_samples_for_confidence => {
                perf.confidence_score
            }
            _ => NEUTRAL_CONFIDENCE,
        }
    }

    pub fn performance_of(&self, pattern_kind: PatternKind) -> Option<PatternPerformance> {
        self.performance.get(&pattern_kind).map(|entry| entry.value().clone())
    }

    /// Drains and returns any `LearningInsight` events queued since the
    /// last call (§4.4.4 "emits LearningInsight events for outliers").
    pub fn take_pending_insights(&self) -> Vec<AnalyticsEvent> {
        std::mem::take(&mut self.pending_insights.lock())
    }

    fn roll_performance(&self, pattern_kind: PatternKind, outcome: Outcome, profit_r: f64) {
        let mut perf = self
            .performance
            .entry(pattern_kind)
            .or_insert_with(|| PatternPerformance::new(pattern_kind));

        perf.occurrences += 1;
        match outcome {
            Outcome::Win => {
                perf.wins += 1;
                perf.total_profit_r += profit_r.max(0.0);
            }
            Outcome::Loss => {
                perf.losses += 1;
                perf.total_loss_r += profit_r.min(0.0).abs();
            }
            Outcome::BreakEven => {}
        }

        let win_rate = WinRate::calculate(Decimal::from(perf.wins), Decimal::from(perf.occurrences))
            .and_then(|wr| wr.value.to_f64());
        let profit_factor = ProfitFactor::calculate(
            Decimal::try_from(perf.total_profit_r).unwrap_or(Decimal::ZERO),
            Decimal::try_from(perf.total_loss_r).unwrap_or(Decimal::ZERO),
        )
        .and_then(|pf| pf.value.to_f64());

        let avg_win = if perf.wins > 0 {
            perf.total_profit_r / perf.wins as f64
        } else {
            0.0
        };
        let avg_loss = if perf.losses > 0 {
            perf.total_loss_r / perf.losses as f64
        } else {
            0.0
        };
        let wr_fraction = win_rate.unwrap_or(0.0);
        perf.expectancy = wr_fraction * avg_win - (1.0 - wr_fraction) * avg_loss;

        let sample_weight = (perf.occurrences as f64 / 100.0).min(1.0);
        let pf_component = profit_factor.unwrap_or(1.0).min(3.0) / 3.0 * 100.0;
        perf.confidence_score =
            (wr_fraction * 100.0 * 0.5 + pf_component * 0.3 + sample_weight * 100.0 * 0.2)
                .clamp(0.0, 100.0);

        perf.win_rate = win_rate;
        perf.profit_factor = profit_factor;
    }

    fn tick_insight_counter(&self) {
        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if processed % self.insight_generation_interval != 0 {
            return;
        }
        let insights = self.scan_for_insights();
        self.pending_insights.lock().extend(insights);
    }

    /// Scans every tracked pattern's performance for outliers and emits a
    /// `LearningInsight` for each (§4.4.4).
    fn scan_for_insights(&self) -> Vec<AnalyticsEvent> {
        self.performance
            .iter()
            .filter(|entry| entry.occurrences >= self.min_samples_for_confidence)
            .filter_map(|entry| {
                let perf = entry.value();
                let recommendation = if perf.confidence_score >= 75.0 {
                    "increase"
                } else if perf.confidence_score <= 25.0 {
                    "decrease"
                } else {
                    return None;
                };
                Some(AnalyticsEvent {
                    id: mint_id("insight"),
                    kind: AnalyticsEventKind::LearningInsight,
                    timestamp: chrono::Utc::now(),
                    symbol: Symbol::new(""),
                    timeframe: Timeframe::M1,
                    component: AnalyticsComponent::Learning,
                    priority: 5,
                    payload: serde_json::json!({
                        "pattern_kind": perf.pattern_kind,
                        "confidence_score": perf.confidence_score,
                        "recommendation": recommendation,
                    }),
                    tags: HashSet::from([String::from("learning-insight")]),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_instrument::Killzone;
    use std::collections::HashMap;

    fn context() -> MarketContext {
        MarketContext {
            bias: crate::types::MarketBias::Neutral,
            phase: crate::types::MarketPhase::Ranging,
            timeframe_biases: HashMap::new(),
            swing_points: Default::default(),
            killzone: Killzone::London,
            session_stats: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn update_outcome_is_write_once() {
        let system = PatternLearningSystem::new(100, 20, None);
        let id = system
            .record_detection(
                PatternKind::FairValueGap,
                Symbol::new("EURUSD"),
                Timeframe::M5,
                80.0,
                70.0,
                context(),
            )
            .await;

        system
            .update_outcome(&id, Outcome::Win, 2.0)
            .await
            .expect("first update succeeds");

        let second = system.update_outcome(&id, Outcome::Loss, -1.0).await;
        assert!(matches!(second, Err(ConfluenceError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn below_sample_floor_uses_neutral_confidence() {
        let system = PatternLearningSystem::new(100, 20, None);
        assert_eq!(system.get_confidence(PatternKind::OrderBlock), NEUTRAL_CONFIDENCE);
    }

    #[tokio::test]
    async fn rolling_performance_updates_after_enough_samples() {
        let system = PatternLearningSystem::new(100, 1, None);
        let id = system
            .record_detection(
                PatternKind::OrderBlock,
                Symbol::new("EURUSD"),
                Timeframe::M5,
                80.0,
                70.0,
                context(),
            )
            .await;
        system.update_outcome(&id, Outcome::Win, 2.0).await.unwrap();

        let perf = system.performance_of(PatternKind::OrderBlock).unwrap();
        assert_eq!(perf.occurrences, 1);
        assert_eq!(perf.wins, 1);
        assert!(system.get_confidence(PatternKind::OrderBlock) > 0.0);
    }
}
