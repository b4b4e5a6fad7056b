//! Data model shared by every analytics pipeline stage (§3, §4.4).

use chrono::{DateTime, Utc};
use confluence_instrument::{Killzone, Symbol, Timeframe};
use confluence_pattern::PatternKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Directional bias for a symbol, a timeframe, or the market overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum MarketBias {
    Bullish,
    Bearish,
    Neutral,
}

/// Coarse market regime, distinct from [`StructurePhase`]: this is the
/// `MarketContext`'s notion of "what kind of market is this", while
/// `StructurePhase` is the structure engine's Wyckoff-style read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum MarketPhase {
    Ranging,
    Trending,
    Breakout,
    Reversal,
}

/// Trend read from recent swing-point dominance (§4.4.2 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Sideways,
    Transitioning,
}

/// Wyckoff-style structural phase (§4.4.2 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum StructurePhase {
    Accumulation,
    Manipulation,
    Distribution,
    Rebalance,
    Unknown,
}

/// Classification of a swing point relative to the previous swing of the
/// same kind (§4.4.2 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum StructurePointKind {
    /// Higher high.
    Hh,
    /// Higher low.
    Hl,
    /// Lower high.
    Lh,
    /// Lower low.
    Ll,
    /// Equal high (within the 0.1% band).
    Eqh,
    /// Equal low (within the 0.1% band).
    Eql,
}

/// One classified swing point.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StructurePoint {
    pub kind: StructurePointKind,
    pub price: f64,
    pub at: DateTime<Utc>,
}

/// Which side of price a support/resistance cluster sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SrSide {
    Support,
    Resistance,
}

/// A clustered support/resistance level (§4.4.2 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SrLevel {
    pub side: SrSide,
    pub price: f64,
    pub touches: u32,
    pub strength: f64,
}

/// A break-of-structure or change-of-character event recorded against the
/// running structure analysis.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StructureBreak {
    pub kind: PatternKind,
    pub at: DateTime<Utc>,
    pub price: f64,
}

/// Output of the confluence engine (§4.4.1).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConfluenceAnalysis {
    pub id: String,
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub overall_strength: f64,
    pub pattern_confluences: Vec<PatternKind>,
    pub market_bias: MarketBias,
    pub timestamp: DateTime<Utc>,
}

/// Output of the market structure engine (§4.4.2).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StructureAnalysis {
    pub id: String,
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub current_phase: StructurePhase,
    pub trend_direction: TrendDirection,
    pub structure_points: Vec<StructurePoint>,
    pub support_levels: Vec<SrLevel>,
    pub resistance_levels: Vec<SrLevel>,
    pub recent_breaks: Vec<StructureBreak>,
    pub phase_confidence: f64,
    pub trend_strength: f64,
    pub next_key_level: Option<SrLevel>,
    pub expected_direction: Option<TrendDirection>,
    pub timestamp: DateTime<Utc>,
}

/// Trade direction or stand-down decision from the signal synthesizer
/// (§4.4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum PrimarySignal {
    Buy,
    Sell,
    Wait,
    Avoid,
}

/// Qualitative grade attached to a synthesized trade setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SetupQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Output of the signal synthesizer (§4.4.3).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeSetup {
    pub id: String,
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub primary_signal: PrimarySignal,
    pub setup_quality: SetupQuality,
    pub entry: f64,
    pub sl: f64,
    pub tp: f64,
    pub reward_risk: f64,
    pub timestamp: DateTime<Utc>,
}

/// Realized result of a pattern-learning prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Outcome {
    Win,
    Loss,
    BreakEven,
}

/// Swing-point summary carried in [`MarketContext`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SwingPointsSummary {
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub last_high: Option<f64>,
    pub last_low: Option<f64>,
}

/// Bounded-retention market context carried alongside a pattern detection
/// (§3 "Market context").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarketContext {
    pub bias: MarketBias,
    pub phase: MarketPhase,
    pub timeframe_biases: HashMap<Timeframe, MarketBias>,
    pub swing_points: SwingPointsSummary,
    pub killzone: Killzone,
    pub session_stats: HashMap<String, f64>,
}

/// A pattern-learning prediction snapshot, finalized write-once by
/// `update_outcome` (§3 "Pattern learning record").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PatternLearningRecord {
    pub id: String,
    pub pattern_kind: PatternKind,
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub detected_at: DateTime<Utc>,
    pub strength: f64,
    pub confluence_score: f64,
    pub market_context: MarketContext,
    pub predicted_outcome: Outcome,
    pub predicted_confidence: f64,
    pub actual_outcome: Option<Outcome>,
    pub actual_profit_r: Option<f64>,
    pub outcome_at: Option<DateTime<Utc>>,
}

/// Rolling per-pattern-kind performance aggregate (§3 "Pattern
/// performance").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PatternPerformance {
    pub pattern_kind: PatternKind,
    pub occurrences: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_profit_r: f64,
    pub total_loss_r: f64,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub expectancy: f64,
    pub confidence_score: f64,
}

impl PatternPerformance {
    pub fn new(pattern_kind: PatternKind) -> Self {
        Self {
            pattern_kind,
            occurrences: 0,
            wins: 0,
            losses: 0,
            total_profit_r: 0.0,
            total_loss_r: 0.0,
            win_rate: None,
            profit_factor: None,
            expectancy: 0.0,
            confidence_score: 0.0,
        }
    }
}

/// Analytics event taxonomy published on the [`crate::bus::AnalyticsEventBus`]
/// (§3 "Analytics event").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AnalyticsEventKind {
    PatternDetected,
    ConfluenceUpdated,
    SignalGenerated,
    TradeOutcome,
    PerformanceUpdate,
    LearningInsight,
    StructureChange,
    SystemStatus,
}

/// The pipeline stage that published an [`AnalyticsEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum AnalyticsComponent {
    Confluence,
    Structure,
    Signal,
    Learning,
    Integrator,
    Risk,
}

/// A published analytics event (§3 "Analytics event"). `priority >= 8`
/// bypasses the bus's batching queue (§4.4.5).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyticsEvent {
    pub id: String,
    pub kind: AnalyticsEventKind,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub component: AnalyticsComponent,
    pub priority: u8,
    pub payload: serde_json::Value,
    pub tags: HashSet<String>,
}

impl AnalyticsEvent {
    /// Events at or above this priority bypass the bus's batched queue and
    /// dispatch synchronously on `publish` (§4.4.5).
    pub const PRIORITY_BYPASS_THRESHOLD: u8 = 8;

    pub fn is_high_priority(&self) -> bool {
        self.priority >= Self::PRIORITY_BYPASS_THRESHOLD
    }
}
