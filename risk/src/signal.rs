//! The synthesized trade signal a [`crate::RiskGate`] evaluates (§3
//! "Trading signal"). Distinct from `confluence_analytics::TradeSetup`:
//! a setup's `primary_signal` is only turned into a `TradingSignal` once
//! it is `Buy`/`Sell` — `Wait`/`Avoid` setups never reach the gate.

use chrono::{DateTime, Utc};
use confluence_instrument::{Killzone, Symbol};
use confluence_pattern::PatternKind;
use serde::{Deserialize, Serialize};

/// Trade direction. A narrower enum than
/// `confluence_analytics::PrimarySignal` on purpose: only a directional
/// call is ever synthesized into a `TradingSignal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Action {
    Buy,
    Sell,
}

/// A synthesized, not-yet-executed trade signal (§3 "Trading signal").
/// Emitted by `confluence-integrator` only after the signal synthesizer
/// gates `Buy`/`Sell`; passed to [`crate::RiskGate::evaluate`] before
/// reaching the execution adapter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradingSignal {
    pub id: String,
    pub symbol: Symbol,
    pub action: Action,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// 0.0-1.0. Distinct from `TradeSetup::setup_quality`: this is the
    /// gate-facing confidence, a plain fraction rather than a grade.
    pub confidence: f64,
    pub pattern_kind: PatternKind,
    pub session: Killzone,
    pub timestamp: DateTime<Utc>,
}

impl TradingSignal {
    /// Absolute price distance between entry and stop — the per-unit
    /// risk a position of volume 1 carries. Never zero in practice (a
    /// stop equal to entry is a synthesizer bug), but callers computing
    /// `risk_amount / price_risk` guard the zero case anyway.
    pub fn price_risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }
}
