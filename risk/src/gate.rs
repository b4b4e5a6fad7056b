//! The pre-execution risk gate (§4.5): evaluates every synthesized
//! `Buy`/`Sell` [`TradingSignal`] against [`RiskConfig`] before it is
//! allowed to reach execution.

use crate::check::{
    CheckCorrelationBelow, CheckDrawdownBelow, CheckHigherThan, CheckWithinLossCap,
    CorrelationCheckInput, EquityCurve, LossCapPeriod, RiskCheck,
};
use crate::correlation::{CorrelationOracle, SharedCurrencyHeuristic};
use crate::config::RiskConfig;
use crate::signal::{Action, TradingSignal};
use confluence_instrument::{Side, Symbol};
use serde::{Deserialize, Serialize};

/// One currently open position, as the gate needs to know it: enough
/// to compute per-symbol exposure and feed the correlation check.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub symbol: Symbol,
    pub side: Side,
    pub volume: f64,
}

/// Account and portfolio state the gate checks a signal against.
/// Owned by the integrator; the gate never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    pub equity: f64,
    pub peak_equity: f64,
    pub open_positions: Vec<OpenPosition>,
    pub daily_loss: f64,
    pub weekly_loss: f64,
    pub monthly_loss: f64,
}

impl PortfolioSnapshot {
    fn volume_for_symbol(&self, symbol: &Symbol) -> f64 {
        self.open_positions
            .iter()
            .filter(|p| &p.symbol == symbol)
            .map(|p| p.volume)
            .sum()
    }
}

/// Coarse qualitative read on how close a decision sits to its limits,
/// independent of `approved` — an approved trade can still be `High`
/// risk, flagging it for closer monitoring downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Result of a [`RiskGate::evaluate`] call (§4.5).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RiskDecision {
    pub approved: bool,
    pub reason: Option<String>,
    pub max_safe_volume: f64,
    pub risk_level: RiskLevel,
}

impl RiskDecision {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: Some(reason.into()),
            max_safe_volume: 0.0,
            risk_level: RiskLevel::Critical,
        }
    }
}

/// Pre-execution filter applied to every synthesized `Buy`/`Sell`
/// signal (§4.5).
pub trait RiskGate {
    fn evaluate(&self, signal: &TradingSignal, portfolio: &PortfolioSnapshot) -> RiskDecision;
}

/// The platform's concrete risk gate, composing one [`RiskCheck`] per
/// rule in §4.5 rather than a single monolithic function.
#[derive(Debug, Clone)]
pub struct DefaultRiskGate<O = SharedCurrencyHeuristic> {
    config: RiskConfig,
    correlation_oracle: O,
}

impl DefaultRiskGate<SharedCurrencyHeuristic> {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            correlation_oracle: SharedCurrencyHeuristic,
        }
    }
}

impl<O: CorrelationOracle> DefaultRiskGate<O> {
    pub fn with_correlation_oracle(config: RiskConfig, correlation_oracle: O) -> Self {
        Self {
            config,
            correlation_oracle,
        }
    }

    fn risk_level(&self, drawdown_pct: f64, exposure_ratio: f64) -> RiskLevel {
        let worst = drawdown_pct.max(exposure_ratio * 100.0);
        if worst >= self.config.max_drawdown_pct * 0.9 {
            RiskLevel::Critical
        } else if worst >= self.config.max_drawdown_pct * 0.6 {
            RiskLevel::High
        } else if worst >= self.config.max_drawdown_pct * 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl<O: CorrelationOracle> RiskGate for DefaultRiskGate<O> {
    fn evaluate(&self, signal: &TradingSignal, portfolio: &PortfolioSnapshot) -> RiskDecision {
        // Checked against the count *after* this signal opens, not the
        // current count — otherwise a trader already at the cap is still
        // approved for one more (the check only rejects once the limit is
        // already exceeded).
        let positions_after_open = portfolio.open_positions.len() as u32 + 1;
        if let Err(error) = CheckHigherThan::new(self.config.max_positions).check(&positions_after_open) {
            return RiskDecision::rejected(error.to_string());
        }

        let existing_volume = portfolio.volume_for_symbol(&signal.symbol);
        if let Err(error) = CheckHigherThan::new(self.config.max_volume_per_symbol)
            .check(&existing_volume)
        {
            return RiskDecision::rejected(error.to_string());
        }

        let open_symbols = portfolio
            .open_positions
            .iter()
            .map(|p| p.symbol.clone())
            .collect();
        let correlation_input = CorrelationCheckInput::new(signal.symbol.clone(), open_symbols);
        let correlation_check = CheckCorrelationBelow::new(
            CorrelationOracleRef(&self.correlation_oracle),
            self.config.correlation_threshold,
        );
        if let Err(error) = correlation_check.check(&correlation_input) {
            return RiskDecision::rejected(error.to_string());
        }

        let equity_curve = EquityCurve::new(portfolio.peak_equity, portfolio.equity);
        if let Err(error) =
            CheckDrawdownBelow::new(self.config.max_drawdown_pct).check(&equity_curve)
        {
            return RiskDecision::rejected(error.to_string());
        }

        for (period, cap, realized) in [
            (LossCapPeriod::Daily, self.config.daily_loss_cap, portfolio.daily_loss),
            (LossCapPeriod::Weekly, self.config.weekly_loss_cap, portfolio.weekly_loss),
            (LossCapPeriod::Monthly, self.config.monthly_loss_cap, portfolio.monthly_loss),
        ] {
            if let Err(error) = CheckWithinLossCap::new(period, cap).check(&realized) {
                return RiskDecision::rejected(error.to_string());
            }
        }

        let risk_amount = portfolio.equity * self.config.max_risk_per_trade_pct / 100.0;
        let by_risk = crate::check::position_size_for_risk(risk_amount, signal.price_risk());
        let by_symbol_cap = (self.config.max_volume_per_symbol - existing_volume).max(0.0);
        let max_safe_volume = by_risk.min(by_symbol_cap);

        if max_safe_volume <= 0.0 {
            return RiskDecision::rejected("no safe volume remains under current risk limits");
        }

        let exposure_ratio = (existing_volume + max_safe_volume)
            / self.config.max_volume_per_symbol.max(f64::EPSILON);
        let risk_level = self.risk_level(equity_curve.drawdown_pct(), exposure_ratio);

        RiskDecision {
            approved: true,
            reason: None,
            max_safe_volume,
            risk_level,
        }
    }
}

/// Adapts a `&O` into an owned `CorrelationOracle` so `CheckCorrelationBelow`
/// (which owns its oracle) can borrow the gate's without cloning it.
#[derive(Debug)]
struct CorrelationOracleRef<'a, O>(&'a O);

impl<O: CorrelationOracle> CorrelationOracle for CorrelationOracleRef<'_, O> {
    fn correlation(&self, a: &Symbol, b: &Symbol) -> f64 {
        self.0.correlation(a, b)
    }
}

/// Converts a gated `Buy`/`Sell` `TradeSetup` (see
/// `confluence_analytics::PrimarySignal`) into the gate's `TradingSignal`
/// vocabulary. Lives here rather than in `confluence-analytics` because
/// the analytics crate has no reason to depend on the risk crate's
/// `Action` type.
pub fn action_from_side(side: Side) -> Action {
    match side {
        Side::Buy => Action::Buy,
        Side::Sell => Action::Sell,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_pattern::PatternKind;
    use confluence_instrument::Killzone;
    use chrono::Utc;

    fn signal(symbol: &str, entry: f64, stop: f64) -> TradingSignal {
        TradingSignal {
            id: "sig-1".into(),
            symbol: Symbol::new(symbol),
            action: Action::Buy,
            entry,
            stop_loss: stop,
            take_profit: entry + (entry - stop) * 2.0,
            confidence: 0.8,
            pattern_kind: PatternKind::OrderBlock,
            session: Killzone::London,
            timestamp: Utc::now(),
        }
    }

    fn portfolio() -> PortfolioSnapshot {
        PortfolioSnapshot {
            equity: 10_000.0,
            peak_equity: 10_000.0,
            open_positions: Vec::new(),
            daily_loss: 0.0,
            weekly_loss: 0.0,
            monthly_loss: 0.0,
        }
    }

    #[test]
    fn approves_a_clean_signal_with_positive_safe_volume() {
        let gate = DefaultRiskGate::new(RiskConfig::default());
        let decision = gate.evaluate(&signal("EURUSD", 1.1000, 1.0950), &portfolio());
        assert!(decision.approved);
        assert!(decision.max_safe_volume > 0.0);
    }

    #[test]
    fn rejects_when_max_positions_reached() {
        let mut config = RiskConfig::default();
        config.max_positions = 0;
        let gate = DefaultRiskGate::new(config);
        let decision = gate.evaluate(&signal("EURUSD", 1.1000, 1.0950), &portfolio());
        assert!(!decision.approved);
    }

    #[test]
    fn rejects_when_drawdown_cap_breached() {
        let gate = DefaultRiskGate::new(RiskConfig::default());
        let mut state = portfolio();
        state.peak_equity = 10_000.0;
        state.equity = 5_000.0;
        let decision = gate.evaluate(&signal("EURUSD", 1.1000, 1.0950), &state);
        assert!(!decision.approved);
    }

    #[test]
    fn rejects_correlated_new_position() {
        let gate = DefaultRiskGate::new(RiskConfig::default());
        let mut state = portfolio();
        state.open_positions.push(OpenPosition {
            symbol: Symbol::new("GBPUSD"),
            side: Side::Buy,
            volume: 1.0,
        });
        let decision = gate.evaluate(&signal("EURUSD", 1.1000, 1.0950), &state);
        assert!(!decision.approved);
    }

    #[test]
    fn rejects_when_loss_cap_hit() {
        let gate = DefaultRiskGate::new(RiskConfig::default());
        let mut state = portfolio();
        state.daily_loss = RiskConfig::default().daily_loss_cap;
        let decision = gate.evaluate(&signal("EURUSD", 1.1000, 1.0950), &state);
        assert!(!decision.approved);
    }
}
