pub mod util;

pub use util::*;

use crate::correlation::CorrelationOracle;
use confluence_instrument::Symbol;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// General interface for implementing simple RiskManager checks.
///
/// See [`CheckHigherThan`] for a simple example.
///
/// # Associated Types
/// * `Input` - The type of data being validated (e.g., `Decimal` for price checks)
/// * `Error` - The error type returned when validation fails
pub trait RiskCheck {
    type Input;
    type Error;

    /// Returns the name of the risk check.
    fn name() -> &'static str;

    /// Performs the risk check on the provided `Input`.
    fn check(&self, input: &Self::Input) -> Result<(), Self::Error>;
}

/// General risk check that validates if an input value exceeds an upper limit.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor)]
pub struct CheckHigherThan<T> {
    /// The upper limit value; check passes if input is <= limit.
    pub limit: T,
}

impl<T> RiskCheck for CheckHigherThan<T>
where
    T: Clone + PartialOrd + std::fmt::Debug,
{
    type Input = T;
    type Error = CheckHigherThanError<T>;

    fn name() -> &'static str {
        "CheckHigherThan"
    }

    fn check(&self, input: &Self::Input) -> Result<(), Self::Error> {
        if input > &self.limit {
            Err(CheckHigherThanError {
                input: input.clone(),
                limit: self.limit.clone(),
            })
        } else {
            Ok(())
        }
    }
}

/// Error returned when a [`CheckHigherThan`] validation fails.
#[derive(Debug, Clone, PartialEq, Error, Constructor)]
#[error("CheckHigherThan failed: input {input:?} > limit {limit:?}")]
pub struct CheckHigherThanError<T: std::fmt::Debug> {
    pub input: T,
    pub limit: T,
}

/// Which accounting period a [`CheckWithinLossCap`] guards (§4.5 "Daily
/// / weekly / monthly loss caps").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LossCapPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for LossCapPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LossCapPeriod::Daily => write!(f, "daily"),
            LossCapPeriod::Weekly => write!(f, "weekly"),
            LossCapPeriod::Monthly => write!(f, "monthly"),
        }
    }
}

/// Rejects a trade once the realized loss for `period` already at or
/// past `cap`. Distinct from [`CheckHigherThan`] only in the error it
/// reports, so the rejection reason names which cap tripped.
#[derive(Debug, Clone, Copy, PartialEq, Constructor)]
pub struct CheckWithinLossCap {
    pub period: LossCapPeriod,
    pub cap: f64,
}

impl RiskCheck for CheckWithinLossCap {
    type Input = f64;
    type Error = LossCapExceeded;

    fn name() -> &'static str {
        "CheckWithinLossCap"
    }

    fn check(&self, realized_loss: &Self::Input) -> Result<(), Self::Error> {
        if *realized_loss >= self.cap {
            Err(LossCapExceeded {
                period: self.period,
                realized_loss: *realized_loss,
                cap: self.cap,
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{period} loss cap exceeded: realized {realized_loss:.2} >= cap {cap:.2}")]
pub struct LossCapExceeded {
    pub period: LossCapPeriod,
    pub realized_loss: f64,
    pub cap: f64,
}

/// Rejects a trade once `(peak_equity - current_equity) / peak_equity`
/// (GLOSSARY "Drawdown") reaches `max_drawdown_pct`.
#[derive(Debug, Clone, Copy, PartialEq, Constructor)]
pub struct CheckDrawdownBelow {
    pub max_drawdown_pct: f64,
}

/// Input to [`CheckDrawdownBelow`]: the account's all-time-high and
/// current equity.
#[derive(Debug, Clone, Copy, PartialEq, Constructor)]
pub struct EquityCurve {
    pub peak_equity: f64,
    pub current_equity: f64,
}

impl EquityCurve {
    /// `(peak - current) / peak`, as a percentage. Zero when `peak` is
    /// non-positive rather than dividing by zero — an account with no
    /// recorded peak has no drawdown to speak of yet.
    pub fn drawdown_pct(&self) -> f64 {
        if self.peak_equity <= 0.0 {
            return 0.0;
        }
        ((self.peak_equity - self.current_equity) / self.peak_equity) * 100.0
    }
}

impl RiskCheck for CheckDrawdownBelow {
    type Input = EquityCurve;
    type Error = DrawdownExceeded;

    fn name() -> &'static str {
        "CheckDrawdownBelow"
    }

    fn check(&self, curve: &Self::Input) -> Result<(), Self::Error> {
        let drawdown_pct = curve.drawdown_pct();
        if drawdown_pct > self.max_drawdown_pct {
            Err(DrawdownExceeded {
                drawdown_pct,
                max_drawdown_pct: self.max_drawdown_pct,
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("drawdown {drawdown_pct:.2}% exceeds cap {max_drawdown_pct:.2}%")]
pub struct DrawdownExceeded {
    pub drawdown_pct: f64,
    pub max_drawdown_pct: f64,
}

/// Input to [`CheckCorrelationBelow`]: the candidate symbol and the
/// symbols of every currently open position. Owned rather than
/// borrowed so `RiskCheck::Input` stays a plain associated type (no
/// GAT needed for this one check alone).
#[derive(Debug, Clone, Constructor)]
pub struct CorrelationCheckInput {
    pub candidate: Symbol,
    pub open_symbols: Vec<Symbol>,
}

/// Rejects a new position if its correlation with any open position,
/// per the configured [`CorrelationOracle`], exceeds `threshold`
/// (§4.5 "Correlation cap").
pub struct CheckCorrelationBelow<O> {
    pub oracle: O,
    pub threshold: f64,
}

impl<O> CheckCorrelationBelow<O> {
    pub fn new(oracle: O, threshold: f64) -> Self {
        Self { oracle, threshold }
    }
}

impl<O: CorrelationOracle> RiskCheck for CheckCorrelationBelow<O> {
    type Input = CorrelationCheckInput;
    type Error = CorrelationExceeded;

    fn name() -> &'static str {
        "CheckCorrelationBelow"
    }

    fn check(&self, input: &Self::Input) -> Result<(), Self::Error> {
        for other in &input.open_symbols {
            let correlation = self.oracle.correlation(&input.candidate, other);
            if correlation > self.threshold {
                return Err(CorrelationExceeded {
                    candidate: input.candidate.clone(),
                    correlated_with: other.clone(),
                    correlation,
                    threshold: self.threshold,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{candidate} correlates {correlation:.2} with open position {correlated_with} (threshold {threshold:.2})")]
pub struct CorrelationExceeded {
    pub candidate: Symbol,
    pub correlated_with: Symbol,
    pub correlation: f64,
    pub threshold: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::SharedCurrencyHeuristic;

    #[test]
    fn check_higher_than_rejects_above_limit() {
        let check = CheckHigherThan::new(5.0_f64);
        assert!(check.check(&6.0).is_err());
        assert!(check.check(&5.0).is_ok());
    }

    #[test]
    fn loss_cap_rejects_at_or_above_cap() {
        let check = CheckWithinLossCap::new(LossCapPeriod::Daily, 3.0);
        assert!(check.check(&3.0).is_err());
        assert!(check.check(&2.99).is_ok());
    }

    #[test]
    fn drawdown_check_uses_peak_relative_percentage() {
        let check = CheckDrawdownBelow::new(20.0);
        let curve = EquityCurve::new(10_000.0, 7_500.0);
        assert!(check.check(&curve).is_err());
        let curve = EquityCurve::new(10_000.0, 9_000.0);
        assert!(check.check(&curve).is_ok());
    }

    #[test]
    fn correlation_check_rejects_shared_currency_pair() {
        let check = CheckCorrelationBelow::new(SharedCurrencyHeuristic, 0.5);
        let eurusd = Symbol::new("EURUSD");
        let gbpusd = Symbol::new("GBPUSD");
        let input = CorrelationCheckInput::new(eurusd, vec![gbpusd]);
        assert!(check.check(&input).is_err());
    }
}
