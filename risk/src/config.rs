//! `RiskConfig`, mapping 1:1 to spec §6's `risk` configuration block.

use serde::{Deserialize, Serialize};

/// Strongly-typed risk parameters (Design Note §9: "thresholds stored
/// as typed fields, never as free-form maps at runtime").
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RiskConfig {
    pub max_risk_per_trade_pct: f64,
    pub max_positions: u32,
    pub max_volume_per_symbol: f64,
    pub max_drawdown_pct: f64,
    pub daily_loss_cap: f64,
    pub weekly_loss_cap: f64,
    pub monthly_loss_cap: f64,
    pub correlation_threshold: f64,
}

impl Default for RiskConfig {
    /// Defaults follow §4.5/§6 where a concrete number is given. Where
    /// only a range is given ("max concurrent positions: default 3-5")
    /// or no number at all (drawdown/loss caps), a value is chosen here
    /// and recorded as an Open Question resolution in DESIGN.md rather
    /// than left unconfigured.
    fn default() -> Self {
        Self {
            max_risk_per_trade_pct: 1.5,
            max_positions: 5,
            max_volume_per_symbol: 10.0,
            max_drawdown_pct: 20.0,
            daily_loss_cap: 3.0,
            weekly_loss_cap: 6.0,
            monthly_loss_cap: 10.0,
            correlation_threshold: 0.75,
        }
    }
}
