//! Configuration for the integrator's polling loop.

use confluence_instrument::{Symbol, Timeframe};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct IntegratorConfig {
    /// Symbols the integrator polls each tick.
    pub symbols: Vec<Symbol>,
    pub timeframe: Timeframe,
    /// Candle window length requested from the broker per poll.
    pub candle_count: usize,
    /// How often the poll loop runs (distinct from the coordinator's own
    /// `monitoring_interval` — this is the pipeline's cadence, not a
    /// health check).
    pub poll_interval: Duration,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            timeframe: Timeframe::M15,
            candle_count: 200,
            poll_interval: Duration::from_secs(30),
        }
    }
}
