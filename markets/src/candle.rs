//! OHLCV candle, the unit the analytics pipeline and pattern scorers
//! consume (§4.4 "Input: a candle window").

use crate::{Symbol, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Candle {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// A bounded window of candles for one symbol/timeframe, the confluence
/// and market-structure engines' shared input shape.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CandleWindow {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
}

impl CandleWindow {
    pub fn new(symbol: Symbol, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        Self { symbol, timeframe, candles }
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }
}
