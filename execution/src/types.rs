//! Wire types exchanged with a [`crate::adapter::BrokerAdapter`] /
//! [`crate::adapter::ExecutionAdapter`] (§6 "External interfaces").

use chrono::{DateTime, Utc};
use confluence_instrument::{Side, Symbol, Timeframe};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// `AccountInfo() -> {balance, equity, margin, margin_level, currency}`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct AccountInfo {
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub margin_level: f64,
    pub currency: String,
}

impl AccountInfo {
    /// `margin_level` is undefined (and meaningless) with no margin in
    /// use; callers that divide by it should treat this as "infinite
    /// headroom" rather than propagating a divide-by-zero.
    pub fn margin_level_or(&self, fallback: f64) -> f64 {
        if self.margin <= 0.0 {
            fallback
        } else {
            self.margin_level
        }
    }
}

/// `SymbolTick(symbol) -> {bid, ask, last, time}`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct SymbolTick {
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub time: DateTime<Utc>,
}

impl SymbolTick {
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// A single open position as reported by `OpenPositions()`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Position {
    pub ticket: String,
    pub symbol: Symbol,
    pub side: Side,
    pub volume: f64,
    pub open_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub unrealized_pnl: f64,
    pub opened_at: DateTime<Utc>,
}

/// `ClosePosition(ticket) -> {success, message}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct ClosePositionResult {
    pub success: bool,
    pub message: String,
}

/// `PlaceOrder(request) -> {success, ticket, executed_price, slippage, error?}`
/// and `ExecuteOrder(orderRequest) -> ExecutionResult` share the same
/// request shape: symbol, side, volume, entry/SL/TP, comment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub volume: f64,
    pub entry: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub comment: String,
}

/// Result of `PlaceOrder`/`ExecuteOrder`: ticket, executed_price,
/// slippage_pips, duration_ms, error.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub ticket: Option<String>,
    pub executed_price: Option<f64>,
    pub slippage_pips: Option<f64>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn filled(ticket: impl Into<String>, executed_price: f64, slippage_pips: f64, duration_ms: u64) -> Self {
        Self {
            success: true,
            ticket: Some(ticket.into()),
            executed_price: Some(executed_price),
            slippage_pips: Some(slippage_pips),
            duration_ms,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            ticket: None,
            executed_price: None,
            slippage_pips: None,
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// `Candles(symbol, timeframe, count) -> ohlcv[]` request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor)]
pub struct CandleRequest {
    pub timeframe: Timeframe,
    pub count: usize,
}
