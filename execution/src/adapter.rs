//! `BrokerAdapter` and `ExecutionAdapter`: the two external collaborators
//! the core consumes (§6). Concrete venue wiring (ProfitDLL, B3, Binance,
//! or any other protocol) is the implementer's concern and out of scope
//! here — this crate only names the interface and ships a
//! [`crate::mock::MockBrokerAdapter`] test double.

use crate::error::BrokerError;
use crate::types::{AccountInfo, CandleRequest, ClosePositionResult, ExecutionResult, OrderRequest, Position, SymbolTick};
use async_trait::async_trait;
use confluence_instrument::{Candle, Symbol};

/// Market data + account/position surface a broker integration supplies.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    async fn connect(&self) -> Result<(), BrokerError>;

    async fn disconnect(&self) -> Result<(), BrokerError>;

    async fn is_connected(&self) -> bool;

    async fn account_info(&self) -> Result<AccountInfo, BrokerError>;

    async fn symbol_tick(&self, symbol: &Symbol) -> Result<SymbolTick, BrokerError>;

    async fn candles(&self, symbol: &Symbol, request: CandleRequest) -> Result<Vec<Candle>, BrokerError>;

    async fn open_positions(&self) -> Result<Vec<Position>, BrokerError>;

    async fn close_position(&self, ticket: &str) -> Result<ClosePositionResult, BrokerError>;

    async fn place_order(&self, request: OrderRequest) -> Result<ExecutionResult, BrokerError>;
}

/// The narrower execution-only surface the integrator hands approved
/// `TradingSignal`s to. Kept distinct from [`BrokerAdapter`] per §6
/// ("execution engine adapter" is a separate consumed interface) —
/// a venue may supply market data through one channel and order
/// routing through another.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    async fn execute_order(&self, request: OrderRequest) -> Result<ExecutionResult, BrokerError>;
}

/// Every [`BrokerAdapter`] is trivially also an [`ExecutionAdapter`]
/// (routing orders through `place_order`); implementors that need a
/// distinct execution venue can still implement `ExecutionAdapter`
/// independently.
#[async_trait]
impl<T: BrokerAdapter> ExecutionAdapter for T {
    async fn execute_order(&self, request: OrderRequest) -> Result<ExecutionResult, BrokerError> {
        self.place_order(request).await
    }
}
