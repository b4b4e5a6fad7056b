//! `MockBrokerAdapter`: an in-memory [`BrokerAdapter`], grounded on the
//! teacher's `MockTransport` test double — connect/disconnect always
//! succeed, orders are filled at the requested (or last-tick) price
//! with a small simulated slippage, and positions/ticks are seeded by
//! the caller rather than streamed from a venue.

use crate::adapter::BrokerAdapter;
use crate::error::BrokerError;
use crate::types::{AccountInfo, CandleRequest, ClosePositionResult, ExecutionResult, OrderRequest, Position, SymbolTick};
use async_trait::async_trait;
use confluence_instrument::{Candle, Symbol};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct MockBrokerAdapter {
    connected: AtomicBool,
    account: RwLock<AccountInfo>,
    ticks: RwLock<HashMap<Symbol, SymbolTick>>,
    candles: RwLock<HashMap<Symbol, Vec<Candle>>>,
    positions: Mutex<Vec<Position>>,
    next_ticket: Mutex<u64>,
    slippage_pips: f64,
}

impl Default for MockBrokerAdapter {
    fn default() -> Self {
        Self::new(AccountInfo::new(10_000.0, 10_000.0, 0.0, 0.0, "USD".to_string()))
    }
}

impl MockBrokerAdapter {
    pub fn new(account: AccountInfo) -> Self {
        Self {
            connected: AtomicBool::new(false),
            account: RwLock::new(account),
            ticks: RwLock::new(HashMap::new()),
            candles: RwLock::new(HashMap::new()),
            positions: Mutex::new(Vec::new()),
            next_ticket: Mutex::new(1),
            slippage_pips: 0.2,
        }
    }

    pub fn seed_tick(&self, symbol: Symbol, tick: SymbolTick) {
        self.ticks.write().insert(symbol, tick);
    }

    pub fn seed_candles(&self, symbol: Symbol, candles: Vec<Candle>) {
        self.candles.write().insert(symbol, candles);
    }

    pub fn set_account(&self, account: AccountInfo) {
        *self.account.write() = account;
    }

    fn mint_ticket(&self) -> String {
        let mut next = self.next_ticket.lock();
        let ticket = format!("MOCK-{}", *next);
        *next += 1;
        ticket
    }
}

#[async_trait]
impl BrokerAdapter for MockBrokerAdapter {
    async fn connect(&self) -> Result<(), BrokerError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn account_info(&self) -> Result<AccountInfo, BrokerError> {
        if !self.is_connected().await {
            return Err(BrokerError::NotConnected);
        }
        Ok(*self.account.read())
    }

    async fn symbol_tick(&self, symbol: &Symbol) -> Result<SymbolTick, BrokerError> {
        self.ticks
            .read()
            .get(symbol)
            .copied()
            .ok_or_else(|| BrokerError::UnknownTicket(symbol.as_str().to_string()))
    }

    async fn candles(&self, symbol: &Symbol, request: CandleRequest) -> Result<Vec<Candle>, BrokerError> {
        let stored = self.candles.read().get(symbol).cloned().unwrap_or_default();
        let from = stored.len().saturating_sub(request.count);
        Ok(stored[from..].to_vec())
    }

    async fn open_positions(&self) -> Result<Vec<Position>, BrokerError> {
        Ok(self.positions.lock().clone())
    }

    async fn close_position(&self, ticket: &str) -> Result<ClosePositionResult, BrokerError> {
        let mut positions = self.positions.lock();
        let before = positions.len();
        positions.retain(|position| position.ticket != ticket);
        if positions.len() == before {
            return Ok(ClosePositionResult::new(false, format!("unknown ticket {ticket}")));
        }
        Ok(ClosePositionResult::new(true, "closed".to_string()))
    }

    async fn place_order(&self, request: OrderRequest) -> Result<ExecutionResult, BrokerError> {
        if !self.is_connected().await {
            return Err(BrokerError::NotConnected);
        }
        let reference_price = request
            .entry
            .or_else(|| self.ticks.read().get(&request.symbol).map(|tick| tick.mid()));
        let Some(price) = reference_price else {
            return Ok(ExecutionResult::rejected("no reference price available", 0));
        };

        let ticket = self.mint_ticket();
        self.positions.lock().push(Position {
            ticket: ticket.clone(),
            symbol: request.symbol,
            side: request.side,
            volume: request.volume,
            open_price: price,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            unrealized_pnl: 0.0,
            opened_at: chrono::Utc::now(),
        });

        Ok(ExecutionResult::filled(ticket, price, self.slippage_pips, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_instrument::Side;

    fn symbol() -> Symbol {
        Symbol::new("EURUSD")
    }

    #[tokio::test]
    async fn place_order_requires_connection() {
        let broker = MockBrokerAdapter::default();
        let request = OrderRequest::new(symbol(), Side::Buy, 1.0, Some(1.1000), None, None, "test".to_string());
        assert_eq!(broker.place_order(request).await, Err(BrokerError::NotConnected));
    }

    #[tokio::test]
    async fn place_order_opens_a_position_at_entry_price() {
        let broker = MockBrokerAdapter::default();
        broker.connect().await.unwrap();
        let request = OrderRequest::new(symbol(), Side::Buy, 1.0, Some(1.1000), None, None, "test".to_string());

        let result = broker.place_order(request).await.unwrap();
        assert!(result.success);
        assert_eq!(result.executed_price, Some(1.1000));

        let positions = broker.open_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].symbol, symbol());
    }

    #[tokio::test]
    async fn place_order_falls_back_to_seeded_tick_mid_price() {
        let broker = MockBrokerAdapter::default();
        broker.connect().await.unwrap();
        broker.seed_tick(symbol(), SymbolTick::new(1.0998, 1.1002, 1.1000, chrono::Utc::now()));

        let request = OrderRequest::new(symbol(), Side::Buy, 1.0, None, None, None, "test".to_string());
        let result = broker.place_order(request).await.unwrap();
        assert_eq!(result.executed_price, Some(1.1000));
    }

    #[tokio::test]
    async fn close_position_removes_it() {
        let broker = MockBrokerAdapter::default();
        broker.connect().await.unwrap();
        let request = OrderRequest::new(symbol(), Side::Buy, 1.0, Some(1.1000), None, None, "test".to_string());
        let result = broker.place_order(request).await.unwrap();

        let close = broker.close_position(&result.ticket.unwrap()).await.unwrap();
        assert!(close.success);
        assert!(broker.open_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn candles_returns_only_the_requested_tail() {
        let broker = MockBrokerAdapter::default();
        let candles: Vec<Candle> = (0..10)
            .map(|i| Candle {
                time: chrono::Utc::now(),
                open: i as f64,
                high: i as f64,
                low: i as f64,
                close: i as f64,
                volume: None,
            })
            .collect();
        broker.seed_candles(symbol(), candles);

        let tail = broker.candles(&symbol(), CandleRequest::new(confluence_instrument::Timeframe::M1, 3)).await.unwrap();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].close, 7.0);
    }
}
