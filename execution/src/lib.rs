#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Broker
//!
//! The two external collaborators the core consumes (§6): a
//! [`BrokerAdapter`](adapter::BrokerAdapter) supplying market data,
//! account/position state, and order placement, and a narrower
//! [`ExecutionAdapter`](adapter::ExecutionAdapter) that just routes an
//! [`OrderRequest`](types::OrderRequest) to an
//! [`ExecutionResult`](types::ExecutionResult).
//!
//! This crate ships no concrete venue integration — ProfitDLL, B3,
//! Binance or any other protocol specifics are explicitly out of scope
//! (§1 Non-goals "brokerage protocol specifics") and are the
//! implementer's concern. What it does ship is
//! [`mock::MockBrokerAdapter`], an in-memory double used by
//! `confluence-coordinator`'s own test harness and by
//! `confluence-integrator`'s tests.

pub mod adapter;
pub mod error;
pub mod mock;
pub mod types;

pub use adapter::{BrokerAdapter, ExecutionAdapter};
pub use error::BrokerError;
pub use mock::MockBrokerAdapter;
pub use types::{AccountInfo, CandleRequest, ClosePositionResult, ExecutionResult, OrderRequest, Position, SymbolTick};
