#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Instrument
//!
//! Symbol, timeframe, candle, killzone, and venue-identity vocabulary
//! shared by `confluence-pattern`, `confluence-analytics`, and
//! `confluence-broker`.
//!
//! This crate carries no live broker connection machinery: `ExchangeId`
//! and `Exchange` are the static identifier a symbol/signal/order is
//! tagged with, not the connection itself — the narrow slice of
//! market-data vocabulary the analytics pipeline needs to stay
//! broker-agnostic (§6 "the core expects an interface supplying...";
//! broker specifics are an external collaborator, out of scope).

pub mod candle;
pub mod exchange;
pub mod killzone;
pub mod side;
pub mod symbol;
pub mod timeframe;

pub use candle::{Candle, CandleWindow};
pub use exchange::{B3Exchange, Exchange, ExchangeId, MockExchange};
pub use killzone::Killzone;
pub use side::Side;
pub use symbol::Symbol;
pub use timeframe::Timeframe;
