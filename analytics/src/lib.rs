#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Analytics
//!
//! The confluence-analysis pipeline (§4.4): five stages, each its own
//! module.
//!
//! - [`engine`] — `ConfluenceEngine`, the pattern-confluence scorer with
//!   a per-`(symbol, timeframe)` TTL cache.
//! - [`structure`] — `MarketStructureEngine`, swing-point detection and
//!   trend/phase/S-R classification.
//! - [`signal`] — `SignalSynthesizer`, the threshold gate producing
//!   `TradeSetup`s.
//! - [`learning`] — `PatternLearningSystem`, write-once outcome tracking
//!   rolled into per-pattern-kind performance.
//! - [`bus`] — `AnalyticsEventBus`, the bounded batched publish/subscribe
//!   channel every stage reports through.
//!
//! [`metric`] carries the platform's `win_rate`/`profit_factor`
//! calculations, reused by the learning system's performance rollup.

pub mod bus;
pub mod config;
pub mod engine;
pub mod learning;
pub mod metric;
pub mod signal;
pub mod structure;
pub mod time;
pub mod types;

pub use bus::{AnalyticsEventBus, BusConfig};
pub use config::AnalyticsConfig;
pub use engine::{ConfluenceEngine, SessionStats};
pub use learning::PatternLearningSystem;
pub use signal::SignalSynthesizer;
pub use structure::{MarketStructureEngine, StructureEngineConfig};
pub use types::*;
