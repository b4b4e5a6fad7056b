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

//! # Risk
//!
//! The pre-execution risk gate (§4.5): a pluggable [`RiskGate`] trait
//! evaluating a synthesized [`TradingSignal`] against [`RiskConfig`]
//! before the signal is allowed to reach `confluence-broker`'s
//! execution adapter.
//!
//! ## Layout
//!
//! - [`signal`] — `TradingSignal`, the gate's input vocabulary (§3
//!   "Trading signal").
//! - [`config`] — `RiskConfig`, mapping to spec §6's `risk` block.
//! - [`correlation`] — the pluggable `CorrelationOracle` seam and its
//!   default `SharedCurrencyHeuristic`.
//! - [`check`] — individual composable [`check::RiskCheck`]
//!   implementations (max position count, per-symbol volume,
//!   correlation, drawdown, loss caps), each reporting its own typed
//!   rejection reason.
//! - [`gate`] — `RiskGate`/`DefaultRiskGate`, composing the checks above
//!   into one `RiskDecision`.

pub mod check;
pub mod config;
pub mod correlation;
pub mod gate;
pub mod signal;

pub use check::RiskCheck;
pub use config::RiskConfig;
pub use correlation::{CorrelationOracle, SharedCurrencyHeuristic};
pub use gate::{action_from_side, DefaultRiskGate, OpenPosition, PortfolioSnapshot, RiskDecision, RiskGate, RiskLevel};
pub use signal::{Action, TradingSignal};
