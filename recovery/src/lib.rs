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

//! # Auto-Recovery Engine
//!
//! Failure detection and bounded recovery action orchestration (§4.2).
//!
//! A detection loop runs the registered [`probes::Probe`] set on a fixed
//! interval; any probe reporting [`failure::ProbeResult::Bad`] adds its
//! [`failure::FailureKind`] to the current tick's active-failure set.
//! For each active failure, [`engine::RecoveryEngine`] ranks the
//! [`action::RecoveryAction`]s registered against it by severity
//! ascending and dispatches the first one whose [`attempt::RecoveryTracker`]
//! eligibility rules (attempt budget, cooldown, prerequisites, concurrency)
//! are satisfied.
//!
//! ## Layout
//!
//! - [`config`] — `RecoveryConfig`, the engine's tunables.
//! - [`failure`] — the closed `FailureKind` enumeration and `ProbeResult`.
//! - [`action`] — the `RecoveryAction` trait, the default action
//!   catalogue, and the action registry.
//! - [`attempt`] — `RecoveryAttempt` and the pure, `now`-parametrized
//!   `RecoveryTracker`.
//! - [`probes`] — the `Probe` trait and its concrete resource/network/
//!   broker/trading-health implementations.
//! - [`engine`] — `RecoveryEngine`, tying the above into the detection
//!   and dispatch loop.

pub mod action;
pub mod attempt;
pub mod config;
pub mod engine;
pub mod failure;
pub mod probes;

pub use action::{ActionOutcome, ActionRegistry, RecoveryAction, Severity};
pub use attempt::{AttemptStatus, RecoveryAttempt, RecoveryTracker};
pub use config::RecoveryConfig;
pub use engine::{EmergencyCloseReport, RecoveryEngine};
pub use failure::{FailureKind, ProbeResult};
pub use probes::{
    BrokerPing, BrokerProbe, EngineStuckProbe, MarginProbe, MarketDataStaleProbe, NetworkProbe,
    Probe, ResourceKind, ResourceProbe, ResourceSample, ResourceSampler, TradingHealthSample,
    TradingHealthSampler,
};
