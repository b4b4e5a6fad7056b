#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Core
//!
//! Shared vocabulary for the Confluence platform: the error taxonomy, the
//! component lifecycle contract, health/state snapshots, the persistence
//! `Record` unit, id minting, shutdown signaling, and `tracing`
//! initialisation.
//!
//! This crate carries no business logic of its own. The production
//! coordinator, the auto-recovery engine, the persistence layer and the
//! analytics pipeline all depend on it so that e.g. a `ComponentHealth`
//! means the same thing everywhere it's read.
//!
//! ## Layout
//!
//! - [`component`] — the `Component` lifecycle trait every coordinator
//!   registrant implements.
//! - [`health`] — `ComponentState`, `ComponentHealth`, `OverallState`,
//!   `SystemHealth`.
//! - [`error`] — `ConfluenceError`, the platform's five-tier error taxonomy.
//! - [`record`] — `Record` and `RecordCategory`, the persistence unit.
//! - [`ids`] — process-local monotonic id minting.
//! - [`shutdown`] — graceful shutdown traits and the `Shutdown` marker.
//! - [`logging`] — standardized `tracing` subscriber initialisation.

/// The uniform component lifecycle/health interface every coordinator
/// registrant implements.
pub mod component;

/// Central error type aggregating the platform's error taxonomy.
pub mod error;

/// Component and system health snapshot types.
pub mod health;

/// Process-local, lock-free id minting.
pub mod ids;

/// Standardized `tracing` initialisation.
pub mod logging;

/// The persistence unit (`Record`) and its category newtype.
pub mod record;

/// Traits and types for managing graceful component shutdown.
pub mod shutdown;

pub use component::Component;
pub use error::ConfluenceError;
pub use health::{unavailable_ratio, ComponentHealth, ComponentState, OverallState, SystemHealth};
pub use ids::mint_id;
pub use record::{Record, RecordCategory};
pub use shutdown::Shutdown;

use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// A value paired with the UTC instant it was observed or computed.
///
/// Used throughout the analytics pipeline (confluence scores, structure
/// analyses, pattern performance snapshots) to keep a value's staleness
/// inspectable without a separate lookup.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Timed<T> {
    pub value: T,
    pub time: DateTime<Utc>,
}

impl<T> Timed<T> {
    /// Elapsed time between `self.time` and `now`. Negative if `now`
    /// predates the value, which callers treat as zero staleness rather
    /// than an error — clocks can disagree slightly across components.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_age_is_non_negative_for_past_timestamps() {
        let now = Utc::now();
        let timed = Timed::new(42, now - chrono::Duration::seconds(5));
        assert!(timed.age(now) >= chrono::Duration::seconds(5));
    }
}
