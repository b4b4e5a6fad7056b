#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Production Coordinator
//!
//! Component lifecycle and health supervision (§4.1). Components
//! implementing `confluence_core::Component` are [`register`](ProductionCoordinator::register)ed
//! with a priority; `start` initializes then starts them in
//! ascending-priority groups (components sharing a priority run
//! concurrently within their group, per the `ComponentPriorityGroup`
//! supplement), `stop` tears them down in reverse order.
//!
//! A cancellation-aware monitor loop (default 10s) polls component health
//! and recomputes `overall_state`; a heartbeat loop (default 5s) updates
//! liveness; both stop promptly on `stop`/`emergency_stop` via a shared
//! `CancellationToken`. Snapshots flush through `confluence-persistence`
//! on every transition and on `metrics_persistence_interval`.
//!
//! ## Layout
//!
//! - [`config`] — `CoordinatorConfig`.
//! - [`registry`] — `ComponentRegistry`, priority grouping.
//! - [`state`] — the `overall_state` transition function and the
//!   panic-contained callback registry.
//! - [`coordinator`] — `ProductionCoordinator` itself.

pub mod config;
pub mod coordinator;
pub mod registry;
pub mod state;

pub use config::CoordinatorConfig;
pub use coordinator::ProductionCoordinator;
pub use registry::{ComponentEntry, ComponentRegistry, DuplicateComponent};
pub use state::{next_overall_state, TransitionCallbacks};
