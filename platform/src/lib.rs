//! # Confluence
//!
//! The process entrypoint for the platform: wires the production
//! coordinator, auto-recovery engine, persistence layer, analytics
//! pipeline, and integrator into one running system.
//!
//! Most of the actual behaviour lives one crate down — `confluence`
//! itself is thin. [`system::ConfluenceSystem`] is the one type callers
//! need: build it from a [`config::ConfluenceConfig`] and a broker/
//! execution adapter pair, then `run` it.

pub mod config;
pub mod health;
pub mod system;

pub use config::ConfluenceConfig;
pub use system::ConfluenceSystem;

// Flat re-exports of the subsystem crates, so a caller depending only on
// `confluence` can still reach every public type without adding ten more
// path dependencies.
pub use confluence_analytics as analytics;
pub use confluence_broker as broker;
pub use confluence_coordinator as coordinator;
pub use confluence_core as core;
pub use confluence_instrument as markets;
pub use confluence_integrator as integrator;
pub use confluence_pattern as pattern;
pub use confluence_persistence as persistence;
pub use confluence_recovery as recovery;
pub use confluence_risk as risk;
