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

//! # Integrator
//!
//! Wires a [`confluence_broker::BrokerAdapter`] into the analytics
//! pipeline (§4.4) and risk gate (§4.5), and routes approved signals to
//! a [`confluence_broker::ExecutionAdapter`] — the component that turns
//! the rest of the platform's analysis into actual order flow.

pub mod config;
pub mod integrator;

pub use config::IntegratorConfig;
pub use integrator::ConfluenceIntegrator;
