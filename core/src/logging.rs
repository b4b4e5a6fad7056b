//! # Logging Configuration
//!
//! Standardized logging configuration for the Confluence platform. Provides
//! structured logs with a filter to reduce noise from high-frequency health
//! check spans, which would otherwise dominate INFO-level output given the
//! coordinator's 5-10s polling cadence.
//!
//! ## Features
//!
//! - **Configurable Output**: Human-readable or JSON format
//! - **Environment Filtering**: Uses `RUST_LOG` variable for levels
//! - **Health-Poll Noise Filter**: Removes repetitive per-component health spans
//! - **Default INFO Level**: Adjustable as needed
//!
//! ## Usage
//!
//! ### Standard Logging (human-readable)
//! ```rust,ignore
//! use confluence_core::logging::init_logging;
//!
//! fn main() {
//!     init_logging();
//!     tracing::info!("confluence platform started");
//! }
//! ```
//!
//! ### JSON Logging (aggregators / observability)
//! ```rust,ignore
//! use confluence_core::logging::init_json_logging;
//!
//! fn main() {
//!     init_json_logging();
//!     tracing::info!("confluence platform started");
//! }
//! ```
//!
//! ### Environment Configuration
//! ```bash
//! # Debug level for all modules
//! export RUST_LOG=debug
//!
//! # Per-crate levels
//! export RUST_LOG=confluence_coordinator=info,confluence_recovery=debug
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Name of the tracing span wrapped around each per-component health-check
/// poll in `confluence-coordinator`. Filtered out of default logging output;
/// still visible to any non-fmt layer that wants to observe it.
pub const HEALTH_POLL_SPAN_NAME: &str = "component_health_poll";

/// Initialises standard (non-JSON) logging.
///
/// Filters the repetitive health-poll span so normal operation stays
/// readable at INFO level.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(HealthPollSpanFilter)
        .init()
}

/// Initialises JSON logging, suitable for log aggregators.
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .with(HealthPollSpanFilter)
        .init()
}

struct HealthPollSpanFilter;

impl<S> tracing_subscriber::layer::Layer<S> for HealthPollSpanFilter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn event_enabled(
        &self,
        _: &tracing::Event<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        if let Some(span) = ctx.lookup_current() {
            span.name() != HEALTH_POLL_SPAN_NAME
        } else {
            true
        }
    }
}
