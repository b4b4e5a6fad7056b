//! The component contract every coordinator-registered component must
//! implement (§4.1). Expressed as an explicit async trait rather than the
//! duck typing of the source system, per the re-architecture guidance.

use crate::error::ConfluenceError;
use crate::health::ComponentHealth;
use async_trait::async_trait;

/// Uniform lifecycle + health interface for anything the
/// `confluence-coordinator` supervises.
///
/// Implementors never panic across this boundary: every method returns a
/// `Result`, and a component that fails internally should surface that as
/// `Ok(false)` from `initialize`/`start`/`stop` plus a degraded
/// `HealthCheck`, or as an `Err` only for truly exceptional conditions
/// (e.g. the health probe itself could not run).
#[async_trait]
pub trait Component: Send + Sync {
    /// Stable name used as the registry key and in every health/event record.
    fn name(&self) -> &str;

    /// One-time setup. Called in ascending-priority order during `Start`.
    async fn initialize(&self) -> Result<bool, ConfluenceError>;

    /// Begin normal operation. Called in ascending-priority order after
    /// every component has initialized.
    async fn start(&self) -> Result<bool, ConfluenceError>;

    /// Graceful (or, if `emergency`, bounded) shutdown. Called in
    /// descending-priority order.
    async fn stop(&self, emergency: bool) -> Result<bool, ConfluenceError>;

    /// Point-in-time health snapshot, invoked under the coordinator's
    /// health-check timeout budget.
    async fn health_check(&self) -> ComponentHealth;
}
