//! `ConfluenceConfig`: the strongly-typed configuration tree spec §6
//! describes (`monitoring`, `recovery`, `persistence`, `risk`,
//! `analytics`), aggregated one level above the subsystem crates so none
//! of them depends on the others' config type (Design Note §9:
//! "strongly-typed config struct, loaded once").
//!
//! Concrete config-file/environment loading is an external collaborator
//! (spec §1 Non-goals "configuration file loaders") — this struct is the
//! typed destination such a loader would populate; `main.rs` just uses
//! `ConfluenceConfig::default()`.

use confluence_analytics::AnalyticsConfig;
use confluence_coordinator::CoordinatorConfig;
use confluence_integrator::IntegratorConfig;
use confluence_persistence::PersistenceConfig;
use confluence_recovery::RecoveryConfig;
use confluence_risk::RiskConfig;

/// The platform's top-level configuration, one field per spec §6 section.
#[derive(Debug, Clone, Default)]
pub struct ConfluenceConfig {
    pub monitoring: CoordinatorConfig,
    pub recovery: RecoveryConfig,
    pub persistence: PersistenceConfig,
    pub risk: RiskConfig,
    pub analytics: AnalyticsConfig,
    pub integrator: IntegratorConfig,
}
