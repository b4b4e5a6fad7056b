//! Recovery actions: the default catalogue (§4.2) plus the registry
//! third-party code extends at startup.

use crate::failure::FailureKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// How disruptive an action is. Dispatch ranks eligible actions by
/// severity ascending — `Soft` first — so the engine always tries the
/// least invasive remedy before escalating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Severity {
    Soft,
    Medium,
    Hard,
    Emergency,
}

/// Outcome of running a [`RecoveryAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ActionOutcome {
    Success,
    Failure,
}

/// An executable remedy for one or more [`FailureKind`]s.
///
/// Implementors never panic across this boundary: a remedy that itself
/// fails returns `ActionOutcome::Failure` rather than propagating an
/// error, matching the Component contract's propagation policy.
#[async_trait]
pub trait RecoveryAction: Send + Sync {
    /// Stable id used for cooldown/attempt bookkeeping and persistence.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn severity(&self) -> Severity;

    /// Failure kinds this action is registered against.
    fn failure_kinds(&self) -> &[FailureKind];

    fn max_attempts(&self) -> u32;

    fn cooldown(&self) -> Duration;

    fn timeout(&self) -> Duration;

    /// Other action ids that must not currently be in-flight before this
    /// one is eligible.
    fn prerequisites(&self) -> &[String] {
        &[]
    }

    /// Executes the remedy. The engine enforces `timeout()` externally;
    /// this future is abandoned (not force-cancelled) if it runs over.
    async fn execute(&self, failure: FailureKind) -> ActionOutcome;

    /// Optional post-condition probe run after `execute` reports success,
    /// to confirm the failure condition actually cleared (§4.2 "Success
    /// is determined by (a) the action's return value and (b) optional
    /// success_criteria probe").
    async fn success_criteria(&self) -> bool {
        true
    }
}

impl fmt::Debug for dyn RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryAction")
            .field("id", &self.id())
            .field("severity", &self.severity())
            .finish_non_exhaustive()
    }
}

/// A named async closure wired up as a [`RecoveryAction`]. Lets the
/// default catalogue and tests register remedies without a bespoke type
/// per action.
pub struct ClosureAction<F> {
    id: String,
    name: String,
    severity: Severity,
    failure_kinds: Vec<FailureKind>,
    max_attempts: u32,
    cooldown: Duration,
    timeout: Duration,
    prerequisites: Vec<String>,
    run: F,
}

impl<F> ClosureAction<F>
where
    F: Fn(FailureKind) -> ActionOutcome + Send + Sync,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        severity: Severity,
        failure_kinds: Vec<FailureKind>,
        max_attempts: u32,
        cooldown: Duration,
        timeout: Duration,
        run: F,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            severity,
            failure_kinds,
            max_attempts,
            cooldown,
            timeout,
            prerequisites: Vec::new(),
            run,
        }
    }

    pub fn with_prerequisites(mut self, prerequisites: Vec<String>) -> Self {
        self.prerequisites = prerequisites;
        self
    }
}

#[async_trait]
impl<F> RecoveryAction for ClosureAction<F>
where
    F: Fn(FailureKind) -> ActionOutcome + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn failure_kinds(&self) -> &[FailureKind] {
        &self.failure_kinds
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    async fn execute(&self, failure: FailureKind) -> ActionOutcome {
        (self.run)(failure)
    }
}

/// Registry of known actions, keyed by id. Populated with the default
/// catalogue at startup; third-party code may register more via
/// [`ActionRegistry::register`].
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<std::sync::Arc<dyn RecoveryAction>>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("action_count", &self.actions.len())
            .finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: std::sync::Arc<dyn RecoveryAction>) {
        self.actions.push(action);
    }

    /// Actions registered against `kind`, in no particular order; the
    /// dispatcher sorts by severity.
    pub fn actions_for(&self, kind: FailureKind) -> Vec<std::sync::Arc<dyn RecoveryAction>> {
        self.actions
            .iter()
            .filter(|a| a.failure_kinds().contains(&kind))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> &[std::sync::Arc<dyn RecoveryAction>] {
        &self.actions
    }

    pub fn ids(&self) -> HashSet<String> {
        self.actions.iter().map(|a| a.id().to_string()).collect()
    }
}

/// Builds the default action catalogue (§4.2 table). Side effects are
/// stubbed as no-ops that always succeed; a deployment registers real
/// broker/process/OS hooks over these ids via
/// [`ActionRegistry::register`], keeping the same id so cooldown history
/// survives the swap.
pub fn default_actions() -> Vec<std::sync::Arc<dyn RecoveryAction>> {
    use FailureKind::*;
    use Severity::*;

    let reconnect_broker = ClosureAction::new(
        "reconnect-broker",
        "Reconnect broker",
        Soft,
        vec![BrokerConnectionLost],
        5,
        Duration::from_secs(30),
        Duration::from_secs(15),
        |_| ActionOutcome::Success,
    );

    let free_memory = ClosureAction::new(
        "free-memory",
        "Free memory",
        Soft,
        vec![HighMemoryUsage],
        5,
        Duration::from_secs(60),
        Duration::from_secs(10),
        |_| ActionOutcome::Success,
    );

    let restore_network = ClosureAction::new(
        "restore-network",
        "Restore network",
        Medium,
        vec![InternetDisconnected],
        3,
        Duration::from_secs(60),
        Duration::from_secs(20),
        |_| ActionOutcome::Success,
    );

    let restart_process = ClosureAction::new(
        "restart-process",
        "Restart process",
        Medium,
        vec![TradingEngineStuck, SystemFreeze],
        3,
        Duration::from_secs(120),
        Duration::from_secs(30),
        |_| ActionOutcome::Success,
    );

    let emergency_close_positions = ClosureAction::new(
        "emergency-close-positions",
        "Emergency close positions",
        Hard,
        vec![LowMarginLevel],
        3,
        Duration::from_secs(30),
        Duration::from_secs(10),
        |_| ActionOutcome::Success,
    );

    let disk_cleanup = ClosureAction::new(
        "disk-cleanup",
        "Disk cleanup",
        Soft,
        vec![DiskFull],
        5,
        Duration::from_secs(300),
        Duration::from_secs(30),
        |_| ActionOutcome::Success,
    );

    vec![
        std::sync::Arc::new(reconnect_broker),
        std::sync::Arc::new(free_memory),
        std::sync::Arc::new(restore_network),
        std::sync::Arc::new(restart_process),
        std::sync::Arc::new(emergency_close_positions),
        std::sync::Arc::new(disk_cleanup),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalogue_covers_every_source_trigger() {
        let registry_actions = default_actions();
        let mut catalogue = ActionRegistry::new();
        for action in registry_actions {
            catalogue.register(action);
        }

        assert!(!catalogue.actions_for(FailureKind::BrokerConnectionLost).is_empty());
        assert!(!catalogue.actions_for(FailureKind::LowMarginLevel).is_empty());
        assert!(!catalogue.actions_for(FailureKind::DiskFull).is_empty());
    }

    #[test]
    fn emergency_close_positions_is_hard_severity() {
        let actions = default_actions();
        let found = actions.iter().find(|a| a.id() == "emergency-close-positions").unwrap();
        assert_eq!(found.severity(), Severity::Hard);
    }
}
