//! `RecoveryEngine` (§4.2): wires the probe set, the action registry,
//! and the attempt tracker into the detection/dispatch loop.

use crate::action::{ActionOutcome, ActionRegistry, RecoveryAction, Severity};
use crate::attempt::{AttemptStatus, RecoveryAttempt, RecoveryTracker};
use crate::config::RecoveryConfig;
use crate::failure::{FailureKind, ProbeResult};
use crate::probes::Probe;
use chrono::Utc;
use confluence_core::{mint_id, Record, RecordCategory};
use confluence_persistence::PersistenceStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// A status record enumerating which positions were closed, which
/// failed, and why (§7 "Emergency stop produces a status record...").
/// Supplemental type, grounded on `original_source/01-CORE/emergency`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmergencyCloseReport {
    pub triggered_at: chrono::DateTime<Utc>,
    pub reason: String,
    pub closed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Bounded, lock-protected history of recovery attempts and recent
/// active-failure snapshots, mirrored to persistence.
#[derive(Debug, Default)]
struct History {
    attempts: Vec<RecoveryAttempt>,
    active_failures: Vec<FailureKind>,
}

pub struct RecoveryEngine {
    config: RecoveryConfig,
    registry: ActionRegistry,
    tracker: Arc<RecoveryTracker>,
    probes: Vec<Arc<dyn Probe>>,
    history: RwLock<History>,
    persistence: Option<Arc<PersistenceStore>>,
    dispatched_total: AtomicU64,
    dropped_ineligible: AtomicU64,
    /// Bounds the number of recovery actions physically executing at
    /// once — the "Recovery worker pool (fixed size, default 3)" (§5),
    /// distinct from `RecoveryTracker`'s `max_concurrent_recoveries`
    /// eligibility budget.
    worker_pool: Arc<Semaphore>,
}

impl std::fmt::Debug for RecoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryEngine")
            .field("actions", &self.registry.all().len())
            .field("probes", &self.probes.len())
            .finish()
    }
}

impl RecoveryEngine {
    pub fn new(
        config: RecoveryConfig,
        registry: ActionRegistry,
        probes: Vec<Arc<dyn Probe>>,
        persistence: Option<Arc<PersistenceStore>>,
    ) -> Self {
        let worker_pool = Arc::new(Semaphore::new(config.worker_pool_size.max(1)));
        Self {
            config,
            registry,
            tracker: Arc::new(RecoveryTracker::new()),
            probes,
            history: RwLock::new(History::default()),
            persistence,
            dispatched_total: AtomicU64::new(0),
            dropped_ineligible: AtomicU64::new(0),
            worker_pool,
        }
    }

    pub fn tracker(&self) -> &Arc<RecoveryTracker> {
        &self.tracker
    }

    /// Registers an additional action (third-party code, §4.2).
    pub fn register_action(&mut self, action: Arc<dyn RecoveryAction>) {
        self.registry.register(action);
    }

    /// Runs the probe set once, returning the failures currently active.
    pub async fn run_probes(&self) -> Vec<FailureKind> {
        let mut active = Vec::new();
        for probe in &self.probes {
            match probe.check().await {
                ProbeResult::Bad(kind) => {
                    tracing::warn!(probe = probe.name(), failure = %kind, "probe reported failure");
                    active.push(kind);
                }
                ProbeResult::Unknown => {
                    tracing::debug!(probe = probe.name(), "probe dependency absent, treating as unknown");
                }
                ProbeResult::Healthy => {}
            }
        }
        self.history.write().active_failures = active.clone();
        active
    }

    /// §4.2 dispatch policy: for each active failure, rank eligible
    /// actions by severity ascending and spawn the first eligible one
    /// onto the bounded worker pool, so actions for distinct failures run
    /// concurrently (up to `worker_pool_size` at once, §5) rather than
    /// being awaited one at a time.
    pub async fn dispatch(self: &Arc<Self>, active_failures: &[FailureKind]) {
        let mut workers = Vec::with_capacity(active_failures.len());

        for &failure in active_failures {
            let mut candidates = self.registry.actions_for(failure);
            candidates.sort_by_key(|a| severity_rank(a.severity()));

            let Some(action) = candidates
                .into_iter()
                .find(|a| self.tracker.is_eligible(a.as_ref(), Utc::now(), self.config.max_concurrent_recoveries))
            else {
                self.dropped_ineligible.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(failure = %failure, "no eligible action for active failure");
                continue;
            };

            let engine = self.clone();
            workers.push(tokio::spawn(async move {
                let _permit = engine
                    .worker_pool
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("recovery worker pool semaphore is never closed");
                engine.run_action(action, failure).await;
            }));
        }

        for worker in workers {
            if let Err(error) = worker.await {
                tracing::error!(%error, "recovery worker task panicked");
            }
        }
    }

    async fn run_action(&self, action: Arc<dyn RecoveryAction>, failure: FailureKind) {
        let now = Utc::now();
        let attempt_number = self.tracker.total_attempts(action.id()) + 1;
        self.tracker.begin(action.id(), now);
        self.dispatched_total.fetch_add(1, Ordering::Relaxed);

        let mut attempt = RecoveryAttempt {
            id: mint_id("recovery"),
            action_id: action.id().to_string(),
            failure_kind: failure,
            started_at: now,
            status: AttemptStatus::InProgress,
            duration_ms: None,
            metrics_before: HashMap::new(),
            metrics_after: HashMap::new(),
            attempt_number,
        };

        let started = Instant::now();
        let action_id = action.id().to_string();
        let severity = action.severity();
        let run = tokio::time::timeout(action.timeout(), action.execute(failure)).await;

        let (status, outcome) = match run {
            Ok(ActionOutcome::Success) if action.success_criteria().await => {
                (AttemptStatus::Success, ActionOutcome::Success)
            }
            Ok(_) => (AttemptStatus::Failed, ActionOutcome::Failure),
            Err(_) => (AttemptStatus::Timeout, ActionOutcome::Failure),
        };

        attempt.finish(status, started.elapsed().as_millis() as u64, HashMap::new());
        self.tracker.finish(&action_id, outcome);

        if status == AttemptStatus::Timeout {
            tracing::warn!(action = %action_id, %failure, "recovery action timed out, worker abandoned");
        } else {
            tracing::info!(action = %action_id, %failure, ?status, ?severity, "recovery action completed");
        }

        if severity >= Severity::Hard {
            self.record_emergency_report(&action_id, &failure, status).await;
        }

        self.persist_attempt(&attempt).await;
    }

    async fn record_emergency_report(&self, action_id: &str, failure: &FailureKind, status: AttemptStatus) {
        let report = EmergencyCloseReport {
            triggered_at: Utc::now(),
            reason: format!("{action_id} dispatched for {failure}"),
            closed: if status == AttemptStatus::Success { vec![action_id.to_string()] } else { vec![] },
            failed: if status != AttemptStatus::Success {
                vec![(action_id.to_string(), format!("{status:?}"))]
            } else {
                vec![]
            },
        };

        if let Some(store) = &self.persistence {
            let payload = serde_json::to_value(&report).unwrap_or(serde_json::Value::Null);
            let record = Record::new(mint_id("emergency"), RecordCategory::new(RecordCategory::EMERGENCY), Utc::now(), payload);
            if let Err(error) = store.store(record).await {
                tracing::error!(%error, "failed to persist emergency close report");
            }
        }
    }

    async fn persist_attempt(&self, attempt: &RecoveryAttempt) {
        {
            let mut history = self.history.write();
            history.attempts.push(attempt.clone());
            if history.attempts.len() > self.config.recovery_history_size {
                let overflow = history.attempts.len() - self.config.recovery_history_size;
                history.attempts.drain(0..overflow);
            }
        }

        if let Some(store) = &self.persistence {
            let payload = serde_json::to_value(attempt).unwrap_or(serde_json::Value::Null);
            let record = Record::new(attempt.id.clone(), RecordCategory::new(RecordCategory::RECOVERY), attempt.started_at, payload);
            if let Err(error) = store.store(record).await {
                tracing::error!(%error, "failed to persist recovery attempt");
            }
        }
    }

    pub fn history_snapshot(&self) -> Vec<RecoveryAttempt> {
        self.history.read().attempts.clone()
    }

    pub fn active_failures(&self) -> Vec<FailureKind> {
        self.history.read().active_failures.clone()
    }

    pub fn dispatched_total(&self) -> u64 {
        self.dispatched_total.load(Ordering::Relaxed)
    }

    /// Runs the cancellation-aware detection/dispatch loop until
    /// `shutdown` fires (Design Note §9 "never unbounded sleeps").
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.monitoring_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let active = self.run_probes().await;
                    self.dispatch(&active).await;
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("recovery engine detection loop shutting down");
                    break;
                }
            }
        }
    }
}

fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Soft => 0,
        Severity::Medium => 1,
        Severity::Hard => 2,
        Severity::Emergency => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{default_actions, ClosureAction};
    use crate::probes::Probe;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    struct AlwaysBad(FailureKind);

    #[async_trait]
    impl Probe for AlwaysBad {
        fn name(&self) -> &str {
            "always-bad"
        }
        async fn check(&self) -> ProbeResult {
            ProbeResult::Bad(self.0)
        }
    }

    fn engine_with_probe(kind: FailureKind) -> Arc<RecoveryEngine> {
        let mut registry = ActionRegistry::new();
        for action in default_actions() {
            registry.register(action);
        }
        let config = RecoveryConfig {
            monitoring_interval: Duration::from_millis(10),
            ..Default::default()
        };
        Arc::new(RecoveryEngine::new(config, registry, vec![Arc::new(AlwaysBad(kind))], None))
    }

    #[tokio::test]
    async fn dispatch_picks_lowest_severity_eligible_action() {
        let engine = engine_with_probe(FailureKind::BrokerConnectionLost);
        let active = engine.run_probes().await;
        assert_eq!(active, vec![FailureKind::BrokerConnectionLost]);

        engine.dispatch(&active).await;
        assert_eq!(engine.dispatched_total(), 1);
        assert_eq!(engine.history_snapshot().len(), 1);
        assert_eq!(engine.history_snapshot()[0].action_id, "reconnect-broker");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dispatch_runs_actions_for_distinct_failures_concurrently() {
        let running = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let saw_overlap = Arc::new(AtomicBool::new(false));

        let mut registry = ActionRegistry::new();
        for (id, kind) in [("a", FailureKind::HighCPUUsage), ("b", FailureKind::HighMemoryUsage)] {
            let running = running.clone();
            let saw_overlap = saw_overlap.clone();
            let action = ClosureAction::new(
                id,
                id,
                Severity::Soft,
                vec![kind],
                1,
                Duration::from_secs(0),
                Duration::from_secs(5),
                move |_| {
                    if running.fetch_add(1, Ordering::SeqCst) + 1 >= 2 {
                        saw_overlap.store(true, Ordering::SeqCst);
                    }
                    std::thread::sleep(Duration::from_millis(30));
                    running.fetch_sub(1, Ordering::SeqCst);
                    ActionOutcome::Success
                },
            );
            registry.register(Arc::new(action));
        }

        let config = RecoveryConfig { worker_pool_size: 2, ..Default::default() };
        let engine = Arc::new(RecoveryEngine::new(config, registry, vec![], None));

        engine.dispatch(&[FailureKind::HighCPUUsage, FailureKind::HighMemoryUsage]).await;

        assert_eq!(engine.dispatched_total(), 2);
        assert!(saw_overlap.load(Ordering::SeqCst), "both actions should have run concurrently, not one after the other");
    }

    #[tokio::test]
    async fn an_action_never_runs_twice_concurrently() {
        let running = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));
        let r1 = running.clone();
        let o1 = overlapped.clone();

        let slow_action = ClosureAction::new(
            "slow",
            "Slow",
            Severity::Soft,
            vec![FailureKind::HighCPUUsage],
            5,
            Duration::from_millis(1),
            Duration::from_secs(5),
            move |_| {
                if r1.swap(true, Ordering::SeqCst) {
                    o1.store(true, Ordering::SeqCst);
                }
                r1.store(false, Ordering::SeqCst);
                ActionOutcome::Success
            },
        );

        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(slow_action));
        let engine = Arc::new(RecoveryEngine::new(RecoveryConfig::default(), registry, vec![], None));

        let e1 = engine.clone();
        let e2 = engine.clone();
        let h1 = tokio::spawn(async move { e1.dispatch(&[FailureKind::HighCPUUsage]).await });
        let h2 = tokio::spawn(async move { e2.dispatch(&[FailureKind::HighCPUUsage]).await });
        let _ = tokio::join!(h1, h2);

        assert!(!overlapped.load(Ordering::SeqCst));
    }
}
