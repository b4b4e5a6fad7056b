//! The detection/dispatch loop wired to a real persistence store and
//! driven via `RecoveryEngine::run`, the same cancellation-token idiom
//! the platform facade uses in production.

use async_trait::async_trait;
use confluence_core::RecordCategory;
use confluence_persistence::{PersistenceConfig, PersistenceStore};
use confluence_recovery::action::default_actions;
use confluence_recovery::{ActionRegistry, FailureKind, Probe, ProbeResult, RecoveryConfig, RecoveryEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

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

#[tokio::test]
async fn detection_loop_dispatches_and_persists_an_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        PersistenceStore::new(PersistenceConfig {
            base_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap(),
    );

    let mut registry = ActionRegistry::new();
    for action in default_actions() {
        registry.register(action);
    }

    let config = RecoveryConfig {
        monitoring_interval: Duration::from_millis(20),
        ..Default::default()
    };
    let probes: Vec<Arc<dyn Probe>> = vec![Arc::new(AlwaysBad(FailureKind::BrokerConnectionLost))];
    let engine = Arc::new(RecoveryEngine::new(config, registry, probes, Some(store.clone())));

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    let engine_clone = engine.clone();
    let handle = tokio::spawn(async move { engine_clone.run(shutdown_clone).await });

    // Give the loop a few ticks to detect and dispatch, then stop it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();
    handle.await.unwrap();

    assert!(engine.dispatched_total() >= 1);

    let category = RecordCategory::new(RecordCategory::RECOVERY);
    let persisted = store.query(&category, None, None, 100).await.unwrap();
    assert!(!persisted.is_empty(), "expected at least one persisted recovery attempt");
}
