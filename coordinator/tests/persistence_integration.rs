//! Coordinator wired to a real persistence store: verifies that state
//! transitions actually land on disk, not just in the in-memory
//! snapshot returned by `status()`.

use async_trait::async_trait;
use confluence_core::{Component, ComponentHealth, ComponentState, ConfluenceError, OverallState, RecordCategory};
use confluence_coordinator::{CoordinatorConfig, ProductionCoordinator};
use confluence_persistence::{PersistenceConfig, PersistenceStore};
use std::sync::Arc;

struct AlwaysUp(&'static str);

#[async_trait]
impl Component for AlwaysUp {
    fn name(&self) -> &str {
        self.0
    }
    async fn initialize(&self) -> Result<bool, ConfluenceError> {
        Ok(true)
    }
    async fn start(&self) -> Result<bool, ConfluenceError> {
        Ok(true)
    }
    async fn stop(&self, _emergency: bool) -> Result<bool, ConfluenceError> {
        Ok(true)
    }
    async fn health_check(&self) -> ComponentHealth {
        let mut health = ComponentHealth::new(self.0, chrono::Utc::now());
        health.state = ComponentState::Running;
        health
    }
}

#[tokio::test]
async fn start_and_stop_each_persist_a_health_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        PersistenceStore::new(PersistenceConfig {
            base_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap(),
    );

    let coordinator = ProductionCoordinator::new(CoordinatorConfig::default(), Some(store.clone()));
    coordinator.register("worker", Arc::new(AlwaysUp("worker")), 10).unwrap();

    coordinator.start().await.unwrap();
    assert_eq!(coordinator.status().overall_state, OverallState::Running);

    coordinator.stop(false).await.unwrap();
    assert_eq!(coordinator.status().overall_state, OverallState::Stopped);

    let category = RecordCategory::new(RecordCategory::HEALTH);
    let snapshots = store.query(&category, None, None, 100).await.unwrap();
    // One snapshot per transition at minimum: Initializing, Starting,
    // Running, ShuttingDown, Stopped.
    assert!(snapshots.len() >= 5, "expected at least 5 persisted snapshots, got {}", snapshots.len());
}
