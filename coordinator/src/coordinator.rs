//! `ProductionCoordinator` (§4.1): the lifecycle/health/state supervisor
//! every component registers with.

use crate::config::CoordinatorConfig;
use crate::registry::{ComponentRegistry, DuplicateComponent};
use crate::state::{next_overall_state, snapshot, TransitionCallbacks};
use confluence_bus::Terminal;
use confluence_core::{mint_id, Component, ComponentHealth, ComponentState, ConfluenceError, OverallState, Record, RecordCategory, SystemHealth};
use confluence_persistence::PersistenceStore;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// The production coordinator. Construct once per process, `register`
/// every component, then `start`.
pub struct ProductionCoordinator {
    config: CoordinatorConfig,
    registry: RwLock<ComponentRegistry>,
    overall_state: RwLock<OverallState>,
    component_health: RwLock<HashMap<String, ComponentHealth>>,
    callbacks: TransitionCallbacks,
    persistence: Option<Arc<PersistenceStore>>,
    started_at: RwLock<Option<Instant>>,
    shutdown: CancellationToken,
    loop_handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    running: AtomicBool,
}

impl std::fmt::Debug for ProductionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionCoordinator")
            .field("overall_state", &*self.overall_state.read())
            .field("components", &self.registry.read().len())
            .finish()
    }
}

impl ProductionCoordinator {
    pub fn new(config: CoordinatorConfig, persistence: Option<Arc<PersistenceStore>>) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: RwLock::new(ComponentRegistry::new()),
            overall_state: RwLock::new(OverallState::Stopped),
            component_health: RwLock::new(HashMap::new()),
            callbacks: TransitionCallbacks::new(),
            persistence,
            started_at: RwLock::new(None),
            shutdown: CancellationToken::new(),
            loop_handles: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        })
    }

    /// §4.1 `Register(name, component, priority)`.
    pub fn register(
        &self,
        name: impl Into<String>,
        component: Arc<dyn Component>,
        priority: i64,
    ) -> Result<(), DuplicateComponent> {
        let name = name.into();
        self.registry.write().register(name.clone(), component, priority)?;
        self.component_health
            .write()
            .insert(name.clone(), ComponentHealth::new(name, chrono::Utc::now()));
        Ok(())
    }

    pub fn on_transition(&self, callback: impl Fn(OverallState, OverallState) + Send + Sync + 'static) {
        self.callbacks.register(Box::new(callback));
    }

    fn transition_to(&self, next: OverallState) {
        let mut state = self.overall_state.write();
        let old = *state;
        if !old.can_transition_to(next) {
            tracing::warn!(?old, ?next, "ignoring illegal overall_state transition");
            return;
        }
        *state = next;
        drop(state);
        if next.is_terminal() {
            tracing::info!(?old, new = ?next, "overall_state transition (terminal)");
        } else {
            tracing::info!(?old, new = ?next, "overall_state transition");
        }
        self.callbacks.fire(old, next);
    }

    /// §4.1 `Start()`: Stopped -> Initializing -> Starting -> Running,
    /// initializing then starting components in ascending-priority
    /// groups, each step bounded by `lifecycle_step_timeout`.
    pub async fn start(self: &Arc<Self>) -> Result<(), ConfluenceError> {
        self.transition_to(OverallState::Initializing);
        self.persist_snapshot().await;

        let groups = self.registry.read().ascending_groups();
        for group in &groups {
            if let Err(error) = self.run_lifecycle_step(group, LifecycleStep::Initialize).await {
                self.transition_to(OverallState::Error);
                self.persist_snapshot().await;
                return Err(error);
            }
        }

        self.transition_to(OverallState::Starting);
        self.persist_snapshot().await;

        for group in &groups {
            if let Err(error) = self.run_lifecycle_step(group, LifecycleStep::Start).await {
                self.transition_to(OverallState::Error);
                self.persist_snapshot().await;
                return Err(error);
            }
        }

        *self.started_at.write() = Some(Instant::now());
        self.running.store(true, Ordering::SeqCst);
        self.transition_to(OverallState::Running);
        self.persist_snapshot().await;

        let coordinator = self.clone();
        let monitor = tokio::spawn(async move { coordinator.run_monitor_loop().await });
        let coordinator = self.clone();
        let heartbeat = tokio::spawn(async move { coordinator.run_heartbeat_loop().await });
        let coordinator = self.clone();
        let flush = tokio::spawn(async move { coordinator.run_persistence_flush_loop().await });
        *self.loop_handles.lock() = vec![monitor, heartbeat, flush];

        Ok(())
    }

    async fn run_lifecycle_step(
        &self,
        group: &[(String, Arc<dyn Component>)],
        step: LifecycleStep,
    ) -> Result<(), ConfluenceError> {
        let timeout = self.config.lifecycle_step_timeout;
        let futures = group.iter().map(|(name, component)| {
            let name = name.clone();
            let component = component.clone();
            async move {
                let result = tokio::time::timeout(timeout, async {
                    match step {
                        LifecycleStep::Initialize => component.initialize().await,
                        LifecycleStep::Start => component.start().await,
                    }
                })
                .await;
                (name, result)
            }
        });

        for (name, result) in join_all(futures).await {
            match result {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    return Err(ConfluenceError::Fatal(format!("{name} reported failure during {step:?}")));
                }
                Ok(Err(error)) => return Err(error),
                Err(_) => {
                    return Err(ConfluenceError::Fatal(format!("{name} timed out during {step:?}")));
                }
            }
        }
        Ok(())
    }

    /// §4.1 `Stop(emergency)`. Normal mode transitions straight to
    /// `ShuttingDown` (reachable from any state); emergency mode first
    /// transitions through `EmergencyStop` when the system was running.
    pub async fn stop(&self, emergency: bool) -> Result<(), ConfluenceError> {
        if emergency && matches!(*self.overall_state.read(), OverallState::Running | OverallState::Degraded) {
            self.transition_to(OverallState::EmergencyStop);
            self.persist_snapshot().await;
        }
        self.transition_to(OverallState::ShuttingDown);
        self.persist_snapshot().await;

        self.shutdown.cancel();
        for handle in self.loop_handles.lock().drain(..) {
            handle.abort();
        }

        let timeout = if emergency {
            self.config.emergency_stop_timeout
        } else {
            self.config.lifecycle_step_timeout
        };

        for group in self.registry.read().descending_groups() {
            let futures = group.iter().map(|(name, component)| {
                let name = name.clone();
                let component = component.clone();
                async move {
                    let result = tokio::time::timeout(timeout, component.stop(emergency)).await;
                    match result {
                        Ok(Ok(_)) => {}
                        Ok(Err(error)) => tracing::warn!(%name, %error, "component reported error while stopping"),
                        Err(_) => tracing::warn!(%name, "component did not stop within budget"),
                    }
                }
            });
            join_all(futures).await;
        }

        self.running.store(false, Ordering::SeqCst);
        self.transition_to(OverallState::Stopped);
        self.persist_snapshot().await;
        Ok(())
    }

    /// §4.1 `EmergencyStop()`, callable from any component.
    pub async fn emergency_stop(&self) -> Result<(), ConfluenceError> {
        self.stop(true).await
    }

    /// §4.1 `Status()`.
    pub fn status(&self) -> SystemHealth {
        let uptime = self
            .started_at
            .read()
            .map(|s| s.elapsed())
            .unwrap_or_default();
        let active_failures: Vec<String> = self
            .component_health
            .read()
            .values()
            .filter(|h| h.is_critical())
            .map(|h| h.name.clone())
            .collect();
        snapshot(
            *self.overall_state.read(),
            &self.component_health.read(),
            uptime,
            active_failures,
            chrono::Utc::now(),
        )
    }

    /// Health-poll loop (default `monitoring_interval` 10s, §4.1).
    async fn run_monitor_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.monitoring_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll_health_once().await,
                _ = self.shutdown.cancelled() => {
                    tracing::info!("coordinator monitor loop shutting down");
                    break;
                }
            }
        }
    }

    async fn poll_health_once(&self) {
        let names = self.registry.read().names();
        for name in names {
            let Some(entry_component) = self.registry.read().get(&name).map(|e| e.component.clone()) else {
                continue;
            };
            let timeout = self.config.health_check_timeout;
            let health = match tokio::time::timeout(timeout, entry_component.health_check()).await {
                Ok(health) => health,
                Err(_) => {
                    let mut health = ComponentHealth::new(name.clone(), chrono::Utc::now());
                    health.state = ComponentState::Unavailable;
                    health.error_count = 1;
                    health
                }
            };

            let mut map = self.component_health.write();
            if let Some(existing) = map.get(&name) {
                let mut merged = health;
                if !merged.is_healthy() {
                    merged.error_count = merged.error_count.max(existing.error_count + 1);
                }
                map.insert(name, merged);
            } else {
                map.insert(name, health);
            }
        }

        let current = *self.overall_state.read();
        if matches!(current, OverallState::Running | OverallState::Degraded) {
            let component_health: Vec<ComponentHealth> = self.component_health.read().values().cloned().collect();
            let next = next_overall_state(
                current,
                &component_health,
                self.config.critical_failure_threshold,
                self.config.emergency_stop_on_critical_failure,
            );
            if next != current {
                self.transition_to(next);
                self.persist_snapshot().await;
            }
        }
    }

    /// Liveness/uptime loop (default `heartbeat_interval` 5s, §4.1).
    async fn run_heartbeat_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.heartbeat_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = chrono::Utc::now();
                    for health in self.component_health.write().values_mut() {
                        if health.is_healthy() {
                            health.last_heartbeat = now;
                        }
                    }
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("coordinator heartbeat loop shutting down");
                    break;
                }
            }
        }
    }

    /// Periodic snapshot flush independent of the per-transition flush
    /// (§4.1 "at `metrics_persistence_interval` ... and on every state
    /// transition").
    async fn run_persistence_flush_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.metrics_persistence_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.persist_snapshot().await,
                _ = self.shutdown.cancelled() => break,
            }
        }
    }

    async fn persist_snapshot(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        let snapshot = self.status();
        let payload = serde_json::to_value(&snapshot).unwrap_or(serde_json::Value::Null);
        let record = Record::new(mint_id("health"), RecordCategory::new(RecordCategory::HEALTH), snapshot.snapshot_at, payload);
        if let Err(error) = store.store(record).await {
            tracing::error!(%error, "failed to persist system health snapshot");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LifecycleStep {
    Initialize,
    Start,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Recorder {
        name: &'static str,
        order: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Component for Recorder {
        fn name(&self) -> &str {
            self.name
        }
        async fn initialize(&self) -> Result<bool, ConfluenceError> {
            Ok(true)
        }
        async fn start(&self) -> Result<bool, ConfluenceError> {
            self.order.lock().push(self.name.to_string());
            Ok(true)
        }
        async fn stop(&self, _emergency: bool) -> Result<bool, ConfluenceError> {
            self.order.lock().push(format!("stop:{}", self.name));
            Ok(true)
        }
        async fn health_check(&self) -> ComponentHealth {
            let mut h = ComponentHealth::new(self.name, chrono::Utc::now());
            h.state = ComponentState::Running;
            h
        }
    }

    #[tokio::test]
    async fn start_stop_roundtrip_respects_priority_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let coordinator = ProductionCoordinator::new(CoordinatorConfig::default(), None);

        coordinator.register("a", Arc::new(Recorder { name: "a", order: order.clone() }), 10).unwrap();
        coordinator.register("b", Arc::new(Recorder { name: "b", order: order.clone() }), 20).unwrap();
        coordinator.register("c", Arc::new(Recorder { name: "c", order: order.clone() }), 30).unwrap();

        coordinator.start().await.unwrap();
        assert_eq!(coordinator.status().overall_state, OverallState::Running);
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);

        coordinator.stop(false).await.unwrap();
        assert_eq!(coordinator.status().overall_state, OverallState::Stopped);
        assert_eq!(
            order.lock().iter().skip(3).cloned().collect::<Vec<_>>(),
            vec!["stop:c", "stop:b", "stop:a"]
        );
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let coordinator = ProductionCoordinator::new(CoordinatorConfig::default(), None);
        coordinator.register("a", Arc::new(Recorder { name: "a", order: Arc::new(Mutex::new(Vec::new())) }), 1).unwrap();
        assert!(coordinator
            .register("a", Arc::new(Recorder { name: "a", order: Arc::new(Mutex::new(Vec::new())) }), 1)
            .is_err());
    }

    struct FailingInit;

    #[async_trait]
    impl Component for FailingInit {
        fn name(&self) -> &str {
            "failing"
        }
        async fn initialize(&self) -> Result<bool, ConfluenceError> {
            Ok(false)
        }
        async fn start(&self) -> Result<bool, ConfluenceError> {
            Ok(true)
        }
        async fn stop(&self, _emergency: bool) -> Result<bool, ConfluenceError> {
            Ok(true)
        }
        async fn health_check(&self) -> ComponentHealth {
            ComponentHealth::new("failing", chrono::Utc::now())
        }
    }

    #[tokio::test]
    async fn hard_init_failure_transitions_to_error() {
        let coordinator = ProductionCoordinator::new(CoordinatorConfig::default(), None);
        coordinator.register("failing", Arc::new(FailingInit), 1).unwrap();

        let result = coordinator.start().await;
        assert!(result.is_err());
        assert_eq!(coordinator.status().overall_state, OverallState::Error);
    }

    #[tokio::test]
    async fn transition_callback_fires_with_old_and_new_state() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let coordinator = ProductionCoordinator::new(CoordinatorConfig::default(), None);
        coordinator.on_transition(move |old, new| seen2.lock().push((old, new)));

        coordinator.register("a", Arc::new(Recorder { name: "a", order: Arc::new(Mutex::new(Vec::new())) }), 1).unwrap();
        coordinator.start().await.unwrap();

        let transitions = seen.lock();
        assert!(transitions.contains(&(OverallState::Stopped, OverallState::Initializing)));
        assert!(transitions.contains(&(OverallState::Starting, OverallState::Running)));
    }
}
