//! Overall-state computation and transition callbacks (§4.1).

use confluence_core::{unavailable_ratio, ComponentHealth, OverallState, SystemHealth};
use parking_lot::RwLock;

/// Derives the next `overall_state` from the current one and the latest
/// component health snapshot, per the §4.1 transition table. A pure
/// function of its inputs so the state machine is unit-testable without
/// driving a real health loop.
///
/// `Error` is reached by either of two independent conditions:
/// `critical_count >= critical_failure_threshold`, or at least half of the
/// registered components are `Unavailable`.
pub fn next_overall_state(
    current: OverallState,
    component_health: &[ComponentHealth],
    critical_failure_threshold: u32,
    emergency_stop_on_critical_failure: bool,
) -> OverallState {
    if !matches!(current, OverallState::Running | OverallState::Degraded) {
        return current;
    }

    let critical_count = component_health.iter().filter(|h| h.is_critical()).count() as u32;
    let unhealthy_count = component_health.iter().filter(|h| !h.is_healthy()).count();
    let half_unavailable = unavailable_ratio(component_health.iter()) >= 0.5;

    if emergency_stop_on_critical_failure && critical_count >= 2 {
        return OverallState::EmergencyStop;
    }
    if critical_count >= critical_failure_threshold || half_unavailable {
        return OverallState::Error;
    }
    if unhealthy_count > 0 {
        return OverallState::Degraded;
    }
    OverallState::Running
}

type TransitionCallback = Box<dyn Fn(OverallState, OverallState) + Send + Sync>;

/// Registry of state-transition observers, invoked synchronously. A
/// panicking observer is contained via `catch_unwind` and routed to
/// `tracing::error!` rather than poisoning the coordinator (Design Note
/// §9: "panicking observer is contained").
#[derive(Default)]
pub struct TransitionCallbacks {
    callbacks: RwLock<Vec<TransitionCallback>>,
}

impl std::fmt::Debug for TransitionCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionCallbacks")
            .field("count", &self.callbacks.read().len())
            .finish()
    }
}

impl TransitionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, callback: TransitionCallback) {
        self.callbacks.write().push(callback);
    }

    /// Invokes every registered callback with `(old, new)`. A callback
    /// that panics is caught and logged; the remaining callbacks still
    /// run.
    pub fn fire(&self, old: OverallState, new: OverallState) {
        let callbacks = self.callbacks.read();
        for callback in callbacks.iter() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(old, new)));
            if let Err(panic) = result {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(%message, ?old, ?new, "state transition callback panicked");
            }
        }
    }
}

/// Builds a fresh `SystemHealth` snapshot from the current state.
pub fn snapshot(
    overall_state: OverallState,
    component_health: &std::collections::HashMap<String, ComponentHealth>,
    uptime: std::time::Duration,
    active_failures: Vec<String>,
    now: chrono::DateTime<chrono::Utc>,
) -> SystemHealth {
    SystemHealth {
        overall_state,
        component_health: component_health.clone(),
        uptime,
        metrics: std::collections::HashMap::new(),
        active_failures,
        snapshot_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn health(state: confluence_core::ComponentState) -> ComponentHealth {
        let mut h = ComponentHealth::new("x", Utc::now());
        h.state = state;
        h
    }

    #[test]
    fn two_criticals_trigger_emergency_stop_when_enabled() {
        use confluence_core::ComponentState::*;
        let health = vec![health(Error), health(Unavailable)];
        let next = next_overall_state(OverallState::Running, &health, 3, true);
        assert_eq!(next, OverallState::EmergencyStop);
    }

    #[test]
    fn half_unavailable_triggers_error_below_the_critical_count_threshold() {
        use confluence_core::ComponentState::*;
        // critical_failure_threshold is set high enough that critical_count
        // alone would never trip Error; only the unavailable-ratio leg can
        // explain the transition below.
        let health = vec![health(Unavailable), health(Unavailable), health(Running)];
        let next = next_overall_state(OverallState::Running, &health, 100, false);
        assert_eq!(next, OverallState::Error);
    }

    #[test]
    fn single_unhealthy_degrades_without_emergency() {
        use confluence_core::ComponentState::*;
        let health = vec![health(Unavailable), health(Running)];
        let next = next_overall_state(OverallState::Running, &health, 3, false);
        assert_eq!(next, OverallState::Degraded);
    }

    #[test]
    fn all_healthy_returns_to_running_from_degraded() {
        use confluence_core::ComponentState::*;
        let health = vec![health(Running), health(Ready)];
        let next = next_overall_state(OverallState::Degraded, &health, 3, true);
        assert_eq!(next, OverallState::Running);
    }

    #[test]
    fn non_operational_states_are_left_untouched() {
        let next = next_overall_state(OverallState::Initializing, &[], 3, true);
        assert_eq!(next, OverallState::Initializing);
    }

    #[test]
    fn panicking_callback_does_not_prevent_others_from_running() {
        let callbacks = TransitionCallbacks::new();
        let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ran2 = ran.clone();

        callbacks.register(Box::new(|_, _| panic!("boom")));
        callbacks.register(Box::new(move |_, _| {
            ran2.store(true, std::sync::atomic::Ordering::SeqCst);
        }));

        callbacks.fire(OverallState::Stopped, OverallState::Initializing);
        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
