//! Component and system health types shared by the coordinator, the
//! recovery engine, and every registered component.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Lifecycle / health state of a single registered component.
///
/// `Unavailable` is distinct from `Error`: it is what a health-check
/// timeout degrades a component to (see Design Note on dependency
/// absence), whereas `Error` means the component itself reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize, Serialize)]
pub enum ComponentState {
    Offline,
    Initializing,
    Ready,
    Running,
    Degraded,
    Unavailable,
    Error,
}

/// Snapshot of a single component's health, as reported by its
/// [`HealthCheck`](crate::component::Component::health_check) or inferred
/// from a timed-out poll.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub state: ComponentState,
    pub last_heartbeat: DateTime<Utc>,
    pub error_count: u32,
    pub recovery_attempts: u32,
    pub last_error: Option<String>,
    pub metrics: HashMap<String, f64>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            state: ComponentState::Offline,
            last_heartbeat: now,
            error_count: 0,
            recovery_attempts: 0,
            last_error: None,
            metrics: HashMap::new(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.state, ComponentState::Ready | ComponentState::Running)
    }

    pub fn is_critical(&self) -> bool {
        matches!(
            self.state,
            ComponentState::Error | ComponentState::Unavailable
        )
    }
}

/// Overall system state, a monotonic function of component health per the
/// coordinator's transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize, Serialize)]
pub enum OverallState {
    Stopped,
    Initializing,
    Starting,
    Running,
    Degraded,
    EmergencyStop,
    ShuttingDown,
    Error,
}

impl OverallState {
    /// Whether `self -> next` is a legal transition per the coordinator's
    /// state table (§4.1). `ShuttingDown` is reachable from any state;
    /// `Stopped` is only reachable via `ShuttingDown`.
    pub fn can_transition_to(self, next: OverallState) -> bool {
        use OverallState::*;
        if next == ShuttingDown {
            return true;
        }
        matches!(
            (self, next),
            (Stopped, Initializing)
                | (Initializing, Starting)
                | (Starting, Running)
                | (Running, Degraded)
                | (Degraded, Running)
                | (Running, Error)
                | (Degraded, Error)
                | (Running, EmergencyStop)
                | (Degraded, EmergencyStop)
                | (ShuttingDown, Stopped)
                | (Error, ShuttingDown)
        )
    }
}

impl confluence_bus::Terminal for OverallState {
    /// `Stopped` and `Error` are the two states the coordinator does not
    /// spawn monitor/heartbeat/flush loops out of.
    fn is_terminal(&self) -> bool {
        matches!(self, OverallState::Stopped | OverallState::Error)
    }
}

/// Aggregate system health snapshot, persisted on every transition and on
/// `metrics_persistence_interval`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SystemHealth {
    pub overall_state: OverallState,
    pub component_health: HashMap<String, ComponentHealth>,
    pub uptime: Duration,
    pub metrics: HashMap<String, f64>,
    pub active_failures: Vec<String>,
    pub snapshot_at: DateTime<Utc>,
}

impl SystemHealth {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            overall_state: OverallState::Stopped,
            component_health: HashMap::new(),
            uptime: Duration::ZERO,
            metrics: HashMap::new(),
            active_failures: Vec::new(),
            snapshot_at: now,
        }
    }

    /// Count of components currently reporting a critical state.
    pub fn critical_count(&self) -> usize {
        self.component_health
            .values()
            .filter(|h| h.is_critical())
            .count()
    }

    pub fn unavailable_ratio(&self) -> f64 {
        unavailable_ratio(self.component_health.values())
    }
}

/// Fraction of `component_health` currently `Unavailable`, `0.0` if empty.
/// Shared by [`SystemHealth::unavailable_ratio`] and the coordinator's
/// `next_overall_state`, which only has a slice of health snapshots rather
/// than a full `SystemHealth` to call the method on.
pub fn unavailable_ratio<'a>(component_health: impl IntoIterator<Item = &'a ComponentHealth>) -> f64 {
    let mut total = 0usize;
    let mut unavailable = 0usize;
    for health in component_health {
        total += 1;
        if health.state == ComponentState::Unavailable {
            unavailable += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        unavailable as f64 / total as f64
    }
}
