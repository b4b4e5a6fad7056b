//! Recovery attempts and the cooldown/attempt-count bookkeeping that
//! makes the dispatcher's eligibility rules (§3 "Recovery action") pure
//! functions of `now` rather than readers of the wall clock — the
//! tracker takes `now` as a parameter everywhere, so its transitions are
//! unit-testable without sleeping.

use crate::action::{ActionOutcome, RecoveryAction};
use crate::failure::FailureKind;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Terminal and in-flight states of a single recovery attempt (§3).
/// Terminal statuses (`Success`/`Failed`/`Cancelled`/`Timeout`) are
/// never overwritten once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AttemptStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Cancelled,
    Timeout,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptStatus::Pending | AttemptStatus::InProgress)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    pub id: String,
    pub action_id: String,
    pub failure_kind: FailureKind,
    pub started_at: DateTime<Utc>,
    pub status: AttemptStatus,
    pub duration_ms: Option<u64>,
    pub metrics_before: HashMap<String, f64>,
    pub metrics_after: HashMap<String, f64>,
    pub attempt_number: u32,
}

impl RecoveryAttempt {
    /// Transitions to a terminal status. No-op (logged) if the attempt
    /// is already terminal — a terminal status is never overwritten.
    pub fn finish(&mut self, status: AttemptStatus, duration_ms: u64, metrics_after: HashMap<String, f64>) {
        if self.status.is_terminal() {
            tracing::warn!(attempt_id = %self.id, "ignoring finish() on already-terminal recovery attempt");
            return;
        }
        self.status = status;
        self.duration_ms = Some(duration_ms);
        self.metrics_after = metrics_after;
    }
}

/// Per-action cooldown/attempt-count state. One entry per registered
/// action id.
#[derive(Debug, Clone, Default)]
struct ActionState {
    attempt_count: u32,
    last_attempt: Option<DateTime<Utc>>,
    in_progress: bool,
}

/// Tracks eligibility, in-flight state, and attempt history for every
/// registered action. All decisions are pure functions of an explicit
/// `now`, matching the `SupervisorTracker` idiom this is grounded on.
#[derive(Debug, Default)]
pub struct RecoveryTracker {
    state: RwLock<HashMap<String, ActionState>>,
    concurrent_recoveries: AtomicU64,
}

impl RecoveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// §3 eligibility: attempts < max_attempts, cooldown elapsed, no
    /// prerequisite in-flight, concurrency budget not exhausted.
    #[allow(clippy::too_many_arguments)]
    pub fn is_eligible(
        &self,
        action: &dyn RecoveryAction,
        now: DateTime<Utc>,
        max_concurrent: usize,
    ) -> bool {
        let state = self.state.read();
        let entry = state.get(action.id());

        if let Some(entry) = entry {
            if entry.attempt_count >= action.max_attempts() {
                return false;
            }
            if entry.in_progress {
                return false;
            }
            if let Some(last) = entry.last_attempt {
                let cooldown = chrono::Duration::from_std(action.cooldown()).unwrap_or_default();
                if now - last < cooldown {
                    return false;
                }
            }
        }

        for prereq in action.prerequisites() {
            if state.get(prereq).is_some_and(|s| s.in_progress) {
                return false;
            }
        }

        self.concurrent_recoveries.load(Ordering::Relaxed) < max_concurrent as u64
    }

    pub fn total_attempts(&self, action_id: &str) -> u32 {
        self.state.read().get(action_id).map(|s| s.attempt_count).unwrap_or(0)
    }

    /// Marks `action_id` in-flight, bumping the concurrency counter.
    pub fn begin(&self, action_id: &str, now: DateTime<Utc>) {
        let mut state = self.state.write();
        let entry = state.entry(action_id.to_string()).or_default();
        entry.in_progress = true;
        entry.last_attempt = Some(now);
        self.concurrent_recoveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the terminal outcome: success resets `attempt_count` to
    /// zero (§4.2 "On success, attempt_count resets to zero"); anything
    /// else increments it.
    pub fn finish(&self, action_id: &str, outcome: ActionOutcome) {
        let mut state = self.state.write();
        let entry = state.entry(action_id.to_string()).or_default();
        entry.in_progress = false;
        match outcome {
            ActionOutcome::Success => entry.attempt_count = 0,
            ActionOutcome::Failure => entry.attempt_count += 1,
        }
        self.concurrent_recoveries.fetch_sub(1, Ordering::Relaxed);
    }

    /// Manual reset after `max_attempts` exhaustion (§4.2 "ceases further
    /// attempts... until the next manual reset").
    pub fn reset(&self, action_id: &str) {
        self.state.write().remove(action_id);
    }

    pub fn active_count(&self) -> usize {
        self.concurrent_recoveries.load(Ordering::Relaxed) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ClosureAction, Severity};
    use std::time::Duration;

    fn action(max_attempts: u32, cooldown_secs: u64) -> ClosureAction<fn(FailureKind) -> ActionOutcome> {
        ClosureAction::new(
            "a",
            "A",
            Severity::Soft,
            vec![FailureKind::BrokerConnectionLost],
            max_attempts,
            Duration::from_secs(cooldown_secs),
            Duration::from_secs(5),
            |_| ActionOutcome::Success,
        )
    }

    #[test]
    fn ineligible_while_in_progress() {
        let tracker = RecoveryTracker::new();
        let action = action(3, 10);
        let now = Utc::now();

        assert!(tracker.is_eligible(&action, now, 2));
        tracker.begin(action.id(), now);
        assert!(!tracker.is_eligible(&action, now, 2));
    }

    #[test]
    fn respects_cooldown_window() {
        let tracker = RecoveryTracker::new();
        let action = action(5, 60);
        let now = Utc::now();

        tracker.begin(action.id(), now);
        tracker.finish(action.id(), ActionOutcome::Failure);

        assert!(!tracker.is_eligible(&action, now + chrono::Duration::seconds(30), 2));
        assert!(tracker.is_eligible(&action, now + chrono::Duration::seconds(61), 2));
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let tracker = RecoveryTracker::new();
        let action = action(3, 0);
        let mut now = Utc::now();

        for _ in 0..3 {
            assert!(tracker.is_eligible(&action, now, 2));
            tracker.begin(action.id(), now);
            tracker.finish(action.id(), ActionOutcome::Failure);
            now += chrono::Duration::seconds(1);
        }

        assert!(!tracker.is_eligible(&action, now, 2));
        assert_eq!(tracker.total_attempts(action.id()), 3);
    }

    #[test]
    fn success_resets_attempt_count() {
        let tracker = RecoveryTracker::new();
        let action = action(3, 0);
        let now = Utc::now();

        tracker.begin(action.id(), now);
        tracker.finish(action.id(), ActionOutcome::Failure);
        assert_eq!(tracker.total_attempts(action.id()), 1);

        tracker.begin(action.id(), now);
        tracker.finish(action.id(), ActionOutcome::Success);
        assert_eq!(tracker.total_attempts(action.id()), 0);
    }
}
