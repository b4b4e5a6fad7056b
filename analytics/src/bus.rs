//! Real-time analytics event bus: a bounded, batched publish/subscribe
//! channel with a priority bypass (§4.4.5).

use crate::types::{AnalyticsComponent, AnalyticsEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

type Subscriber = Box<dyn Fn(&AnalyticsEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    pub capacity: usize,
    pub batch_size: usize,
    pub batch_interval: Duration,
    pub priority_bypass_threshold: u8,
    pub refresh_interval: Duration,
    pub retention: Duration,
}

#[derive(Default)]
struct RollingWindows {
    active_patterns: Vec<AnalyticsEvent>,
    active_signals: Vec<AnalyticsEvent>,
}

impl RollingWindows {
    fn record(&mut self, event: &AnalyticsEvent) {
        use crate::types::AnalyticsEventKind::*;
        match event.kind {
            PatternDetected | ConfluenceUpdated | StructureChange => {
                self.active_patterns.push(event.clone())
            }
            SignalGenerated | TradeOutcome => self.active_signals.push(event.clone()),
            _ => {}
        }
    }

    fn prune(&mut self, now: chrono::DateTime<chrono::Utc>, retention: chrono::Duration) {
        self.active_patterns.retain(|event| now - event.timestamp <= retention);
        self.active_signals.retain(|event| now - event.timestamp <= retention);
    }
}

/// Bounded in-process publish/subscribe bus for analytics events
/// (§4.4.5). Producers never block: a full queue drops the event and
/// increments a counter; `priority >= priority_bypass_threshold` events
/// dispatch synchronously instead of queueing.
pub struct AnalyticsEventBus {
    sender: mpsc::Sender<AnalyticsEvent>,
    receiver: AsyncMutex<Option<mpsc::Receiver<AnalyticsEvent>>>,
    subscribers: RwLock<HashMap<AnalyticsComponent, Vec<Subscriber>>>,
    rolling: RwLock<RollingWindows>,
    dispatched_total: AtomicU64,
    dropped_total: AtomicU64,
    config: BusConfig,
}

impl std::fmt::Debug for AnalyticsEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsEventBus")
            .field("dispatched_total", &self.dispatched_total.load(Ordering::Relaxed))
            .field("dropped_total", &self.dropped_total.load(Ordering::Relaxed))
            .finish()
    }
}

impl AnalyticsEventBus {
    pub fn new(config: BusConfig) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(config.capacity);
        Arc::new(Self {
            sender,
            receiver: AsyncMutex::new(Some(receiver)),
            subscribers: RwLock::new(HashMap::new()),
            rolling: RwLock::new(RollingWindows::default()),
            dispatched_total: AtomicU64::new(0),
            dropped_total: AtomicU64::new(0),
            config,
        })
    }

    /// Registers `callback` for every event published against `component`.
    /// A panicking callback is contained and logged; it never affects
    /// other subscribers or the consumer loop (Design Note §9).
    pub fn subscribe(&self, component: AnalyticsComponent, callback: Subscriber) {
        self.subscribers.write().entry(component).or_default().push(callback);
    }

    /// Publishes `event`. High-priority events bypass the queue and
    /// dispatch synchronously; everything else is enqueued and drained by
    /// the batch consumer. Returns `false` when the event was dropped
    /// because the queue was full.
    pub fn publish(&self, event: AnalyticsEvent) -> bool {
        if event.priority >= self.config.priority_bypass_threshold {
            self.dispatch(&event);
            return true;
        }

        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                self.dropped_total.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn dispatched_total(&self) -> u64 {
        self.dispatched_total.load(Ordering::Relaxed)
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    fn dispatch(&self, event: &AnalyticsEvent) {
        self.dispatched_total.fetch_add(1, Ordering::Relaxed);
        self.rolling.write().record(event);

        let subscribers = self.subscribers.read();
        if let Some(callbacks) = subscribers.get(&event.component) {
            for callback in callbacks {
                if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                    tracing::error!(component = ?event.component, "analytics event subscriber panicked");
                }
            }
        }
    }

    /// Runs the batch-drain and rolling-window-prune loops until
    /// `shutdown` is cancelled. Both loops use cancellation-aware sleeps
    /// (Design Note §9 "Timers").
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut receiver = self
            .receiver
            .lock()
            .await
            .take()
            .expect("AnalyticsEventBus::run called more than once");

        let mut batch_ticker = tokio::time::interval(self.config.batch_interval);
        let mut refresh_ticker = tokio::time::interval(self.config.refresh_interval);

        loop {
            tokio::select! {
                _ = batch_ticker.tick() => {
                    self.drain_batch(&mut receiver).await;
                }
                _ = refresh_ticker.tick() => {
                    let now = chrono::Utc::now();
                    let retention = chrono::Duration::from_std(self.config.retention)
                        .unwrap_or(chrono::Duration::hours(1));
                    self.rolling.write().prune(now, retention);
                }
                _ = shutdown.cancelled() => {
                    self.drain_batch(&mut receiver).await;
                    break;
                }
            }
        }
    }

    async fn drain_batch(&self, receiver: &mut mpsc::Receiver<AnalyticsEvent>) {
        for _ in 0..self.config.batch_size {
            match receiver.try_recv() {
                Ok(event) => self.dispatch(&event),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalyticsEventKind;
    use confluence_instrument::{Symbol, Timeframe};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;

    fn event(priority: u8, component: AnalyticsComponent) -> AnalyticsEvent {
        AnalyticsEvent {
            id: "e1".into(),
            kind: AnalyticsEventKind::SignalGenerated,
            timestamp: chrono::Utc::now(),
            symbol: Symbol::new("EURUSD"),
            timeframe: Timeframe::M5,
            component,
            priority,
            payload: serde_json::json!({}),
            tags: HashSet::new(),
        }
    }

    fn config() -> BusConfig {
        BusConfig {
            capacity: 4,
            batch_size: 50,
            batch_interval: Duration::from_millis(10),
            priority_bypass_threshold: 8,
            refresh_interval: Duration::from_secs(5),
            retention: Duration::from_secs(3600),
        }
    }

    #[test]
    fn high_priority_dispatches_synchronously() {
        let bus = AnalyticsEventBus::new(config());
        let invoked = Arc::new(AtomicBool::new(false));
        let invoked_clone = invoked.clone();
        bus.subscribe(
            AnalyticsComponent::Signal,
            Box::new(move |_| invoked_clone.store(true, Ordering::SeqCst)),
        );

        let published = bus.publish(event(9, AnalyticsComponent::Signal));
        assert!(published);
        assert!(invoked.load(Ordering::SeqCst));
        assert_eq!(bus.dispatched_total(), 1);
    }

    #[test]
    fn full_queue_drops_and_counts_low_priority_events() {
        let bus = AnalyticsEventBus::new(config());
        for _ in 0..config().capacity {
            assert!(bus.publish(event(1, AnalyticsComponent::Signal)));
        }
        let dropped = !bus.publish(event(1, AnalyticsComponent::Signal));
        assert!(dropped);
        assert_eq!(bus.dropped_total(), 1);
    }

    #[tokio::test]
    async fn batched_events_dispatch_on_drain() {
        let bus = AnalyticsEventBus::new(config());
        bus.publish(event(1, AnalyticsComponent::Signal));

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        bus.clone().run(shutdown).await;

        assert_eq!(bus.dispatched_total(), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_prevent_dispatch_count() {
        let bus = AnalyticsEventBus::new(config());
        bus.subscribe(AnalyticsComponent::Signal, Box::new(|_| panic!("boom")));
        bus.publish(event(9, AnalyticsComponent::Signal));
        assert_eq!(bus.dispatched_total(), 1);
    }
}
