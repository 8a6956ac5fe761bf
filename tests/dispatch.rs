//! End-to-end dispatch behavior: selection, ordering, health, timeouts,
//! metrics accounting, and shutdown draining.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eventvisor::{
    DeliveryError, DispatchError, Dispatcher, DispatcherConfig, Event, EventKind, Observer,
    ObserverError, RegistryError,
};

/// Scriptable observer: configurable priority, interest, budget, failure
/// schedule, and an optional shared delivery-order log.
struct TestObserver {
    id: String,
    priority: u8,
    budget: Duration,
    kinds: Option<Vec<EventKind>>,
    fail_first: u64,
    sleep_for: Option<Duration>,
    calls: AtomicU64,
    order: Option<Arc<Mutex<Vec<String>>>>,
}

impl TestObserver {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            priority: 5,
            budget: Duration::from_secs(1),
            kinds: None,
            fail_first: 0,
            sleep_for: None,
            calls: AtomicU64::new(0),
            order: None,
        }
    }

    fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    fn with_kinds(mut self, kinds: Vec<EventKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    fn failing_first(mut self, n: u64) -> Self {
        self.fail_first = n;
        self
    }

    fn sleeping(mut self, dur: Duration) -> Self {
        self.sleep_for = Some(dur);
        self
    }

    fn logging_order_to(mut self, order: Arc<Mutex<Vec<String>>>) -> Self {
        self.order = Some(order);
        self
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Observer for TestObserver {
    async fn on_event(&self, _event: &Event) -> Result<(), ObserverError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(order) = &self.order {
            order.lock().unwrap().push(self.id.clone());
        }
        if let Some(dur) = self.sleep_for {
            tokio::time::sleep(dur).await;
        }
        if n < self.fail_first {
            return Err(ObserverError::new("scripted failure"));
        }
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn interested_in(&self, kind: EventKind) -> bool {
        self.kinds.as_ref().is_none_or(|ks| ks.contains(&kind))
    }

    fn max_processing_time(&self) -> Duration {
        self.budget
    }
}

fn critical_event() -> Event {
    Event::builder(EventKind::SecurityAlert, "test", "intrusion detected")
        .build()
        .unwrap()
}

fn routine_event() -> Event {
    Event::builder(EventKind::MarketDataUpdate, "feed", "tick")
        .build()
        .unwrap()
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(DispatcherConfig::default()).unwrap()
}

#[tokio::test]
async fn critical_delivery_attempts_each_observer_exactly_once() {
    let dispatcher = dispatcher();
    let observer = Arc::new(TestObserver::new("solo"));
    dispatcher.register(observer.clone()).await.unwrap();

    dispatcher.notify(critical_event()).await.unwrap();

    assert_eq!(observer.calls(), 1);
    let snapshot = dispatcher.metrics_snapshot().await;
    assert_eq!(snapshot["solo"].total, 1);
}

#[tokio::test]
async fn concurrent_delivery_attempts_every_observer_once() {
    let dispatcher = dispatcher();
    let observers: Vec<_> = (0..3)
        .map(|i| Arc::new(TestObserver::new(&format!("worker-{i}"))))
        .collect();
    for observer in &observers {
        dispatcher.register(observer.clone()).await.unwrap();
    }

    dispatcher.notify(routine_event()).await.unwrap();
    assert!(dispatcher.shutdown().await);

    for observer in &observers {
        assert_eq!(observer.calls(), 1, "{} not attempted exactly once", observer.id());
    }
    let snapshot = dispatcher.metrics_snapshot().await;
    for observer in &observers {
        let m = &snapshot[observer.id()];
        assert_eq!((m.total, m.success), (1, 1));
    }
}

#[tokio::test]
async fn sync_delivery_follows_descending_priority() {
    let dispatcher = dispatcher();
    let order = Arc::new(Mutex::new(Vec::new()));
    for (id, priority) in [("p3", 3u8), ("p9", 9), ("p1", 1)] {
        dispatcher
            .register(Arc::new(
                TestObserver::new(id)
                    .with_priority(priority)
                    .logging_order_to(order.clone()),
            ))
            .await
            .unwrap();
    }

    dispatcher.notify(critical_event()).await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["p9", "p3", "p1"]);
}

#[tokio::test]
async fn priority_ties_keep_registration_order() {
    let dispatcher = dispatcher();
    let order = Arc::new(Mutex::new(Vec::new()));
    for id in ["first", "second", "third"] {
        dispatcher
            .register(Arc::new(
                TestObserver::new(id)
                    .with_priority(7)
                    .logging_order_to(order.clone()),
            ))
            .await
            .unwrap();
    }

    dispatcher.notify(critical_event()).await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn circuit_breaker_excludes_failing_observer() {
    let dispatcher = dispatcher();
    // Fails the first 6 deliveries, succeeds afterwards.
    let observer = Arc::new(TestObserver::new("flaky").failing_first(6));
    dispatcher.register(observer.clone()).await.unwrap();

    // 11 recorded deliveries: 6 failures + 5 successes → rate ≈ 0.545.
    for i in 0..11 {
        let result = dispatcher.notify(critical_event()).await;
        assert_eq!(result.is_err(), i < 6, "unexpected outcome on delivery {i}");
    }
    assert_eq!(observer.calls(), 11);

    // Unhealthy now: the next publish must skip it entirely.
    dispatcher.notify(critical_event()).await.unwrap();
    assert_eq!(observer.calls(), 11);

    let snapshot = dispatcher.metrics_snapshot().await;
    let m = &snapshot["flaky"];
    assert_eq!((m.total, m.failure, m.success), (11, 6, 5));
    assert!(m.failure_rate() > 0.5);
}

#[tokio::test(start_paused = true)]
async fn overrun_increments_timeout_only() {
    let dispatcher = dispatcher();
    let observer = Arc::new(
        TestObserver::new("sluggish")
            .with_budget(Duration::from_millis(50))
            .sleeping(Duration::from_secs(30)),
    );
    dispatcher.register(observer.clone()).await.unwrap();

    let err = dispatcher.notify(critical_event()).await.unwrap_err();
    match err {
        DispatchError::SyncNotificationFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].observer, "sluggish");
            assert!(matches!(failures[0].error, DeliveryError::Timeout { .. }));
        }
        other => panic!("expected SyncNotificationFailed, got {other:?}"),
    }

    let snapshot = dispatcher.metrics_snapshot().await;
    let m = &snapshot["sluggish"];
    assert_eq!((m.total, m.timeout, m.failure), (1, 1, 0));
}

#[tokio::test]
async fn snapshot_reflects_sync_success_immediately() {
    let dispatcher = dispatcher();
    dispatcher
        .register(Arc::new(TestObserver::new("steady")))
        .await
        .unwrap();

    let before = dispatcher.metrics_snapshot().await["steady"].clone();
    dispatcher.notify(critical_event()).await.unwrap();
    let after = dispatcher.metrics_snapshot().await["steady"].clone();

    assert_eq!(after.total, before.total + 1);
    assert_eq!(after.success, before.success + 1);
    assert_eq!(after.failure, before.failure);
    assert_eq!(after.timeout, before.timeout);
}

#[tokio::test]
async fn critical_partial_failure_names_only_the_failing_observer() {
    let dispatcher = dispatcher();
    let solid = Arc::new(TestObserver::new("solid"));
    let broken = Arc::new(TestObserver::new("broken").failing_first(u64::MAX));
    dispatcher.register(solid.clone()).await.unwrap();
    dispatcher.register(broken.clone()).await.unwrap();

    let err = dispatcher.notify(critical_event()).await.unwrap_err();
    match err {
        DispatchError::SyncNotificationFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].observer, "broken");
        }
        other => panic!("expected SyncNotificationFailed, got {other:?}"),
    }

    // The healthy observer was still attempted and recorded a success.
    assert_eq!(solid.calls(), 1);
    let snapshot = dispatcher.metrics_snapshot().await;
    assert_eq!(snapshot["solid"].success, 1);
    assert_eq!(snapshot["broken"].failure, 1);
}

#[tokio::test]
async fn uninterested_observers_are_never_attempted() {
    let dispatcher = dispatcher();
    let observer = Arc::new(
        TestObserver::new("ticker-only").with_kinds(vec![EventKind::MarketDataUpdate]),
    );
    dispatcher.register(observer.clone()).await.unwrap();

    dispatcher.notify(critical_event()).await.unwrap();

    assert_eq!(observer.calls(), 0);
    let snapshot = dispatcher.metrics_snapshot().await;
    assert_eq!(snapshot["ticker-only"].total, 0);
}

#[tokio::test]
async fn introspection_tracks_registrations() {
    let dispatcher = dispatcher();
    dispatcher
        .register(Arc::new(
            TestObserver::new("alerts").with_kinds(vec![EventKind::PriceAlert]),
        ))
        .await
        .unwrap();
    dispatcher
        .register(Arc::new(TestObserver::new("everything")))
        .await
        .unwrap();

    assert_eq!(dispatcher.observer_count().await, 2);
    assert_eq!(dispatcher.observer_count_for(EventKind::PriceAlert).await, 2);
    assert_eq!(dispatcher.observer_count_for(EventKind::UserLogin).await, 1);
    assert!(dispatcher.is_registered("alerts").await);
    assert!(!dispatcher.is_registered("ghost").await);

    dispatcher.unregister("alerts").await.unwrap();
    assert_eq!(dispatcher.observer_count().await, 1);
    assert!(!dispatcher.is_registered("alerts").await);
}

#[tokio::test]
async fn registry_errors_surface_through_the_dispatcher() {
    let dispatcher = dispatcher();
    dispatcher
        .register(Arc::new(TestObserver::new("dup")))
        .await
        .unwrap();

    let err = dispatcher
        .register(Arc::new(TestObserver::new("dup")))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));

    let err = dispatcher.unregister("ghost").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn shutdown_drains_inflight_concurrent_deliveries() {
    let dispatcher = dispatcher();
    let observer = Arc::new(
        TestObserver::new("slowish").sleeping(Duration::from_millis(100)),
    );
    dispatcher.register(observer.clone()).await.unwrap();

    dispatcher.notify(routine_event()).await.unwrap();
    assert!(dispatcher.shutdown().await, "drain should finish within grace");

    assert_eq!(observer.calls(), 1);
    let snapshot = dispatcher.metrics_snapshot().await;
    assert_eq!(snapshot["slowish"].success, 1);
}

#[tokio::test]
async fn small_worker_pool_still_attempts_every_observer() {
    let cfg = DispatcherConfig {
        workers: 2,
        ..DispatcherConfig::default()
    };
    let dispatcher = Dispatcher::new(cfg).unwrap();
    let observers: Vec<_> = (0..6)
        .map(|i| Arc::new(TestObserver::new(&format!("pooled-{i}"))))
        .collect();
    for observer in &observers {
        dispatcher.register(observer.clone()).await.unwrap();
    }

    dispatcher.notify(routine_event()).await.unwrap();
    assert!(dispatcher.shutdown().await);

    for observer in &observers {
        assert_eq!(observer.calls(), 1);
    }
}
