//! # Dispatcher: publish pipeline over registered observers.
//!
//! One `notify` call walks a fixed state machine:
//!
//! ```text
//! Selecting ──► Ordering ──► Delivering ──► Completed
//!     │             │             │
//!     │             │             ├─ Critical: sequential, priority order,
//!     │             │             │   failures aggregated for the publisher
//!     │             │             └─ otherwise: one tracked task per observer
//!     │             │                 (fire-and-forget, worker pool bounded)
//!     │             └─ priority desc, registration order for ties
//!     └─ interested_in(kind) AND healthy; empty → no-op
//! ```
//!
//! ## Rules
//! - Metrics are updated for every attempted observer on every path before
//!   that observer's portion of the publish is considered done.
//! - Concurrent deliveries are spawned onto a [`TaskTracker`] so shutdown can
//!   drain them within the grace period; nothing is left unawaited.
//! - A slow or broken observer can neither block nor crash the publisher:
//!   per-delivery timeouts bound the critical path, and the concurrent path
//!   only logs failures.
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use eventvisor::{Dispatcher, DispatcherConfig, Event, EventKind, LogObserver};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(DispatcherConfig::default())?;
//!     dispatcher.register(Arc::new(LogObserver::new("audit-log"))).await?;
//!
//!     let tick = Event::builder(EventKind::MarketDataUpdate, "feed", "BTC-USD tick")
//!         .metadata("price", 104_250.0)
//!         .build()?;
//!     dispatcher.notify(tick).await?;
//!
//!     dispatcher.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::time;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::DispatcherConfig;
use crate::core::deliver::deliver_once;
use crate::core::metrics::MetricsSnapshot;
use crate::core::registry::{Registry, Selected};
use crate::error::{ConfigError, DeliveryFailure, DispatchError, RegistryError};
use crate::events::{Event, EventKind};
use crate::observers::ObserverRef;

/// Orchestrates event delivery to registered observers.
///
/// Owns the registry, the worker pool for concurrent delivery, and the
/// in-flight task group drained on shutdown. Construct one instance and
/// share it (`Arc`) with publishers; there is no ambient global.
pub struct Dispatcher {
    cfg: DispatcherConfig,
    registry: Registry,
    workers: Arc<Semaphore>,
    inflight: TaskTracker,
    stopped: AtomicBool,
}

impl Dispatcher {
    /// Creates a dispatcher from a validated configuration.
    pub fn new(cfg: DispatcherConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        info!(
            workers = cfg.workers,
            default_timeout_ms = cfg.default_timeout.as_millis() as u64,
            grace_ms = cfg.grace.as_millis() as u64,
            "dispatcher initialized"
        );
        Ok(Self {
            workers: Arc::new(Semaphore::new(cfg.workers)),
            inflight: TaskTracker::new(),
            stopped: AtomicBool::new(false),
            registry: Registry::new(),
            cfg,
        })
    }

    /// Registers an observer under its identity.
    pub async fn register(&self, observer: ObserverRef) -> Result<(), RegistryError> {
        self.registry.register(observer).await
    }

    /// Removes the observer with the given identity.
    pub async fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        self.registry.unregister(id).await
    }

    /// Publishes an event to every interested, healthy observer.
    ///
    /// Critical events are delivered synchronously in priority order and any
    /// partial failure is surfaced as
    /// [`DispatchError::SyncNotificationFailed`]. All other severities fan
    /// out to the worker pool; the call returns without waiting for their
    /// completion and their failures are only logged and recorded.
    pub async fn notify(&self, event: Event) -> Result<(), DispatchError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(DispatchError::ShutdownInProgress);
        }

        // Selecting: interest + health, copied out of the registry.
        let mut selected = self.registry.select(event.kind()).await;
        if selected.is_empty() {
            debug!(event_id = %event.id(), kind = ?event.kind(), "no interested observers");
            return Ok(());
        }

        // Ordering: priority descending, registration order for ties.
        selected.sort_by(|a, b| {
            let pa = a.observer.priority().clamp(1, 10);
            let pb = b.observer.priority().clamp(1, 10);
            pb.cmp(&pa).then(a.seq.cmp(&b.seq))
        });

        debug!(
            event_id = %event.id(),
            kind = ?event.kind(),
            severity = event.severity().display_name(),
            observers = selected.len(),
            "dispatching event"
        );

        if event.is_critical() {
            self.deliver_sync(selected, &event).await
        } else {
            self.deliver_concurrent(selected, event);
            Ok(())
        }
    }

    /// Sequential delivery on the publisher's own task. Every observer is
    /// attempted even after failures; the aggregate error reports each one.
    async fn deliver_sync(
        &self,
        selected: Vec<Selected>,
        event: &Event,
    ) -> Result<(), DispatchError> {
        let mut failures = Vec::new();

        for entry in selected {
            if let Err(err) = deliver_once(
                entry.observer.as_ref(),
                &entry.metrics,
                event,
                self.cfg.default_timeout,
            )
            .await
            {
                failures.push(DeliveryFailure {
                    observer: entry.observer.id().to_string(),
                    error: err,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::SyncNotificationFailed { failures })
        }
    }

    /// Fan-out delivery: one tracked task per observer, bounded by the worker
    /// pool. Outcomes are recorded inside each task; nothing reaches the
    /// publisher.
    fn deliver_concurrent(&self, selected: Vec<Selected>, event: Event) {
        let event = Arc::new(event);

        for entry in selected {
            let event = Arc::clone(&event);
            let workers = Arc::clone(&self.workers);
            let default_timeout = self.cfg.default_timeout;

            self.inflight.spawn(async move {
                let _permit = match workers.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_closed) => return,
                };
                // deliver_once records metrics and logs the outcome; failures
                // stop here instead of crossing the fire-and-forget boundary.
                let _ = deliver_once(
                    entry.observer.as_ref(),
                    &entry.metrics,
                    &event,
                    default_timeout,
                )
                .await;
            });
        }
    }

    /// Number of registered observers.
    pub async fn observer_count(&self) -> usize {
        self.registry.count().await
    }

    /// Number of observers interested in the given kind.
    pub async fn observer_count_for(&self, kind: EventKind) -> usize {
        self.registry.count_interested_in(kind).await
    }

    /// Whether the identity is currently registered.
    pub async fn is_registered(&self, id: &str) -> bool {
        self.registry.is_registered(id).await
    }

    /// Read-only copy of every observer's delivery counters.
    pub async fn metrics_snapshot(&self) -> HashMap<String, MetricsSnapshot> {
        self.registry.metrics_snapshot().await
    }

    /// Whether `shutdown` has been called.
    pub fn is_shut_down(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Stops accepting publishes and drains in-flight concurrent deliveries.
    ///
    /// Waits up to the configured grace period; returns `true` when every
    /// in-flight delivery finished in time. Idempotent: later calls just
    /// re-await the (already drained) task group.
    pub async fn shutdown(&self) -> bool {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            info!("dispatcher shutting down");
        }
        self.inflight.close();

        let drained = time::timeout(self.cfg.grace, self.inflight.wait())
            .await
            .is_ok();
        if drained {
            info!("all in-flight deliveries drained");
        } else {
            warn!(
                grace_ms = self.cfg.grace.as_millis() as u64,
                pending = self.inflight.len(),
                "grace exceeded; abandoning in-flight deliveries"
            );
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_config() {
        let cfg = DispatcherConfig {
            workers: 0,
            ..DispatcherConfig::default()
        };
        assert!(Dispatcher::new(cfg).is_err());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_blocks_publishes() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
        assert!(!dispatcher.is_shut_down());

        assert!(dispatcher.shutdown().await);
        assert!(dispatcher.shutdown().await);
        assert!(dispatcher.is_shut_down());

        let event = Event::builder(EventKind::MarketDataUpdate, "feed", "tick")
            .build()
            .unwrap();
        let err = dispatcher.notify(event).await.unwrap_err();
        assert!(matches!(err, DispatchError::ShutdownInProgress));
    }

    #[tokio::test]
    async fn empty_selection_is_a_no_op() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
        let event = Event::builder(EventKind::SystemError, "core", "nobody listens")
            .build()
            .unwrap();
        assert!(dispatcher.notify(event).await.is_ok());
    }
}
