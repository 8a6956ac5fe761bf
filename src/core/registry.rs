//! # Observer registry.
//!
//! Owns the identity → observer mapping and each observer's metrics record.
//! The registry is the sole writer of the map; the dispatcher reads it
//! through [`select`](Registry::select) snapshots.
//!
//! ## Rules
//! - Registration order is remembered via a monotonic sequence number so
//!   dispatch can break priority ties deterministically.
//! - Lifecycle hooks (`on_registered` / `on_unregistered`) run outside the
//!   map lock; a panicking hook is caught and logged, never propagated.
//! - `select` copies the matching entries out under the read lock, so no
//!   lock is held across delivery suspension points, and register/unregister
//!   stay mutually exclusive with in-progress selections.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::core::deliver::panic_message;
use crate::core::metrics::{MetricsSnapshot, ObserverMetrics};
use crate::error::RegistryError;
use crate::events::EventKind;
use crate::observers::ObserverRef;

struct Entry {
    observer: ObserverRef,
    metrics: Arc<ObserverMetrics>,
    seq: u64,
}

/// One observer picked for a dispatch pass, copied out of the registry.
pub(crate) struct Selected {
    pub(crate) observer: ObserverRef,
    pub(crate) metrics: Arc<ObserverMetrics>,
    pub(crate) seq: u64,
}

/// Identity-keyed observer store.
pub(crate) struct Registry {
    entries: RwLock<HashMap<String, Entry>>,
    next_seq: AtomicU64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Stores an observer and creates its fresh metrics record.
    ///
    /// Fails when the identity is already present. The `on_registered` hook
    /// runs after the map lock is released.
    pub(crate) async fn register(&self, observer: ObserverRef) -> Result<(), RegistryError> {
        let id = observer.id().to_string();

        {
            let mut entries = self.entries.write().await;
            if entries.contains_key(&id) {
                return Err(RegistryError::AlreadyRegistered { id });
            }
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            entries.insert(
                id.clone(),
                Entry {
                    observer: observer.clone(),
                    metrics: Arc::new(ObserverMetrics::new()),
                    seq,
                },
            );
        }

        run_hook(&id, "on_registered", || observer.on_registered());
        info!(
            observer = %id,
            priority = observer.priority(),
            budget_ms = observer.max_processing_time().as_millis() as u64,
            "observer registered"
        );
        Ok(())
    }

    /// Removes an observer and its metrics record.
    ///
    /// Fails when the identity is unknown. The `on_unregistered` hook runs
    /// after the map lock is released.
    pub(crate) async fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        let entry = {
            let mut entries = self.entries.write().await;
            entries.remove(id).ok_or_else(|| RegistryError::NotFound {
                id: id.to_string(),
            })?
        };

        run_hook(id, "on_unregistered", || entry.observer.on_unregistered());
        info!(observer = %id, "observer unregistered");
        Ok(())
    }

    /// Number of registered observers.
    pub(crate) async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Number of observers interested in the given kind (health ignored).
    pub(crate) async fn count_interested_in(&self, kind: EventKind) -> usize {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|e| e.observer.interested_in(kind))
            .count()
    }

    /// Whether the identity is currently registered.
    pub(crate) async fn is_registered(&self, id: &str) -> bool {
        self.entries.read().await.contains_key(id)
    }

    /// Copies out every observer that is interested in `kind` and currently
    /// healthy. Order is unspecified; the dispatcher sorts.
    pub(crate) async fn select(&self, kind: EventKind) -> Vec<Selected> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|e| e.observer.interested_in(kind) && e.metrics.is_healthy())
            .map(|e| Selected {
                observer: e.observer.clone(),
                metrics: Arc::clone(&e.metrics),
                seq: e.seq,
            })
            .collect()
    }

    /// Read-only copy of every identity's counters.
    pub(crate) async fn metrics_snapshot(&self) -> HashMap<String, MetricsSnapshot> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|(id, e)| (id.clone(), e.metrics.snapshot()))
            .collect()
    }
}

/// Runs a lifecycle hook, catching and logging a panic instead of
/// propagating it. Hooks are best-effort notifications.
fn run_hook(id: &str, hook: &'static str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        warn!(
            observer = %id,
            hook,
            panic = %panic_message(payload.as_ref()),
            "observer lifecycle hook panicked"
        );
    }
}
