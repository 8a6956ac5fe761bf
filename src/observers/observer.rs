//! # Observer trait.
//!
//! [`Observer`] is the capability set the dispatcher works against:
//! event handling plus identity, priority, interest filtering, a processing
//! budget, and optional lifecycle hooks.
//!
//! ## Delivery contract
//! - `on_event` is called at most once per `notify` for a given event.
//! - Each invocation is bounded by
//!   `min(max_processing_time, dispatcher default_timeout)`; overruns are
//!   recorded as timeouts and the invocation is abandoned.
//! - Critical events arrive on the publisher's own task, in priority order;
//!   everything else arrives on a pooled worker with no cross-observer
//!   ordering.
//!
//! ## Example
//! ```
//! use async_trait::async_trait;
//! use eventvisor::{Event, EventKind, Observer, ObserverError};
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Observer for Metrics {
//!     async fn on_event(&self, event: &Event) -> Result<(), ObserverError> {
//!         if event.kind() == EventKind::TradeFailed {
//!             // export a counter, etc.
//!         }
//!         Ok(())
//!     }
//!
//!     fn id(&self) -> &str { "metrics" }
//!     fn interested_in(&self, _kind: EventKind) -> bool { true }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ObserverError;
use crate::events::{Event, EventKind};

/// Shared handle to an observer.
pub type ObserverRef = Arc<dyn Observer>;

/// A registered event consumer.
///
/// Implementations must not block the executor; use async I/O and return
/// promptly. A slow observer only hurts itself (timeouts accumulate in its
/// metrics and eventually trip the health breaker).
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    /// Handles one event.
    ///
    /// Errors are recorded against this observer's metrics; on the critical
    /// path they are also surfaced to the publisher inside the aggregate
    /// failure. Panics are caught and treated as failures.
    async fn on_event(&self, event: &Event) -> Result<(), ObserverError>;

    /// Stable identity used for registration, metrics, and logs.
    fn id(&self) -> &str;

    /// Delivery priority within one dispatch pass: 1–10, 10 served first.
    ///
    /// Values outside the range are clamped by the dispatcher.
    fn priority(&self) -> u8 {
        5
    }

    /// Whether this observer wants events of the given kind.
    fn interested_in(&self, kind: EventKind) -> bool;

    /// Per-delivery processing budget.
    ///
    /// The effective budget is the minimum of this value and the
    /// dispatcher's `default_timeout`.
    fn max_processing_time(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Invoked after successful registration. Panics are caught and logged.
    fn on_registered(&self) {}

    /// Invoked after removal from the registry. Panics are caught and logged.
    fn on_unregistered(&self) {}
}
