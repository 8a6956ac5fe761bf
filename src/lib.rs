//! # eventvisor
//!
//! **Eventvisor** is a lightweight event notification library for Rust.
//!
//! It delivers typed system events to registered observers under priority
//! ordering, per-observer timeouts, and a failure-driven circuit breaker,
//! and ships a generic retry-with-backoff executor for wrapping fallible
//! operations. Delivery is in-process, best-effort, and at-most-once per
//! observer.
//!
//! ## Architecture
//! ```text
//!  publisher ── notify(Event) ──► Dispatcher
//!                                    │
//!                       ┌────────────┼──────────────────────┐
//!                       ▼            ▼                      ▼
//!                  Registry     health filter          priority sort
//!               (id → observer  (per-observer          (desc, ties by
//!                + metrics)      ratio breaker)         registration)
//!                       │
//!        ┌──────────────┴───────────────┐
//!        ▼ severity == Critical         ▼ otherwise
//!  sequential delivery            worker pool (Semaphore)
//!  on the publisher's task        one tracked task per observer
//!  failures aggregated            failures logged + recorded only
//!        │                              │
//!        └──────────► deliver_once ◄────┘
//!                (timeout = min(observer budget, default),
//!                 panic isolation, metrics update, log line)
//! ```
//!
//! ## Delivery semantics
//! - **Critical events** run synchronously in priority order; the publisher
//!   sees an aggregate error listing every failing observer.
//! - **Everything else** fans out concurrently; the publish call does not
//!   block on completion, but every delivery is tracked and drained on
//!   [`Dispatcher::shutdown`].
//! - Each delivery is bounded by `min(observer.max_processing_time,
//!   config.default_timeout)`; overruns count as timeouts, not failures.
//! - An observer whose recorded deliveries show `total > 10` with a failure
//!   ratio above 0.5 is skipped on subsequent passes until successes dilute
//!   the ratio. No half-open state, no recovery timer.
//!
//! ## Retry
//! [`RetryExecutor`] wraps any async operation returning
//! `Result<T, OperationError>`: fatal errors abort immediately, retryable
//! ones back off exponentially (jittered) up to a bounded attempt count,
//! and cancellation during a backoff sleep interrupts the whole call.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::{
//!     Dispatcher, DispatcherConfig, Event, EventKind, LogObserver, SecurityObserver,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(DispatcherConfig::default())?;
//!     dispatcher.register(Arc::new(LogObserver::new("audit-log"))).await?;
//!     dispatcher.register(Arc::new(SecurityObserver::with_defaults("security"))).await?;
//!
//!     // Medium severity: fans out to the worker pool, returns immediately.
//!     let login = Event::builder(EventKind::UserLogin, "auth-service", "login attempt")
//!         .metadata("user_id", "alice")
//!         .metadata("ip_address", "10.1.2.3")
//!         .metadata("success", true)
//!         .build()?;
//!     dispatcher.notify(login).await?;
//!
//!     // Critical severity (defaulted from the kind): synchronous delivery,
//!     // partial failures would surface here.
//!     let alert = Event::builder(EventKind::SecurityAlert, "auth-service", "token reuse")
//!         .correlation_id("incident-42")
//!         .build()?;
//!     dispatcher.notify(alert).await?;
//!
//!     dispatcher.shutdown().await;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod observers;
mod policies;
mod retry;

// ---- Public re-exports ----

pub use config::{DispatcherConfig, RetryConfig};
pub use core::{Dispatcher, MetricsSnapshot};
pub use error::{
    ConfigError, DeliveryError, DeliveryFailure, DispatchError, EventError, ObserverError,
    OperationError, RegistryError, RetryError,
};
pub use events::{Event, EventBuilder, EventKind, MetaValue, Severity};
pub use observers::{LogObserver, Observer, ObserverRef, SecurityObserver};
pub use policies::BackoffPolicy;
pub use retry::RetryExecutor;
