//! # One delivery attempt to one observer.
//!
//! [`deliver_once`] executes a single `on_event` invocation with its timeout
//! budget, records the outcome in the observer's metrics, and emits exactly
//! one structured log line.
//!
//! ## Outcome flow
//! ```text
//! on_event() ── Ok            ─► record_success ─► Ok
//!            ── Err(e)        ─► record_failure ─► Err(Failed)
//!            ── panic         ─► record_failure ─► Err(Failed { panic })
//!            ── budget exceeded ─► record_timeout ─► Err(Timeout)
//! ```
//!
//! ## Rules
//! - The budget is `min(observer.max_processing_time, default_timeout)`.
//! - A timed-out invocation is abandoned (its future is dropped), not
//!   force-killed; the observer may be unable to react if it is stuck in
//!   non-cooperative work.
//! - Panics are isolated with `catch_unwind` so a broken observer cannot
//!   unwind into the dispatcher.
//! - Exactly one metrics update and one log line per attempt, on every path.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{self, Instant};
use tracing::{debug, error, warn};

use crate::core::metrics::ObserverMetrics;
use crate::error::DeliveryError;
use crate::events::Event;
use crate::observers::Observer;

/// Executes one delivery attempt and records its outcome.
pub(crate) async fn deliver_once(
    observer: &dyn Observer,
    metrics: &ObserverMetrics,
    event: &Event,
    default_timeout: Duration,
) -> Result<(), DeliveryError> {
    let budget = observer.max_processing_time().min(default_timeout);
    let started = Instant::now();

    let attempt = AssertUnwindSafe(observer.on_event(event)).catch_unwind();
    let outcome = time::timeout(budget, attempt).await;
    let elapsed = started.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;

    match outcome {
        Err(_deadline) => {
            metrics.record_timeout(elapsed);
            warn!(
                event_id = %event.id(),
                observer = observer.id(),
                outcome = "timeout",
                elapsed_ms,
                budget_ms = budget.as_millis() as u64,
                "delivery abandoned after timeout"
            );
            Err(DeliveryError::Timeout { timeout: budget })
        }
        Ok(Err(panic)) => {
            let reason = format!("panic: {}", panic_message(panic.as_ref()));
            metrics.record_failure(elapsed);
            error!(
                event_id = %event.id(),
                observer = observer.id(),
                outcome = "failure",
                elapsed_ms,
                error = %reason,
                "observer panicked during delivery"
            );
            Err(DeliveryError::Failed { reason })
        }
        Ok(Ok(Err(err))) => {
            metrics.record_failure(elapsed);
            error!(
                event_id = %event.id(),
                observer = observer.id(),
                outcome = "failure",
                elapsed_ms,
                error = %err,
                "observer failed to process event"
            );
            Err(DeliveryError::Failed {
                reason: err.to_string(),
            })
        }
        Ok(Ok(Ok(()))) => {
            metrics.record_success(elapsed);
            debug!(
                event_id = %event.id(),
                observer = observer.id(),
                outcome = "success",
                elapsed_ms,
                "event delivered"
            );
            Ok(())
        }
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObserverError;
    use crate::events::EventKind;
    use async_trait::async_trait;

    struct Scripted {
        id: &'static str,
        budget: Duration,
        mode: Mode,
    }

    enum Mode {
        Succeed,
        Fail,
        Panic,
        Sleep(Duration),
    }

    #[async_trait]
    impl Observer for Scripted {
        async fn on_event(&self, _event: &Event) -> Result<(), ObserverError> {
            match self.mode {
                Mode::Succeed => Ok(()),
                Mode::Fail => Err(ObserverError::new("scripted failure")),
                Mode::Panic => panic!("scripted panic"),
                Mode::Sleep(dur) => {
                    time::sleep(dur).await;
                    Ok(())
                }
            }
        }

        fn id(&self) -> &str {
            self.id
        }

        fn interested_in(&self, _kind: EventKind) -> bool {
            true
        }

        fn max_processing_time(&self) -> Duration {
            self.budget
        }
    }

    fn probe() -> Event {
        Event::builder(EventKind::PriceAlert, "test", "probe")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn success_records_exactly_one_success() {
        let observer = Scripted {
            id: "ok",
            budget: Duration::from_secs(1),
            mode: Mode::Succeed,
        };
        let metrics = ObserverMetrics::new();

        let result = deliver_once(&observer, &metrics, &probe(), Duration::from_secs(5)).await;

        assert!(result.is_ok());
        let snap = metrics.snapshot();
        assert_eq!((snap.total, snap.success, snap.failure, snap.timeout), (1, 1, 0, 0));
    }

    #[tokio::test]
    async fn failure_records_exactly_one_failure() {
        let observer = Scripted {
            id: "broken",
            budget: Duration::from_secs(1),
            mode: Mode::Fail,
        };
        let metrics = ObserverMetrics::new();

        let result = deliver_once(&observer, &metrics, &probe(), Duration::from_secs(5)).await;

        assert!(matches!(result, Err(DeliveryError::Failed { .. })));
        let snap = metrics.snapshot();
        assert_eq!((snap.total, snap.success, snap.failure, snap.timeout), (1, 0, 1, 0));
    }

    #[tokio::test]
    async fn panic_is_caught_and_counts_as_failure() {
        let observer = Scripted {
            id: "bomb",
            budget: Duration::from_secs(1),
            mode: Mode::Panic,
        };
        let metrics = ObserverMetrics::new();

        let result = deliver_once(&observer, &metrics, &probe(), Duration::from_secs(5)).await;

        match result {
            Err(DeliveryError::Failed { reason }) => assert!(reason.contains("scripted panic")),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(metrics.snapshot().failure, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_records_timeout_not_failure() {
        let observer = Scripted {
            id: "slow",
            budget: Duration::from_millis(50),
            mode: Mode::Sleep(Duration::from_secs(30)),
        };
        let metrics = ObserverMetrics::new();

        let result = deliver_once(&observer, &metrics, &probe(), Duration::from_secs(5)).await;

        assert!(matches!(
            result,
            Err(DeliveryError::Timeout { timeout }) if timeout == Duration::from_millis(50)
        ));
        let snap = metrics.snapshot();
        assert_eq!((snap.total, snap.success, snap.failure, snap.timeout), (1, 0, 0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn dispatcher_default_caps_generous_observer_budgets() {
        let observer = Scripted {
            id: "slow",
            budget: Duration::from_secs(600),
            mode: Mode::Sleep(Duration::from_secs(30)),
        };
        let metrics = ObserverMetrics::new();

        let result = deliver_once(&observer, &metrics, &probe(), Duration::from_secs(1)).await;

        assert!(matches!(
            result,
            Err(DeliveryError::Timeout { timeout }) if timeout == Duration::from_secs(1)
        ));
    }
}
