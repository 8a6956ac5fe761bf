//! # Per-observer health record.
//!
//! [`ObserverMetrics`] tracks delivery outcomes and latency for one
//! registered identity. The dispatcher is the only writer; updates happen
//! after each delivery attempt completes (success, failure, or timeout).
//!
//! ## Invariant
//! `total == success + failure + timeout` after every update. The counters
//! live behind one short-lived `std::sync::Mutex` per record, never held
//! across an await, so the invariant is also what any concurrent reader sees.
//!
//! ## Circuit breaker
//! [`ObserverMetrics::is_healthy`] implements a ratio-only breaker: an
//! observer is unhealthy while `total > 10` and more than half of its
//! deliveries failed or timed out. There is no open/half-open state and no
//! recovery timer; health is recomputed from the live counters on every
//! dispatch pass, so enough subsequent successes readmit the observer
//! automatically.

use std::sync::Mutex;
use std::time::Duration;

/// Health threshold: breaker only engages past this sample size.
const HEALTH_MIN_SAMPLES: u64 = 10;
/// Health threshold: failure ratio above which the observer is skipped.
const HEALTH_MAX_FAILURE_RATE: f64 = 0.5;

#[derive(Default)]
struct Counters {
    total: u64,
    success: u64,
    failure: u64,
    timeout: u64,
    latency_sum: Duration,
    latency_min: Option<Duration>,
    latency_max: Duration,
}

impl Counters {
    fn observe_latency(&mut self, elapsed: Duration) {
        self.latency_sum += elapsed;
        self.latency_max = self.latency_max.max(elapsed);
        self.latency_min = Some(match self.latency_min {
            Some(min) => min.min(elapsed),
            None => elapsed,
        });
    }

    fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.failure + self.timeout) as f64 / self.total as f64
        }
    }
}

/// Delivery counters and latency bounds for one observer.
///
/// Created at registration, dropped at unregistration. Writers go through
/// the `record_*` methods; readers take [`snapshot`](ObserverMetrics::snapshot).
pub(crate) struct ObserverMetrics {
    inner: Mutex<Counters>,
}

impl ObserverMetrics {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Counters::default()),
        }
    }

    /// Records a completed delivery.
    pub(crate) fn record_success(&self, elapsed: Duration) {
        let mut c = self.inner.lock().expect("metrics mutex poisoned");
        c.total += 1;
        c.success += 1;
        c.observe_latency(elapsed);
    }

    /// Records a failed delivery (observer error or panic).
    pub(crate) fn record_failure(&self, elapsed: Duration) {
        let mut c = self.inner.lock().expect("metrics mutex poisoned");
        c.total += 1;
        c.failure += 1;
        c.observe_latency(elapsed);
    }

    /// Records an abandoned delivery that exceeded its budget.
    pub(crate) fn record_timeout(&self, elapsed: Duration) {
        let mut c = self.inner.lock().expect("metrics mutex poisoned");
        c.total += 1;
        c.timeout += 1;
        c.observe_latency(elapsed);
    }

    /// Ratio circuit breaker, recomputed from live counters.
    pub(crate) fn is_healthy(&self) -> bool {
        let c = self.inner.lock().expect("metrics mutex poisoned");
        !(c.total > HEALTH_MIN_SAMPLES && c.failure_rate() > HEALTH_MAX_FAILURE_RATE)
    }

    /// Read-only copy of the current counters.
    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        let c = self.inner.lock().expect("metrics mutex poisoned");
        MetricsSnapshot {
            total: c.total,
            success: c.success,
            failure: c.failure,
            timeout: c.timeout,
            min_processing_time: c.latency_min.unwrap_or(Duration::ZERO),
            max_processing_time: c.latency_max,
            avg_processing_time: if c.total == 0 {
                Duration::ZERO
            } else {
                c.latency_sum / c.total as u32
            },
        }
    }
}

/// Plain-data copy of one observer's counters, as returned by
/// [`Dispatcher::metrics_snapshot`](crate::Dispatcher::metrics_snapshot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Deliveries attempted.
    pub total: u64,
    /// Deliveries that completed successfully.
    pub success: u64,
    /// Deliveries that failed (error or panic).
    pub failure: u64,
    /// Deliveries abandoned after exceeding their budget.
    pub timeout: u64,
    /// Fastest observed delivery (zero when nothing recorded).
    pub min_processing_time: Duration,
    /// Slowest observed delivery.
    pub max_processing_time: Duration,
    /// Mean delivery time.
    pub avg_processing_time: Duration,
}

impl MetricsSnapshot {
    /// Share of deliveries that failed or timed out.
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.failure + self.timeout) as f64 / self.total as f64
        }
    }

    /// Share of deliveries that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.success as f64 / self.total as f64
        }
    }
}
