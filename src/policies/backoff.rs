//! # Backoff policy for retrying operations.
//!
//! [`BackoffPolicy`] controls how retry delays grow after repeated failures.
//! It is parameterized by:
//! - [`BackoffPolicy::base`] the delay before the first retry;
//! - [`BackoffPolicy::multiplier`] the multiplicative growth factor;
//! - [`BackoffPolicy::cap`] the maximum delay.
//!
//! The delay for attempt `n` (0-indexed for the first retry) is computed as
//! `base × multiplier^n`, clamped to `cap`. The policy is pure: jitter is
//! applied by the retry executor on top of the returned value, never fed back
//! into subsequent calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use eventvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy {
//!     base: Duration::from_millis(100),
//!     multiplier: 2.0,
//!     cap: Duration::from_secs(10),
//! };
//!
//! assert_eq!(backoff.delay(0), Duration::from_millis(100));
//! assert_eq!(backoff.delay(1), Duration::from_millis(200));
//! // 100ms × 2^10 = 102_400ms → capped at 10s
//! assert_eq!(backoff.delay(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

/// Deterministic exponential backoff.
///
/// Encapsulates the parameters that determine how retry delays grow:
/// - [`BackoffPolicy::base`] — delay before the first retry;
/// - [`BackoffPolicy::multiplier`] — growth factor (`>= 1.0` recommended);
/// - [`BackoffPolicy::cap`] — upper bound on any computed delay.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Multiplicative growth factor.
    pub multiplier: f64,
    /// Maximum delay.
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    /// Returns a policy with `base = 1s`, `multiplier = 2.0`, `cap = 10s`.
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            cap: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given retry attempt (0-indexed).
    ///
    /// The result is `base × multiplier^attempt`, clamped to
    /// [`BackoffPolicy::cap`]. Each attempt derives its delay independently
    /// from the attempt number, so jittered sleeps never distort later
    /// delays.
    ///
    /// # Notes
    /// - A `multiplier` of 1.0 keeps the delay constant at `base` (up to `cap`).
    /// - Overflowing or non-finite intermediate values clamp to `cap`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let cap_secs = self.cap.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let raw_secs = self.base.as_secs_f64() * self.multiplier.powi(exp);

        if !raw_secs.is_finite() || raw_secs < 0.0 || raw_secs > cap_secs {
            self.cap
        } else {
            Duration::from_secs_f64(raw_secs)
        }
    }
}
