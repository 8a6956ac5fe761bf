//! # Jitter applied to retry delays.
//!
//! [`spread`] randomizes a computed backoff delay to prevent thundering-herd
//! effects when multiple callers retry simultaneously. It multiplies the delay
//! by a factor sampled uniformly from `[0.5, 1.5]`, preserving the delay's
//! magnitude while desynchronizing retriers.
//!
//! Jitter lives outside [`BackoffPolicy`](crate::BackoffPolicy) so the delay
//! math stays deterministic and testable; the retry executor applies it right
//! before sleeping.

use rand::Rng;
use std::time::Duration;

/// Lower and upper bound of the jitter factor.
const FACTOR_MIN: f64 = 0.5;
const FACTOR_MAX: f64 = 1.5;

/// Randomizes `delay` by a uniform factor in `[0.5, 1.5]`.
///
/// A zero delay stays zero.
pub fn spread(delay: Duration) -> Duration {
    if delay.is_zero() {
        return Duration::ZERO;
    }
    let factor = rand::rng().random_range(FACTOR_MIN..=FACTOR_MAX);
    delay.mul_f64(factor)
}
