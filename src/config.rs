//! # Runtime configuration.
//!
//! [`DispatcherConfig`] controls the dispatcher: worker-pool size, the default
//! per-delivery timeout, and the shutdown grace period. [`RetryConfig`]
//! bundles the retry executor's knobs (attempt budget and backoff shape).
//!
//! Both are validated at construction of the component that consumes them;
//! out-of-range values are rejected with [`ConfigError`] instead of being
//! silently clamped.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use eventvisor::{DispatcherConfig, RetryConfig};
//!
//! let mut cfg = DispatcherConfig::default();
//! cfg.workers = 8;
//! cfg.default_timeout = Duration::from_secs(2);
//! assert!(cfg.validate().is_ok());
//!
//! let retry = RetryConfig::default();
//! assert_eq!(retry.max_retries, 3);
//! ```

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::BackoffPolicy;

/// Allowed worker-pool size for concurrent dispatch.
const WORKERS_MIN: usize = 1;
const WORKERS_MAX: usize = 50;

/// Allowed default per-delivery timeout.
const TIMEOUT_MIN: Duration = Duration::from_millis(100);
const TIMEOUT_MAX: Duration = Duration::from_secs(60);

/// Configuration for the [`Dispatcher`](crate::Dispatcher).
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Number of workers available for concurrent (non-critical) delivery.
    pub workers: usize,
    /// Upper bound on any single delivery; each observer's own budget is
    /// capped by this value.
    pub default_timeout: Duration,
    /// Maximum time `shutdown()` waits for in-flight deliveries to drain.
    pub grace: Duration,
}

impl Default for DispatcherConfig {
    /// Provides a default configuration:
    /// - `workers = 5`
    /// - `default_timeout = 5s`
    /// - `grace = 10s`
    fn default() -> Self {
        Self {
            workers: 5,
            default_timeout: Duration::from_secs(5),
            grace: Duration::from_secs(10),
        }
    }
}

impl DispatcherConfig {
    /// Validates the configuration.
    ///
    /// Rules:
    /// - `workers` within 1..=50;
    /// - `default_timeout` within 100ms..=60s.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(WORKERS_MIN..=WORKERS_MAX).contains(&self.workers) {
            return Err(ConfigError::OutOfRange {
                param: "workers",
                min: WORKERS_MIN.to_string(),
                max: WORKERS_MAX.to_string(),
                got: self.workers.to_string(),
            });
        }
        if self.default_timeout < TIMEOUT_MIN || self.default_timeout > TIMEOUT_MAX {
            return Err(ConfigError::OutOfRange {
                param: "default_timeout",
                min: format!("{TIMEOUT_MIN:?}"),
                max: format!("{TIMEOUT_MAX:?}"),
                got: format!("{:?}", self.default_timeout),
            });
        }
        Ok(())
    }
}

/// Configuration for the [`RetryExecutor`](crate::RetryExecutor).
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Number of retries after the initial attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplicative growth factor between attempts (`>= 1.0`).
    pub multiplier: f64,
    /// Cap on the computed delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    /// Provides a default configuration:
    /// - `max_retries = 3`
    /// - `base_delay = 1s`
    /// - `multiplier = 2.0`
    /// - `max_delay = 10s`
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Validates the configuration.
    ///
    /// Rules:
    /// - `base_delay > 0`;
    /// - `multiplier` finite and `>= 1.0`;
    /// - `max_delay >= base_delay`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_delay.is_zero() {
            return Err(ConfigError::TooSmall {
                param: "base_delay",
                min: "1ms".to_string(),
                got: format!("{:?}", self.base_delay),
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::TooSmall {
                param: "multiplier",
                min: "1.0".to_string(),
                got: self.multiplier.to_string(),
            });
        }
        if self.max_delay < self.base_delay {
            return Err(ConfigError::TooSmall {
                param: "max_delay",
                min: format!("{:?}", self.base_delay),
                got: format!("{:?}", self.max_delay),
            });
        }
        Ok(())
    }

    /// Builds the backoff policy described by this configuration.
    pub(crate) fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            base: self.base_delay,
            multiplier: self.multiplier,
            cap: self.max_delay,
        }
    }
}
