//! Error types used across the eventvisor runtime.
//!
//! The taxonomy splits along component boundaries:
//!
//! - [`RegistryError`] — registration mistakes (duplicate / unknown identity).
//! - [`DeliveryError`] — one delivery attempt to one observer.
//! - [`DispatchError`] — errors surfaced by [`notify`](crate::Dispatcher::notify)
//!   itself (only the synchronous/critical path raises anything).
//! - [`ObserverError`] — what an [`Observer`](crate::Observer) returns from
//!   `on_event`.
//! - [`OperationError`] / [`RetryError`] — the retry executor's input and
//!   output failure types.
//! - [`EventError`] / [`ConfigError`] — construction-time validation.
//!
//! The enums provide `as_label()` returning a short stable snake_case label
//! for logs and metrics.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by observer registration and removal.
///
/// Both variants are caller mistakes and never retryable.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// An observer with the same identity is already registered.
    #[error("observer '{id}' is already registered")]
    AlreadyRegistered {
        /// The conflicting observer identity.
        id: String,
    },

    /// No observer with this identity is registered.
    #[error("observer '{id}' is not registered")]
    NotFound {
        /// The missing observer identity.
        id: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::RegistryError;
    ///
    /// let err = RegistryError::NotFound { id: "audit".into() };
    /// assert_eq!(err.as_label(), "registry_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::AlreadyRegistered { .. } => "registry_already_registered",
            RegistryError::NotFound { .. } => "registry_not_found",
        }
    }
}

/// Outcome of a single failed delivery attempt to one observer.
///
/// The dispatcher never retries deliveries itself; callers wanting retry
/// semantics wrap the publish in a [`RetryExecutor`](crate::RetryExecutor).
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum DeliveryError {
    /// The observer did not finish within its processing budget.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The budget that was exceeded (min of observer and dispatcher limits).
        timeout: Duration,
    },

    /// The observer returned an error or panicked.
    #[error("observer failed: {reason}")]
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Timeout { .. } => "delivery_timeout",
            DeliveryError::Failed { .. } => "delivery_failed",
        }
    }

    /// Indicates whether the failure is safe to retry by policy.
    ///
    /// Both timeouts and failures are transient from the dispatcher's point
    /// of view; whether to actually retry is the caller's decision.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeliveryError::Timeout { .. } | DeliveryError::Failed { .. }
        )
    }
}

/// One failing identity inside a [`DispatchError::SyncNotificationFailed`].
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    /// Identity of the observer that failed.
    pub observer: String,
    /// What went wrong for that observer.
    pub error: DeliveryError,
}

impl std::fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.observer, self.error)
    }
}

fn join_failures(failures: &[DeliveryFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors surfaced to publishers by [`notify`](crate::Dispatcher::notify).
///
/// Concurrent (non-critical) delivery never raises: its failures are recorded
/// in metrics and logged only.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The dispatcher has been shut down and accepts no new publishes.
    #[error("dispatcher is shut down")]
    ShutdownInProgress,

    /// One or more observers failed during synchronous (critical) delivery.
    ///
    /// Every selected observer was still attempted; `failures` lists each
    /// failing identity with its error so callers can detect partial failure.
    #[error("failed to notify {} observer(s): {}", .failures.len(), join_failures(.failures))]
    SyncNotificationFailed {
        /// Per-observer failures, in delivery (priority) order.
        failures: Vec<DeliveryFailure>,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::ShutdownInProgress => "dispatch_shutdown",
            DispatchError::SyncNotificationFailed { .. } => "dispatch_sync_failed",
        }
    }
}

/// Error returned by an observer's `on_event`.
///
/// Carries a retryability hint for callers that feed deliveries through the
/// retry executor; the dispatcher itself only records and logs it.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ObserverError {
    message: String,
    retryable: bool,
}

impl ObserverError {
    /// Creates a retryable observer error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable observer error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    /// Indicates whether the failure is safe to retry.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Failure of an operation run under the retry executor.
///
/// The executor inspects [`is_retryable`](OperationError::is_retryable) to
/// decide between backing off and aborting.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum OperationError {
    /// Transient failure; the executor may attempt again.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable failure; aborts immediately without consuming retries.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl OperationError {
    /// Convenience constructor for a transient failure.
    pub fn fail(error: impl Into<String>) -> Self {
        OperationError::Fail {
            error: error.into(),
        }
    }

    /// Convenience constructor for a fatal failure.
    pub fn fatal(error: impl Into<String>) -> Self {
        OperationError::Fatal {
            error: error.into(),
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// # Example
    /// ```
    /// use eventvisor::OperationError;
    ///
    /// assert!(OperationError::fail("connection refused").is_retryable());
    /// assert!(!OperationError::fatal("bad credentials").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, OperationError::Fail { .. })
    }
}

/// Errors produced by [`RetryExecutor::execute`](crate::RetryExecutor::execute).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RetryError {
    /// All attempts were consumed; wraps the last failure.
    #[error("operation '{operation}' failed after {attempts} attempts")]
    Exhausted {
        /// Name of the operation, for logs and diagnostics.
        operation: String,
        /// Total attempts made (initial + retries).
        attempts: u32,
        /// The failure from the final attempt.
        #[source]
        source: OperationError,
    },

    /// The operation failed with a non-retryable error on some attempt.
    #[error("operation aborted on non-retryable error")]
    Fatal(#[source] OperationError),

    /// The calling context was cancelled while waiting between attempts.
    #[error("interrupted while waiting to retry")]
    Interrupted,
}

impl RetryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::Exhausted { .. } => "retry_exhausted",
            RetryError::Fatal(_) => "retry_fatal",
            RetryError::Interrupted => "retry_interrupted",
        }
    }
}

/// Validation failure while building an [`Event`](crate::Event).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EventError {
    /// A required text field was empty.
    #[error("event {field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Validation failure of a configuration value at construction time.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A value fell outside its allowed range.
    #[error("{param} must be within {min}..={max}, got {got}")]
    OutOfRange {
        /// Parameter name.
        param: &'static str,
        /// Lower bound, rendered.
        min: String,
        /// Upper bound, rendered.
        max: String,
        /// Offending value, rendered.
        got: String,
    },

    /// A value fell below its minimum.
    #[error("{param} must be at least {min}, got {got}")]
    TooSmall {
        /// Parameter name.
        param: &'static str,
        /// Minimum, rendered.
        min: String,
        /// Offending value, rendered.
        got: String,
    },
}
