//! Retry execution for fallible operations.
//!
//! [`RetryExecutor`] wraps a caller-supplied async operation, classifying
//! failures as retryable or fatal and sleeping per the configured backoff
//! between attempts. See [`executor`] for the attempt loop.

mod executor;

pub use executor::RetryExecutor;
