//! Retry utilities: backoff builders for catalog store calls.
//!
//! Uses `backon` for exponential backoff with jitter. Only transient storage
//! failures are retried; precondition failures are authoritative answers.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::RetryConfig;
use crate::interfaces::StorageError;

/// Build the store backoff from configuration.
///
/// Defaults: 20ms → 1s, 3 retries, jitter enabled.
pub fn store_backoff(config: &RetryConfig) -> ExponentialBuilder {
    let builder = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.min_delay_ms))
        .with_max_delay(Duration::from_millis(config.max_delay_ms.max(config.min_delay_ms)))
        .with_max_times(config.max_times);

    if config.jitter {
        builder.with_jitter()
    } else {
        builder
    }
}

/// Determines if a storage error is worth retrying.
///
/// Retryable:
/// - `Unavailable`: store could not be reached
/// - transient database errors (pool timeout, I/O)
///
/// Non-retryable:
/// - `PreconditionFailed`: another writer changed the book; the caller must
///   re-read instead of resubmitting the same expectation
/// - `NotFound`, `Corrupt`
pub fn is_retryable(error: &StorageError) -> bool {
    error.is_retryable()
}
