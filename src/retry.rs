//! Retry logic with exponential backoff
//!
//! Operations are retried with exponentially growing, optionally jittered
//! delays until a wall-clock budget ([`RetryConfig::max_elapsed_time`]) would
//! be exceeded by the next wait. There is no attempt cap: a fast-failing
//! operation is retried as often as the budget allows.
//!
//! # Example
//!
//! ```no_run
//! use chart_mirror::retry::{IsRetryable, retry_with_backoff};
//! use chart_mirror::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! retry_with_backoff(&config, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Anything that can go wrong while moving bytes is worth another attempt
            Error::Network(_) | Error::RemoteStatus { .. } | Error::Filesystem { .. } => true,
            Error::IndexFetch { source, .. } | Error::Download { source, .. } => {
                source.is_retryable()
            }
            Error::Config { .. }
            | Error::IndexParse { .. }
            | Error::InvalidIndex { .. }
            | Error::InvalidArtifactUrl { .. }
            | Error::ArchiveDecode { .. } => false,
        }
    }
}

/// Execute an async operation with time-bounded exponential backoff
///
/// Returns the first success, the first non-retryable error, or the last
/// retryable error once sleeping again would exceed `max_elapsed_time`.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() => {
                attempt += 1;

                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                let elapsed = started.elapsed();
                if elapsed + wait > config.max_elapsed_time {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        elapsed_ms = elapsed.as_millis(),
                        "Operation failed, retry budget exhausted"
                    );
                    return Err(e);
                }

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    delay_ms = wait.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(wait).await;

                delay = next_delay(delay, config);
            }
            Err(e) => {
                tracing::error!(error = %e, "Operation failed with non-retryable error");
                return Err(e);
            }
        }
    }
}

/// Grow `delay` by the multiplier, capped at `max_delay`
///
/// Products that do not fit a `Duration` (overflow, infinity, NaN) saturate
/// to the cap.
fn next_delay(delay: Duration, config: &RetryConfig) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Randomize a delay uniformly within ±50%
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let factor: f64 = rng.gen_range(0.5..=1.5);
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
}
