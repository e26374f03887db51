//! Cancellable fixed-schedule retry.
//!
//! The schedule length caps the number of attempts. Errors that report themselves as
//! non-retryable short-circuit immediately: a cryptographic or configuration
//! failure does not change on the fifth attempt.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Backoff between certificate submission attempts; five attempts total.
pub const CERTIFICATE_SUBMISSION_SCHEDULE: [Duration; 5] = [
    Duration::from_secs(1),
    Duration::from_secs(3),
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(20),
];

/// Classifies whether retrying an error could plausibly succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for crate::error::ChainError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::error::Error + Send + Sync + 'static> {
    #[error("gave up after {attempts} attempts")]
    Exhausted {
        attempts: usize,
        #[source]
        source: E,
    },

    #[error("non-retryable error on attempt {attempt}")]
    Fatal {
        attempt: usize,
        #[source]
        source: E,
    },

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: usize },
}

impl<E: std::error::Error + Send + Sync + 'static> RetryError<E> {
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Exhausted { source, .. } | Self::Fatal { source, .. } => Some(source),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Runs `op` up to `schedule.len()` times, sleeping the scheduled delay between
/// attempts. The final attempt's error is returned unaltered inside
/// [`RetryError::Exhausted`]. The sleep itself is interruptible through the
/// cancellation token.
pub async fn retry_with_backoff<T, E, F, Fut>(
    schedule: &[Duration],
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable + std::error::Error + Send + Sync + 'static,
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = schedule.len();
    assert!(attempts > 0, "retry schedule must not be empty");

    for (attempt, delay) in schedule.iter().enumerate() {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => {
                return Err(RetryError::Fatal {
                    attempt: attempt + 1,
                    source: err,
                });
            }
            Err(err) => {
                if attempt + 1 == attempts {
                    return Err(RetryError::Exhausted {
                        attempts,
                        source: err,
                    });
                }
                warn!(
                    target: "stakewire::chain::backoff",
                    attempt = attempt + 1,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "attempt failed, backing off"
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(RetryError::Cancelled {
                            attempts: attempt + 1,
                        });
                    }
                    _ = tokio::time::sleep(*delay) => {}
                }
            }
        }
    }
    unreachable!("schedule is non-empty");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transient() -> ChainError {
        ChainError::rpc("eth_call", "timeout")
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_makes_exactly_five_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry_with_backoff(
            &CERTIFICATE_SUBMISSION_SCHEDULE,
            &CancellationToken::new(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 5, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_two_failures() {
        let calls = AtomicUsize::new(0);
        let result = retry_with_backoff(
            &CERTIFICATE_SUBMISSION_SCHEDULE,
            &CancellationToken::new(),
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(transient())
                    } else {
                        Ok(attempt + 1)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_short_circuits() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry_with_backoff(
            &CERTIFICATE_SUBMISSION_SCHEDULE,
            &CancellationToken::new(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ChainError::revert("submitResult", "InvalidCertificate")) }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Fatal { attempt: 1, .. })));
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_backoff_sleep() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), _> =
            retry_with_backoff(&CERTIFICATE_SUBMISSION_SCHEDULE, &cancel, |_| async {
                Err(transient())
            })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 1 })));
    }
}
