//! Bounded retry with a fixed delay
//!
//! Each error type decides for itself whether an attempt may be repeated via
//! [`RetryableError`]. Non-retryable errors end the loop on the spot.

use std::fmt;
use std::future::Future;

use log::{debug, warn};

use super::config::RetryConfig;

/// Classifies an attempt failure as worth repeating or terminal
pub trait RetryableError {
    fn is_retryable(&self) -> bool;
}

/// Why a retried operation finally failed
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with a non-retryable error
    Aborted { attempt: u32, error: E },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, last } => {
                write!(f, "giving up after {} attempts: {}", attempts, last)
            }
            RetryError::Aborted { attempt, error } => {
                write!(f, "attempt {} failed: {}", attempt, error)
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Runs an async operation under a [`RetryConfig`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute `operation`, repeating it while it fails with a retryable error
    /// and attempts remain. The delay only suspends the calling task.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: RetryableError + fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("{}: attempt {}/{}", operation_name, attempt, max_attempts);

            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => {
                    debug!("{}: non-retryable failure: {}", operation_name, error);
                    return Err(RetryError::Aborted { attempt, error });
                }
                Err(error) if attempt >= max_attempts => {
                    warn!(
                        "{}: failed after {} attempts: {}",
                        operation_name, attempt, error
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                Err(error) => {
                    warn!(
                        "{}: attempt {} failed, retrying in {:?}: {}",
                        operation_name, attempt, self.config.delay, error
                    );
                    tokio::time::sleep(self.config.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test error (retryable: {})", self.retryable)
        }
    }

    impl RetryableError for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_retryable_failures() {
        let policy = RetryPolicy::default();
        let start = Instant::now();

        let result = policy
            .execute("test", |attempt| async move {
                if attempt < 3 {
                    Err(TestError { retryable: true })
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts() {
        let policy = RetryPolicy::default();
        let mut calls = 0;

        let result: Result<(), _> = policy
            .execute("test", |_| {
                calls += 1;
                async { Err(TestError { retryable: true }) }
            })
            .await;

        assert_eq!(calls, 3);
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_immediately() {
        let policy = RetryPolicy::default();
        let start = Instant::now();
        let mut calls = 0;

        let result: Result<(), _> = policy
            .execute("test", |_| {
                calls += 1;
                async { Err(TestError { retryable: false }) }
            })
            .await;

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(RetryError::Aborted { attempt: 1, .. })));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
