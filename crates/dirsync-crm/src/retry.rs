//! Fixed-backoff retry for CRM reads.
//!
//! The CRM is polled until it answers: with no attempt limit configured a
//! read blocks until the remote returns success.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{CrmError, CrmResult};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Pause between attempts.
    pub backoff: Duration,
    /// Give up after this many attempts; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_millis(100),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Unbounded policy with the given backoff.
    #[must_use]
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            backoff,
            max_attempts: None,
        }
    }

    /// Bounded policy.
    #[must_use]
    pub fn bounded(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts: Some(max_attempts),
        }
    }

    /// Whether another attempt should follow `attempts` failed ones.
    #[must_use]
    pub fn should_retry(&self, attempts: u32, error: &CrmError) -> bool {
        if !error.is_retryable() {
            return false;
        }
        self.max_attempts.map_or(true, |max| attempts < max)
    }

    /// Execute an async operation with retry.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut f: F) -> CrmResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = CrmResult<T>>,
    {
        let mut attempts: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempts > 0 {
                        debug!(
                            operation = operation_name,
                            attempts = attempts + 1,
                            "CRM request succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    attempts += 1;
                    if !self.should_retry(attempts, &error) {
                        if error.is_retryable() {
                            warn!(
                                operation = operation_name,
                                attempts,
                                error = %error,
                                "CRM retries exhausted"
                            );
                            return Err(CrmError::MaxAttemptsExceeded {
                                attempts,
                                message: format!("{operation_name}: {error}"),
                            });
                        }
                        return Err(error);
                    }

                    debug!(
                        operation = operation_name,
                        attempt = attempts,
                        delay_ms = self.backoff.as_millis() as u64,
                        error = %error,
                        "Retrying CRM request"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }
}
