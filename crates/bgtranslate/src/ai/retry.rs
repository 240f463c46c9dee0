//! Retry with exponential backoff for AI calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::AiError;

/// Which failures are retried and how long to wait between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each following one.
    pub initial_backoff: Duration,
    /// Statuses worth another attempt (rate limiting).
    pub retryable_statuses: Vec<u16>,
    /// Statuses that must stop the whole job (exhausted credits).
    pub fatal_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(2000),
            retryable_statuses: vec![429],
            fatal_statuses: vec![402],
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `attempt` (zero-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
    }

    pub fn is_retryable(&self, error: &AiError) -> bool {
        error
            .status_code()
            .is_some_and(|s| self.retryable_statuses.contains(&s))
    }

    pub fn is_fatal(&self, error: &AiError) -> bool {
        error
            .status_code()
            .is_some_and(|s| self.fatal_statuses.contains(&s))
    }
}

/// Runs `op`, retrying retryable failures up to `policy.max_retries` times.
///
/// Fatal and other non-retryable errors are returned immediately.
pub async fn retry_request<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, AiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && policy.is_retryable(&err) => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    "AI request rate limited, retrying: {}",
                    err
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
