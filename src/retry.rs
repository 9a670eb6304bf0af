//! Exponential backoff for remote calls.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::RemoteError;

/// How often and how patiently to retry a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay: Duration::from_millis(1000),
    }
  }
}

impl RetryPolicy {
  /// Delay after the failed attempt with the given 0-based index.
  pub fn delay_for(&self, attempt: u32) -> Duration {
    self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
  }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Authentication failures are returned immediately. Otherwise the caller
/// sees the error of the final attempt.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, RemoteError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, RemoteError>>,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt = 0;

  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(e) if e.is_auth() => return Err(e),
      Err(e) => {
        if attempt + 1 >= max_attempts {
          return Err(e);
        }
        let delay = policy.delay_for(attempt);
        debug!(attempt, ?delay, error = %e, "Remote call failed, retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
    }
  }
}
