//! Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts including the first one
  pub max_attempts: u32,
  /// Constant wait between a failed attempt and the next
  pub retry_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      retry_delay: Duration::from_millis(1000),
    }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      retry_delay,
    }
  }

  /// A policy that gives up after the first failure.
  pub fn no_retry() -> Self {
    Self::new(1, Duration::ZERO)
  }
}

/// Run `f` until it succeeds or the attempt budget is spent.
///
/// `f` receives the 1-based attempt number. Attempts never overlap: the next
/// one starts only after the previous failure and the delay have elapsed.
/// On exhaustion the final error is wrapped in `RequestExhausted`.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut f: F) -> Result<T>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt = 1;

  loop {
    match f(attempt).await {
      Ok(value) => return Ok(value),
      Err(e) if attempt < max_attempts => {
        warn!(
          attempt,
          max_attempts,
          error = %e,
          "Attempt {} failed, retrying in {:?}",
          attempt,
          policy.retry_delay
        );
        tokio::time::sleep(policy.retry_delay).await;
        attempt += 1;
      }
      Err(e) => {
        return Err(DashboardError::RequestExhausted {
          attempts: attempt,
          source: Box::new(e),
        })
      }
    }
  }
}
